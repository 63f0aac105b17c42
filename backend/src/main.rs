//! Hunterload CLI - convert hunter registries to JSON
//!
//! # Main Commands
//!
//! ```bash
//! hunterload convert registry.xlsx -o out --report   # Full conversion
//! hunterload serve                                   # Start HTTP server (port 3000)
//! ```
//!
//! # Helper Commands
//!
//! ```bash
//! hunterload parse registry.csv         # Dump raw rows as JSON
//! hunterload lookup 410012              # Municipality for a postal code
//! hunterload lookup --code 63701000     # Municipality name for a code
//! hunterload regions                    # Region code table
//! ```

use clap::{Parser, Subcommand};
use hunterload::{
    convert, load_table, AdminDirectory, ConvertOptions, RawValue, REGIONS,
};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hunterload")]
#[command(about = "Convert hunter registry spreadsheets to hunters.json and huntingtickets.json", long_about = None)]
struct Cli {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a registry file into JSON collections
    Convert {
        /// Input file (.xlsx, .xls, .ods, .csv)
        input: PathBuf,

        /// Output folder
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Sheet to read (default: first)
        #[arg(long)]
        sheet: Option<String>,

        /// Write conversion_report.txt
        #[arg(long)]
        report: bool,

        /// Split each collection into files of N records
        #[arg(long, default_value = "0")]
        split: usize,

        /// Look up missing postal codes with the address service
        #[arg(long)]
        enrich_postal: bool,

        /// Fill nationality from the category directory
        #[arg(long)]
        enrich_category: bool,

        /// Two-digit region code
        #[arg(long)]
        region: Option<String>,

        /// Region name for the report
        #[arg(long)]
        region_name: Option<String>,

        /// Extra administrative directory (CSV/XLSX)
        #[arg(long)]
        admin_dir: Option<PathBuf>,

        /// Category directory (CSV/XLSX)
        #[arg(long)]
        category_dir: Option<PathBuf>,

        /// Address service key (default: DADATA_API_KEY)
        #[arg(long)]
        dadata_key: Option<String>,
    },

    /// Load a file and output its raw rows as JSON
    Parse {
        /// Input file
        input: PathBuf,

        /// Sheet to read (default: first)
        #[arg(long)]
        sheet: Option<String>,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Query the administrative directory
    Lookup {
        /// Postal code
        #[arg(required_unless_present = "code")]
        postal: Option<String>,

        /// Municipality code instead of a postal code
        #[arg(long, conflicts_with = "postal")]
        code: Option<String>,

        /// Extra administrative directory (CSV/XLSX)
        #[arg(long)]
        admin_dir: Option<PathBuf>,
    },

    /// Print the region code table
    Regions,

    /// Start HTTP server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Administrative directory used for every job
        #[arg(long)]
        admin_dir: Option<PathBuf>,

        /// Category directory used for every job
        #[arg(long)]
        category_dir: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() {
    // Load .env file (if present)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);

    let result = match cli.command {
        Commands::Convert {
            input,
            output,
            sheet,
            report,
            split,
            enrich_postal,
            enrich_category,
            region,
            region_name,
            admin_dir,
            category_dir,
            dadata_key,
        } => {
            let options = ConvertOptions {
                selected_sheet: sheet,
                create_report: report,
                split_count: split,
                include_postal_enrichment: enrich_postal,
                include_category_enrichment: enrich_category,
                region_filter_code: region,
                administrative_directory_path: admin_dir,
                category_directory_path: category_dir,
                selected_region_display_name: region_name,
                address_api_key: dadata_key,
            };
            cmd_convert(&input, &output, options).await
        }

        Commands::Parse {
            input,
            sheet,
            output,
        } => cmd_parse(&input, sheet.as_deref(), output.as_deref()),

        Commands::Lookup {
            postal,
            code,
            admin_dir,
        } => cmd_lookup(postal.as_deref(), code.as_deref(), admin_dir.as_deref()),

        Commands::Regions => cmd_regions(),

        Commands::Serve {
            port,
            admin_dir,
            category_dir,
        } => {
            let config = hunterload::server::ServerConfig {
                admin_dir,
                category_dir,
            };
            hunterload::server::start_server(port, config).await
        }
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: u8, quiet: bool) {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn cmd_convert(
    input: &Path,
    output: &Path,
    options: ConvertOptions,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = convert(input, output, options).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    match result.error {
        Some(error) if !result.success => Err(error.into()),
        _ => Ok(()),
    }
}

fn cmd_parse(
    input: &Path,
    sheet: Option<&str>,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Loading: {}", input.display());

    let table = load_table(input, sheet)?;

    if let Some(ref sheet) = table.sheet {
        eprintln!("   Sheet: {}", sheet);
    }
    if let Some(ref encoding) = table.encoding {
        eprintln!("   Encoding: {}", encoding);
    }
    if let Some(delimiter) = table.delimiter {
        eprintln!("   Delimiter: '{}'", format_delimiter(delimiter));
    }
    eprintln!("   Columns: {}", table.headers.join(", "));
    eprintln!("✅ Loaded {} rows", table.records.len());

    let rows: Vec<Value> = table
        .records
        .iter()
        .map(|record| {
            let mut row = Map::new();
            for header in &table.headers {
                let cell = record.get(header).cloned().unwrap_or(RawValue::Empty);
                row.insert(header.clone(), Value::String(cell.to_plain_string()));
            }
            Value::Object(row)
        })
        .collect();

    let json = serde_json::to_string_pretty(&rows)?;
    write_output(&json, output)?;

    Ok(())
}

fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}

fn cmd_lookup(
    postal: Option<&str>,
    code: Option<&str>,
    admin_dir: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let admin = AdminDirectory::load(admin_dir)?;

    let code = match (code, postal) {
        (Some(code), _) => code.to_string(),
        (None, Some(postal)) => admin
            .find_code_by_postal(postal)
            .map(str::to_string)
            .ok_or_else(|| format!("No municipality for postal code {}", postal))?,
        (None, None) => return Err("Give a postal code or --code".into()),
    };

    let name = admin
        .get_name_by_code(&code)
        .ok_or_else(|| format!("Unknown municipality code {}", code))?;
    println!("{}\t{}", code, name);

    Ok(())
}

fn cmd_regions() -> Result<(), Box<dyn std::error::Error>> {
    for (code, name) in REGIONS {
        println!("{}\t{}", code, name);
    }
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            println!("{}", content);
        }
    }
    Ok(())
}
