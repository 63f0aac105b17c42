//! High-level conversion API.
//!
//! Combines every stage: load the table, build the reference snapshots,
//! run the optional address pre-pass, process rows, check the output schema,
//! and write the collections and report.
//!
//! # Example
//!
//! ```rust,ignore
//! use hunterload::{convert, ConvertOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() {
//!     let options = ConvertOptions {
//!         create_report: true,
//!         region_filter_code: Some("63".into()),
//!         ..Default::default()
//!     };
//!     let result = convert(Path::new("registry.xlsx"), Path::new("out"), options).await;
//!     println!("{} rows converted", result.processed_rows);
//! }
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::fields::FieldTable;
use super::processor::{find_halt, ProcessOutput, RowProcessor, StopFlag};
use crate::api::logs::{log_error, log_info, log_success, log_warning};
use crate::enrich::{addresses_to_resolve, gather_hints, AddressHints, DadataClient, Enricher};
use crate::error::{ConvertError, ConvertResult};
use crate::models::ConversionResult;
use crate::output::{
    collection_payloads, render_report, write_atomically, ReportContext, REPORT_FILE,
};
use crate::parser::{load_table, ParseResult};
use crate::reference::{region_name, AdminDirectory, CategoryDirectory};
use crate::validation::{hunter_schema, validate_person, Rule, RuleSet};

/// Options for a conversion run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ConvertOptions {
    /// Sheet to read from a workbook (default: first)
    pub selected_sheet: Option<String>,

    /// Write `conversion_report.txt`
    pub create_report: bool,

    /// Split each collection into files of at most this many records (0 = no split)
    pub split_count: usize,

    /// Ask the address service for missing postal codes
    pub include_postal_enrichment: bool,

    /// Fill nationality code/name from the category directory
    pub include_category_enrichment: bool,

    /// Two-digit region code; restricts the administrative directory
    pub region_filter_code: Option<String>,

    /// External administrative directory merged over the embedded one
    pub administrative_directory_path: Option<PathBuf>,

    /// Category directory file
    pub category_directory_path: Option<PathBuf>,

    /// Region name for the report (default: from the region table)
    pub selected_region_display_name: Option<String>,

    /// Address service key (default: `DADATA_API_KEY`)
    #[serde(skip_serializing)]
    pub address_api_key: Option<String>,
}

/// Loaded table metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableInfo {
    pub encoding: Option<String>,
    pub delimiter: Option<char>,
    pub sheet: Option<String>,
    pub headers: Vec<String>,
    pub row_count: usize,
    pub double_header: bool,
}

impl From<&ParseResult> for TableInfo {
    fn from(table: &ParseResult) -> Self {
        Self {
            encoding: table.encoding.clone(),
            delimiter: table.delimiter,
            sheet: table.sheet.clone(),
            headers: table.headers.clone(),
            row_count: table.records.len(),
            double_header: table.double_header,
        }
    }
}

/// Everything a successful run produced
#[derive(Debug)]
pub struct ConversionOutput {
    pub output_folder: PathBuf,
    pub table: TableInfo,
    pub rows: ProcessOutput,
    pub output_files: Vec<PathBuf>,
    pub report_path: Option<PathBuf>,
    pub region: Option<(String, String)>,
}

impl ConversionOutput {
    pub fn to_result(&self) -> ConversionResult {
        ConversionResult {
            success: true,
            processed_rows: self.rows.processed_rows(),
            skipped_rows: self.rows.skipped_rows(),
            output_folder: self.output_folder.clone(),
            report_path: self.report_path.clone(),
            output_files: self.output_files.clone(),
            error: None,
        }
    }
}

/// Row progress callback: `(processed, total)`.
pub type ProgressFn = Arc<dyn Fn(usize, usize) + Send + Sync>;

/// Rows between progress log lines.
const PROGRESS_LOG_EVERY: usize = 500;

/// Runs conversions with a fixed set of options.
#[derive(Clone, Default)]
pub struct Converter {
    options: ConvertOptions,
    stop: StopFlag,
    progress: Option<ProgressFn>,
}

impl fmt::Debug for Converter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Converter")
            .field("options", &self.options)
            .field("stop", &self.stop)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

impl Converter {
    pub fn new(options: ConvertOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn with_stop_flag(mut self, stop: StopFlag) -> Self {
        self.stop = stop;
        self
    }

    /// Call `progress(processed, total)` after every processed row.
    pub fn with_progress(
        mut self,
        progress: impl Fn(usize, usize) + Send + Sync + 'static,
    ) -> Self {
        self.progress = Some(Arc::new(progress));
        self
    }

    /// Handle for stopping a running conversion.
    pub fn stop_flag(&self) -> StopFlag {
        self.stop.clone()
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert and reduce the outcome to a [`ConversionResult`]. Never panics or errors.
    pub async fn convert(&self, input: &Path, output_folder: &Path) -> ConversionResult {
        match self.run(input, output_folder).await {
            Ok(output) => output.to_result(),
            Err(e) => {
                log_error(format!("Conversion failed: {}", e));
                ConversionResult::failure(output_folder, e.to_string())
            }
        }
    }

    /// Convert, returning the full output.
    pub async fn run(&self, input: &Path, output_folder: &Path) -> ConvertResult<ConversionOutput> {
        let options = &self.options;
        log_info(format!("Input: {}", input.display()));
        log_info(format!("Output folder: {}", output_folder.display()));

        let region = self.resolve_region()?;

        // 1. Load table
        let table = load_table(input, options.selected_sheet.as_deref())?;
        log_table(&table);

        // 2. Reference snapshots
        let admin = self.load_admin_directory(region.as_ref().map(|(code, _)| code.as_str()))?;
        let category = self.load_category_directory();

        // 3. Address pre-pass
        let fields = FieldTable::from_headers(&table.headers);
        let hints = self.address_hints(&table, &fields).await;

        if self.stop.is_stopped() {
            return Err(ConvertError::Cancelled);
        }

        // 4. Row loop
        log_info("Processing rows...");
        let rules = RuleSet::registry();
        let enricher = Enricher::new(&admin, &category, &hints);
        let processor = RowProcessor::new(&fields, &rules, enricher, self.stop.clone());
        let mut rows = processor.run_with_progress(&table, |done, total| {
            if done % PROGRESS_LOG_EVERY == 0 {
                log_info(format!("Processed {} of {} rows", done, total));
            }
            if let Some(progress) = &self.progress {
                progress(done, total);
            }
        });

        if rows.stopped && rows.hunters.is_empty() {
            return Err(ConvertError::Cancelled);
        }
        if let Some(line) = rows.halted_at {
            log_warning(format!(
                "Two consecutive blank rows at line {}: the rest of the file was ignored",
                line
            ));
        }
        log_success(format!("Processed {} of {} rows", rows.processed_rows(), rows.total_rows));
        log_info(rows.diagnostics.summary());

        // 5. Required-field check
        check_required_fields(&mut rows);

        // 6. Write collections and report in one staged batch
        let mut files = collection_payloads(&rows.hunters, &rows.tickets, options.split_count)?;
        let output_files: Vec<PathBuf> =
            files.iter().map(|(name, _)| output_folder.join(name)).collect();

        let report_path = if options.create_report {
            let ctx = ReportContext {
                input_name: input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                region: region.clone(),
                total_rows: rows.total_rows,
                processed_rows: rows.processed_rows(),
                skipped_rows: rows.skipped_rows(),
                output_files: &output_files,
                diagnostics: &rows.diagnostics,
            };
            files.push((REPORT_FILE.to_string(), render_report(&ctx)));
            Some(output_folder.join(REPORT_FILE))
        } else {
            None
        };

        write_atomically(output_folder, files)?;
        log_success(format!(
            "hunters.json: {} records, huntingtickets.json: {} records",
            rows.hunters.len(),
            rows.tickets.len()
        ));
        if let Some(path) = &report_path {
            log_success(format!("Report: {}", path.display()));
        }

        Ok(ConversionOutput {
            output_folder: output_folder.to_path_buf(),
            table: TableInfo::from(&table),
            rows,
            output_files,
            report_path,
            region,
        })
    }

    /// Validate the region filter and pick its display name.
    fn resolve_region(&self) -> ConvertResult<Option<(String, String)>> {
        let Some(code) = self
            .options
            .region_filter_code
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
        else {
            return Ok(None);
        };

        Rule::Region
            .check(code)
            .map_err(ConvertError::InvalidOption)?;

        let name = self
            .options
            .selected_region_display_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| region_name(code).map(str::to_string))
            .unwrap_or_default();

        log_info(format!("Region: {} ({})", name, code));
        Ok(Some((code.to_string(), name)))
    }

    fn load_admin_directory(&self, region_code: Option<&str>) -> ConvertResult<AdminDirectory> {
        let external = self.options.administrative_directory_path.as_deref();
        let admin = match AdminDirectory::load(external) {
            Ok(admin) => admin,
            Err(e) if external.is_some() => {
                log_warning(format!(
                    "Administrative directory not loaded ({}), using built-in data",
                    e
                ));
                AdminDirectory::embedded()?
            }
            Err(e) => return Err(e.into()),
        };

        if admin.skipped_ranges() > 0 {
            log_warning(format!("{} malformed postal range(s) skipped", admin.skipped_ranges()));
        }

        let admin = match region_code {
            Some(code) => admin.restrict_to_region(code),
            None => admin,
        };
        log_info(format!(
            "Administrative directory: {} entries, {} postal codes",
            admin.len(),
            admin.postal_points()
        ));
        Ok(admin)
    }

    fn load_category_directory(&self) -> CategoryDirectory {
        if !self.options.include_category_enrichment {
            return CategoryDirectory::not_loaded();
        }
        let path = self.options.category_directory_path.as_deref();
        if path.is_none() {
            log_warning("Category enrichment requested without a directory file");
        }
        let category = CategoryDirectory::load_or_empty(path);
        if category.is_loaded() {
            log_info(format!("Category directory: {} entries", category.len()));
        }
        category
    }

    async fn address_hints(&self, table: &ParseResult, fields: &FieldTable) -> AddressHints {
        if !self.options.include_postal_enrichment {
            return AddressHints::new();
        }

        let client = match &self.options.address_api_key {
            Some(key) => DadataClient::new(key.clone()),
            None => DadataClient::from_env(),
        };
        let client = match client {
            Ok(client) => client,
            Err(e) => {
                log_warning(format!("Postal enrichment skipped: {}", e));
                return AddressHints::new();
            }
        };

        let end = find_halt(&table.records, fields).unwrap_or(table.records.len());
        let addresses = addresses_to_resolve(&table.records[..end]);
        if addresses.is_empty() {
            return AddressHints::new();
        }

        log_info(format!("Looking up {} address(es)...", addresses.len()));
        let hints = gather_hints(&client, &addresses, &self.stop).await;
        log_success(format!("Address service answered for {} address(es)", hints.len()));
        hints
    }
}

/// Convert `input` into `output_folder`.
pub async fn convert(
    input: &Path,
    output_folder: &Path,
    options: ConvertOptions,
) -> ConversionResult {
    Converter::new(options).convert(input, output_folder).await
}

fn log_table(table: &ParseResult) {
    if let Some(sheet) = &table.sheet {
        log_success(format!("Sheet: {}", sheet));
    }
    if let Some(encoding) = &table.encoding {
        log_success(format!("Detected encoding: {}", encoding));
    }
    if let Some(delimiter) = table.delimiter {
        log_success(format!("Detected separator: '{}'", delimiter));
    }
    if table.double_header {
        log_info("Second header row detected, data starts at row 3");
    }
    log_success(format!(
        "Read {} rows, {} columns",
        table.records.len(),
        table.headers.len()
    ));
}

fn check_required_fields(rows: &mut ProcessOutput) {
    let schema = match hunter_schema() {
        Ok(schema) => schema,
        Err(e) => {
            log_warning(e);
            return;
        }
    };

    for (person, line) in rows.hunters.iter().zip(&rows.lines) {
        if let Err(errors) = validate_person(&schema, person) {
            for error in errors {
                rows.diagnostics.warnings.push(format!("Строка {}: {}", line, error));
            }
        }
    }

    if !rows.diagnostics.warnings.is_empty() {
        log_warning(format!(
            "{} required-field warning(s)",
            rows.diagnostics.warnings.len()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const HEADER: &str = "surname;hunter_name;patronymic;birth_date;birth_place;postal_address;postal_code;phone;snils_code;series_ticket;number_ticket;date_issue_ticket;is_belonged_to_indigenous_people";

    fn write_input(dir: &Path, rows: &[&str]) -> PathBuf {
        let path = dir.join("registry.csv");
        let mut content = format!("{}\n", HEADER);
        for row in rows {
            content.push_str(row);
            content.push('\n');
        }
        fs::write(&path, content).unwrap();
        path
    }

    #[tokio::test]
    async fn test_convert_writes_both_collections() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            &["Иванов;Иван;Иванович;01.02.1990;г. Саратов;г. Саратов, ул. Мира, 1;410012;\
               89161234567;12345678901;АБ 12;003456;2020-05-01;Да"],
        );
        let out = dir.path().join("out");

        let result = convert(&input, &out, ConvertOptions::default()).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.processed_rows, 1);
        assert_eq!(result.skipped_rows, 0);
        assert!(result.report_path.is_none());

        let hunters: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("hunters.json")).unwrap()).unwrap();
        assert_eq!(hunters[0]["municipality"]["code"], "63701000");
        assert_eq!(hunters[0]["municipality"]["name"], "город Саратов");
        assert_eq!(hunters[0]["phone"], "+79161234567");

        let tickets: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("huntingtickets.json")).unwrap())
                .unwrap();
        assert_eq!(tickets[0]["series"], "АБ12");
        assert_eq!(tickets[0]["is_belonged_to_indigenous_people"], "true");
    }

    #[tokio::test]
    async fn test_blank_rows_truncate_and_report() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            &[
                "Иванов;Иван;Иванович;01.02.1990;г. Саратов;;;;;АБ12;1;2020-05-01;",
                ";;;;;;;;;;;;",
                ";;;;;;;;;;;;",
                "Петров;Пётр;Петрович;02.03.1985;г. Энгельс;;;;;АБ13;2;2020-05-02;",
            ],
        );
        let out = dir.path().join("out");
        let options = ConvertOptions {
            create_report: true,
            region_filter_code: Some("63".into()),
            ..Default::default()
        };

        let result = convert(&input, &out, options).await;

        assert!(result.success);
        assert_eq!(result.processed_rows, 1);
        assert_eq!(result.skipped_rows, 3);
        let report = fs::read_to_string(result.report_path.unwrap()).unwrap();
        assert!(report.contains("Регион: Саратовская область (63)"));
        assert!(report.contains("ПРОПУЩЕННЫЕ СТРОКИ (1)"));
        let hunters = fs::read_to_string(out.join("hunters.json")).unwrap();
        assert!(!hunters.contains("Петров"));
    }

    #[tokio::test]
    async fn test_missing_input_fails_without_output() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("out");

        let result = convert(&dir.path().join("nope.xlsx"), &out, ConvertOptions::default()).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("nope.xlsx"));
        assert!(!out.join("hunters.json").exists());
    }

    #[tokio::test]
    async fn test_invalid_region_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), &[]);
        let options = ConvertOptions {
            region_filter_code: Some("6".into()),
            ..Default::default()
        };

        let result = convert(&input, &dir.path().join("out"), options).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("region"));
    }

    #[tokio::test]
    async fn test_split_output() {
        let dir = tempfile::tempdir().unwrap();
        let rows: Vec<String> = (1..=3)
            .map(|i| {
                format!(
                    "Охотник{};Иван;Иванович;01.02.1990;г. Саратов;;;;;АБ12;{};2020-05-01;",
                    i, i
                )
            })
            .collect();
        let row_refs: Vec<&str> = rows.iter().map(String::as_str).collect();
        let input = write_input(dir.path(), &row_refs);
        let options = ConvertOptions {
            split_count: 2,
            ..Default::default()
        };

        let result = convert(&input, &dir.path().join("out"), options).await;

        assert!(result.success);
        assert_eq!(result.output_files.len(), 4);
        assert!(result.output_files[0].ends_with("hunters_001.json"));
    }

    #[tokio::test]
    async fn test_stopped_before_start_is_cancelled() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), &["Иванов;Иван;;;;;;;;;;;"]);
        let converter = Converter::new(ConvertOptions::default());
        converter.stop_flag().stop();

        let result = converter.convert(&input, &dir.path().join("out")).await;

        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("Conversion cancelled"));
    }

    #[tokio::test]
    async fn test_empty_lines_halt_the_dataset() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("registry.csv");
        let csv = "surname;birth_date\nИванов;01.02.1990\n\n\nПетров;02.03.1985\n";
        fs::write(&input, csv).unwrap();
        let out = dir.path().join("out");

        let result = convert(&input, &out, ConvertOptions::default()).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.processed_rows, 1);
        assert_eq!(result.skipped_rows, 3);
        let hunters = fs::read_to_string(out.join("hunters.json")).unwrap();
        assert!(hunters.contains("Иванов"));
        assert!(!hunters.contains("Петров"));
    }

    #[tokio::test]
    async fn test_report_failure_leaves_no_collections() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(dir.path(), &["Иванов;Иван;;;;;;;;АБ12;1;;"]);
        let out = dir.path().join("out");
        fs::create_dir_all(out.join(REPORT_FILE)).unwrap();
        fs::write(out.join(REPORT_FILE).join("keep"), "x").unwrap();
        let options = ConvertOptions {
            create_report: true,
            ..Default::default()
        };

        let result = convert(&input, &out, options).await;

        assert!(!result.success);
        assert!(!out.join("hunters.json").exists());
        assert!(!out.join("huntingtickets.json").exists());
        let leftovers = fs::read_dir(&out)
            .unwrap()
            .flatten()
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .count();
        assert_eq!(leftovers, 0);
    }

    #[tokio::test]
    async fn test_stop_mid_run_writes_processed_rows() {
        let dir = tempfile::tempdir().unwrap();
        let input = write_input(
            dir.path(),
            &[
                "Первый;Иван;;;;;;;;АБ12;1;;",
                "Второй;Иван;;;;;;;;АБ12;2;;",
                "Третий;Иван;;;;;;;;АБ12;3;;",
                "Четвертый;Иван;;;;;;;;АБ12;4;;",
            ],
        );
        let out = dir.path().join("out");
        let stop = StopFlag::new();
        let trip = stop.clone();
        let converter = Converter::new(ConvertOptions::default())
            .with_stop_flag(stop)
            .with_progress(move |done, _| {
                if done == 2 {
                    trip.stop();
                }
            });

        let result = converter.convert(&input, &out).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.processed_rows, 2);
        assert_eq!(result.skipped_rows, 2);
        let hunters: Vec<serde_json::Value> =
            serde_json::from_str(&fs::read_to_string(out.join("hunters.json")).unwrap()).unwrap();
        assert_eq!(hunters.len(), 2);
        assert_eq!(hunters[1]["surname"], "Второй");
    }

    #[tokio::test]
    async fn test_convert_workbook_sheet() {
        let dir = tempfile::tempdir().unwrap();
        let input = Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/registry.xlsx"));
        let out = dir.path().join("out");
        let options = ConvertOptions {
            selected_sheet: Some("Реестр".into()),
            ..Default::default()
        };

        let result = convert(input, &out, options).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.processed_rows, 1);
        let hunters: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out.join("hunters.json")).unwrap()).unwrap();
        assert_eq!(hunters[0]["birth_date"], "1990-02-01");
        assert_eq!(hunters[0]["number_ticket"], "3456");
    }

    #[test]
    fn test_options_deserialize_camel_case() {
        let json = r#"{"createReport":true,"splitCount":50,"regionFilterCode":"63"}"#;
        let options: ConvertOptions = serde_json::from_str(json).unwrap();
        assert!(options.create_report);
        assert_eq!(options.split_count, 50);
        assert_eq!(options.region_filter_code.as_deref(), Some("63"));
        assert!(!options.include_postal_enrichment);
    }
}
