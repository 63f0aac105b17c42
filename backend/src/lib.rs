//! # Hunterload - hunter registry conversion
//!
//! Hunterload converts hunter registry spreadsheets and CSV exports into two
//! JSON collections: `hunters.json` (people) and `huntingtickets.json`
//! (hunting permits).
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │ XLSX / CSV  │────▶│   Parser    │────▶│  Processor  │────▶│  JSON files │
//! │ (any enc.)  │     │  (auto-enc) │     │ (norm+enr.) │     │  + report   │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//!                                               ▲
//!                              reference directories, address hints
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hunterload::{convert, ConvertOptions};
//! use std::path::Path;
//!
//! #[tokio::main]
//! async fn main() {
//!     let result = convert(Path::new("registry.xlsx"), Path::new("out"), ConvertOptions::default()).await;
//!     println!("{} rows converted", result.processed_rows);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Hierarchical error types
//! - [`models`] - Raw rows, normalized records, output shapes
//! - [`parser`] - CSV and spreadsheet loading with auto-detection
//! - [`transform`] - Normalization, row processing, projection, pipeline
//! - [`validation`] - Field rules and the output schema
//! - [`reference`] - Administrative and category directories
//! - [`enrich`] - Reference and address-service enrichment
//! - [`output`] - JSON collections and the conversion report
//! - [`api`] - HTTP API server

// Core modules
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Validation
pub mod validation;

// Reference data and enrichment
pub mod enrich;
pub mod reference;

// Output
pub mod output;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    AddressError, ConvertError, ConvertResult, LoadError, LoadResult, ReferenceError,
    ServerError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    CodeName, ConversionResult, HunterId, NameRef, NormalizedRecord, PersonRecord, RawRecord,
    RawValue, TicketRecord,
};

// =============================================================================
// Re-exports - Parsing
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, load_table, parse_bytes_auto,
    parse_spreadsheet, sheet_names, ParseResult,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    find_halt, project_person, project_ticket, Diagnostics, FieldKind, FieldTable,
    ProcessOutput, RowProcessor, StopFlag,
};

// =============================================================================
// Re-exports - Validation
// =============================================================================

pub use validation::{hunter_schema, validate_person, FieldRules, Rule, RuleSet};

// =============================================================================
// Re-exports - Reference data
// =============================================================================

pub use reference::{region_name, AdminDirectory, CategoryDirectory, ReferenceEntry, REGIONS};

// =============================================================================
// Re-exports - Enrichment
// =============================================================================

pub use enrich::{AddressHints, AddressMatch, AddressService, DadataClient, Enricher};

// =============================================================================
// Re-exports - Pipeline
// =============================================================================

pub use transform::pipeline::{convert, ConversionOutput, ConvertOptions, Converter, TableInfo};

// =============================================================================
// Re-exports - Output
// =============================================================================

pub use output::{render_report, write_collections, ReportContext, HUNTERS_FILE, TICKETS_FILE};

// Server
pub mod server {
    pub use crate::api::server::{start_server, ServerConfig};
}
