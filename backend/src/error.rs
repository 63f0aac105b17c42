//! Error types for the Hunterload conversion pipeline.
//!
//! - [`LoadError`] - Tabular input loading (CSV / spreadsheet)
//! - [`ReferenceError`] - Reference directory loading
//! - [`AddressError`] - Address lookup service (never escapes enrichment)
//! - [`ConvertError`] - Top-level conversion errors
//! - [`ServerError`] - HTTP API errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use std::path::PathBuf;

use thiserror::Error;

// =============================================================================
// Loading Errors
// =============================================================================

/// Errors while reading a tabular file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    Io(#[from] std::io::Error),

    /// Input file does not exist.
    #[error("Input file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// None of the candidate encodings decoded the file.
    #[error("Could not decode file with any of: {0}")]
    Encoding(String),

    /// Invalid CSV format.
    #[error("Invalid CSV format: {0}")]
    Csv(#[from] csv::Error),

    /// Spreadsheet could not be opened or read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// Requested sheet is not in the workbook.
    #[error("Sheet '{name}' not found (available: {available})")]
    SheetNotFound { name: String, available: String },

    /// Empty file.
    #[error("Input file is empty")]
    EmptyFile,

    /// No headers found.
    #[error("No headers found in input")]
    NoHeaders,
}

// =============================================================================
// Reference Directory Errors
// =============================================================================

/// Errors while loading a reference directory.
#[derive(Debug, Error)]
pub enum ReferenceError {
    /// Underlying tabular file could not be loaded.
    #[error("Reference file: {0}")]
    Load(#[from] LoadError),

    /// The file does not have enough columns to infer code/name roles.
    #[error("Reference file has too few columns: {0}")]
    MissingColumns(String),

    /// Embedded dataset is malformed.
    #[error("Embedded reference data is invalid: {0}")]
    Embedded(String),
}

// =============================================================================
// Address Service Errors
// =============================================================================

/// Errors from the remote address service.
///
/// These are logged and swallowed by the enrichment pre-pass.
#[derive(Debug, Error)]
pub enum AddressError {
    /// Missing API key.
    #[error("Missing DADATA_API_KEY")]
    MissingApiKey,

    /// HTTP request failed (connect, timeout, TLS).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status from the service.
    #[error("Address service returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("Invalid address service response: {0}")]
    InvalidResponse(String),
}

// =============================================================================
// Conversion Errors (top-level)
// =============================================================================

/// Top-level conversion errors.
///
/// Every variant is fatal for a run: the caller gets a failed
/// [`crate::models::ConversionResult`] and no output files are written.
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Input loading error.
    #[error("{0}")]
    Load(#[from] LoadError),

    /// Reference data error.
    #[error("Reference data error: {0}")]
    Reference(#[from] ReferenceError),

    /// Options rejected before the run started.
    #[error("Invalid option: {0}")]
    InvalidOption(String),

    /// Writing output failed.
    #[error("Failed to write output: {0}")]
    Output(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was stopped before the first row.
    #[error("Conversion cancelled")]
    Cancelled,
}

// =============================================================================
// Server Errors
// =============================================================================

/// HTTP server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Conversion error.
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// Invalid request.
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Upload over the size limit.
    #[error("File too large: {0} bytes (max 50MB)")]
    PayloadTooLarge(usize),

    /// Server internal error.
    #[error("Internal server error: {0}")]
    Internal(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for reference directory operations.
pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Result type for address service operations.
pub type AddressResult<T> = Result<T, AddressError>;

/// Result type for conversion operations.
pub type ConvertResult<T> = Result<T, ConvertError>;

/// Result type for server operations.
pub type ServerResult<T> = Result<T, ServerError>;
