//! REST API types.
//!
//! Collections are returned in the same shape as the JSON files written to
//! disk, so clients can use them without conversion.

use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::ServerError;
use crate::models::{PersonRecord, TicketRecord};
use crate::transform::pipeline::ConversionOutput;

/// Response sent after a successful conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertResponse {
    pub success: bool,

    /// Unique job identifier
    pub job_id: String,

    pub hunters: Vec<PersonRecord>,
    pub tickets: Vec<TicketRecord>,
    pub stats: ConvertStats,
}

/// Counters and input metadata for a run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConvertStats {
    pub total_rows: usize,
    pub processed_rows: usize,
    pub skipped_rows: usize,
    pub changes: usize,
    pub validation_errors: usize,
    pub enrichments: usize,
    pub warnings: Vec<String>,
    pub encoding: Option<String>,
    pub sheet: Option<String>,
    pub columns: Vec<String>,
    /// Report text when one was requested
    pub report: Option<String>,
}

impl ConvertResponse {
    pub fn new(job_id: String, output: ConversionOutput, report: Option<String>) -> Self {
        let rows = output.rows;
        let diag = &rows.diagnostics;
        let stats = ConvertStats {
            total_rows: rows.total_rows,
            processed_rows: rows.hunters.len(),
            skipped_rows: rows.total_rows.saturating_sub(rows.hunters.len()),
            changes: diag.changes.len(),
            validation_errors: diag.errors.len(),
            enrichments: diag.enrichments.len(),
            warnings: diag.warnings.clone(),
            encoding: output.table.encoding,
            sheet: output.table.sheet,
            columns: output.table.headers,
            report,
        };

        Self {
            success: true,
            job_id,
            hunters: rows.hunters,
            tickets: rows.tickets,
            stats,
        }
    }
}

/// Create an error response body
pub fn error_response(error: &str) -> Value {
    json!({
        "success": false,
        "error": error,
    })
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Convert(_) | ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let message = match &self {
            ServerError::Convert(e) => e.to_string(),
            other => other.to_string(),
        };
        (status, Json(error_response(&message))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvertError;

    #[test]
    fn test_error_response_shape() {
        let body = error_response("Input file not found");
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "Input file not found");
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(ServerError::PayloadTooLarge(1).status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(ServerError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ServerError::Convert(ConvertError::InvalidOption("region".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_response_camel_case() {
        let response = ConvertResponse {
            success: true,
            job_id: "abc".into(),
            hunters: vec![],
            tickets: vec![],
            stats: ConvertStats::default(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["jobId"], "abc");
        assert_eq!(json["stats"]["processedRows"], 0);
    }
}
