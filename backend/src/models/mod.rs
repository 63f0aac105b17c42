//! Domain models for the Hunterload conversion pipeline.
//!
//! - [`RawValue`] / [`RawRecord`] - Untyped cells as read from the input file
//! - [`NormalizedRecord`] - One row after normalization and enrichment
//! - [`PersonRecord`] / [`TicketRecord`] - The two output shapes
//! - [`ConversionResult`] - Caller-facing outcome of a run
//!
//! Output records only ever hold `String` leaves. The consuming registry
//! expects booleans as `"true"`/`"false"` and missing values as `""`.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

// =============================================================================
// Raw input
// =============================================================================

/// A single cell as produced by the tabular loader.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    /// Missing or empty cell.
    #[default]
    Empty,
    /// Text cell (every CSV cell is text).
    Text(String),
    /// Numeric cell. Spreadsheet dates without a date type land here as serials.
    Number(f64),
    /// Boolean cell.
    Bool(bool),
    /// Typed date cell.
    Date(NaiveDate),
}

impl RawValue {
    /// True for empty cells, NaN numbers and whitespace-only text.
    pub fn is_blank(&self) -> bool {
        match self {
            RawValue::Empty => true,
            RawValue::Text(s) => s.trim().is_empty(),
            RawValue::Number(n) => n.is_nan(),
            RawValue::Bool(_) | RawValue::Date(_) => false,
        }
    }

    /// Plain string form of the cell, trimmed.
    ///
    /// Whole numbers are rendered without a fractional part (`12.0` → `"12"`).
    pub fn to_plain_string(&self) -> String {
        match self {
            RawValue::Empty => String::new(),
            RawValue::Text(s) => s.trim().to_string(),
            RawValue::Number(n) => format_number(*n),
            RawValue::Bool(b) => b.to_string(),
            RawValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            RawValue::Empty
        } else {
            RawValue::Text(value.to_string())
        }
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            RawValue::Empty
        } else {
            RawValue::Text(value)
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

/// Render a float the way a spreadsheet user typed it.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        String::new()
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// One input row: column name → cell.
pub type RawRecord = HashMap<String, RawValue>;

// =============================================================================
// Normalized record
// =============================================================================

/// Canonical string form of one row.
///
/// Absent fields read as `""`. Only the enrichment service mutates a record
/// after normalization, and only blank fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedRecord {
    fields: BTreeMap<String, String>,
}

impl NormalizedRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value of a field, `""` when absent.
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn is_blank(&self, field: &str) -> bool {
        self.get(field).trim().is_empty()
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NormalizedRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

// =============================================================================
// Output shapes
// =============================================================================

/// `{code, name}` reference (municipality, nationality).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeName {
    pub code: String,
    pub name: String,
}

/// `{name}` reference (cancellation reason).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameRef {
    pub name: String,
}

/// Identity document of the ticket holder.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunterId {
    pub series_passport: String,
    pub number_passport: String,
}

/// One entry of `hunters.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRecord {
    pub date_entry: String,
    pub municipality: CodeName,
    pub surname: String,
    pub hunter_name: String,
    pub patronymic: String,
    pub birth_date: String,
    pub birth_place: String,
    pub postal_address: String,
    pub postal_code: String,
    pub phone: String,
    pub snils_code: String,
    pub series_ticket: String,
    pub number_ticket: String,
    pub date_issue_ticket: String,
    pub nationality: CodeName,
}

/// One entry of `huntingtickets.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub date_entry: String,
    pub series: String,
    pub number: String,
    pub date_issue: String,
    pub hunter_id: HunterId,
    pub is_belonged_to_indigenous_people: String,
    pub cancellation_date: String,
    pub cancellation_reason: NameRef,
}

// =============================================================================
// Conversion result
// =============================================================================

/// Caller-facing result of [`crate::convert`].
///
/// `error` is set if and only if `success` is false.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConversionResult {
    pub success: bool,
    pub processed_rows: usize,
    pub skipped_rows: usize,
    pub output_folder: PathBuf,
    pub report_path: Option<PathBuf>,
    #[serde(default)]
    pub output_files: Vec<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ConversionResult {
    /// A failed run. Counts stay at zero since nothing was written.
    pub fn failure(output_folder: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            output_folder: output_folder.into(),
            error: Some(message.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_detection() {
        assert!(RawValue::Empty.is_blank());
        assert!(RawValue::Text("   ".into()).is_blank());
        assert!(RawValue::Number(f64::NAN).is_blank());
        assert!(!RawValue::Number(0.0).is_blank());
        assert!(!RawValue::Bool(false).is_blank());
    }

    #[test]
    fn test_plain_string_whole_numbers() {
        assert_eq!(RawValue::Number(3456.0).to_plain_string(), "3456");
        assert_eq!(RawValue::Number(12.5).to_plain_string(), "12.5");
        assert_eq!(RawValue::Text("  abc ".into()).to_plain_string(), "abc");
        let date = NaiveDate::from_ymd_opt(2020, 5, 1).unwrap();
        assert_eq!(RawValue::Date(date).to_plain_string(), "2020-05-01");
    }

    #[test]
    fn test_normalized_record_absent_is_empty() {
        let mut rec = NormalizedRecord::new();
        assert_eq!(rec.get("surname"), "");
        assert!(rec.is_blank("surname"));
        rec.set("surname", "Иванов");
        assert_eq!(rec.get("surname"), "Иванов");
    }

    #[test]
    fn test_person_record_leaves_are_strings() {
        let json = serde_json::to_value(PersonRecord::default()).unwrap();
        assert_eq!(json["municipality"]["code"], "");
        assert_eq!(json["surname"], "");
        assert!(json.as_object().unwrap().values().all(|v| v.is_string() || v.is_object()));
    }

    #[test]
    fn test_failure_result_has_error_only() {
        let result = ConversionResult::failure("/out", "boom");
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("boom"));
        assert_eq!(result.processed_rows, 0);
    }
}
