//! Column classification and normalizer dispatch.
//!
//! Every declared column is classified once into a [`FieldKind`] by substring
//! patterns on its lowercased name. The [`FieldTable`] then normalizes rows
//! without re-inspecting column names.

use serde::{Deserialize, Serialize};

use super::normalize;
use crate::models::{NormalizedRecord, RawRecord, RawValue};

/// Semantic kind of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    BooleanFlag,
    Date,
    NationalId,
    PostalCode,
    Phone,
    NumericId,
    Text,
}

/// Signature shared by every normalizer.
pub type NormalizerFn = fn(&RawValue) -> String;

/// Classification patterns, checked in order. First match wins.
const PATTERNS: &[(&[&str], FieldKind)] = &[
    (&["indigenous"], FieldKind::BooleanFlag),
    (&["date"], FieldKind::Date),
    (&["snils"], FieldKind::NationalId),
    (&["postal_code", "postcode", "zip"], FieldKind::PostalCode),
    (&["phone"], FieldKind::Phone),
    (&["series", "number", "_code", "code_"], FieldKind::NumericId),
];

impl FieldKind {
    /// Classify a column by name.
    pub fn classify(column: &str) -> Self {
        let name = column.to_lowercase();
        PATTERNS
            .iter()
            .find(|(needles, _)| needles.iter().any(|n| name.contains(n)))
            .map(|(_, kind)| *kind)
            .unwrap_or(FieldKind::Text)
    }

    pub fn normalizer(self) -> NormalizerFn {
        match self {
            FieldKind::BooleanFlag => normalize::normalize_flag,
            FieldKind::Date => normalize::normalize_date,
            FieldKind::NationalId => normalize::normalize_snils,
            FieldKind::PostalCode => normalize::normalize_postal_code,
            FieldKind::Phone => normalize::normalize_phone,
            FieldKind::NumericId => normalize::normalize_numeric_id,
            FieldKind::Text => normalize::normalize_text,
        }
    }

    pub fn normalize(self, value: &RawValue) -> String {
        (self.normalizer())(value)
    }
}

/// A value that normalization changed: `(field, original, normalized)`.
pub type Change = (String, String, String);

/// Declared columns with their kinds, in input order.
#[derive(Debug, Clone, Default)]
pub struct FieldTable {
    columns: Vec<(String, FieldKind)>,
}

impl FieldTable {
    pub fn from_headers<S: AsRef<str>>(headers: &[S]) -> Self {
        let columns = headers
            .iter()
            .map(|h| (h.as_ref().to_string(), FieldKind::classify(h.as_ref())))
            .collect();
        Self { columns }
    }

    pub fn columns(&self) -> impl Iterator<Item = (&str, FieldKind)> {
        self.columns.iter().map(|(name, kind)| (name.as_str(), *kind))
    }

    pub fn kind_of(&self, column: &str) -> Option<FieldKind> {
        self.columns
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, kind)| *kind)
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Every declared column is absent or blank.
    pub fn is_blank_row(&self, raw: &RawRecord) -> bool {
        self.columns
            .iter()
            .all(|(name, _)| raw.get(name).map(RawValue::is_blank).unwrap_or(true))
    }

    /// Normalize every declared column. Absent cells become `""`.
    pub fn normalize_row(&self, raw: &RawRecord) -> (NormalizedRecord, Vec<Change>) {
        let mut record = NormalizedRecord::new();
        let mut changes = Vec::new();

        for (name, kind) in &self.columns {
            let value = raw.get(name).cloned().unwrap_or_default();
            let normalized = kind.normalize(&value);
            let original = value.to_plain_string();
            if !original.is_empty() && original != normalized {
                changes.push((name.clone(), original, normalized.clone()));
            }
            record.set(name.clone(), normalized);
        }

        (record, changes)
    }
}
