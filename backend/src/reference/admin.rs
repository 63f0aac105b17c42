//! Administrative directory: municipality codes, names and postal ranges.
//!
//! The base dataset ships inside the binary (`data/municipalities.csv`). An
//! external file with the same three roles can be merged on top of it; on a
//! code conflict the external entry wins.

use std::collections::HashMap;
use std::path::Path;

use serde::Serialize;

use super::{infer_columns, read_rows};
use crate::error::{ReferenceError, ReferenceResult};
use crate::parser::{load_table, parse_bytes_auto};
use crate::transform::normalize::digits_only;

const BASE_DATASET: &str = include_str!("../../data/municipalities.csv");

/// Codes are left-padded to this width.
const CODE_MIN_LEN: usize = 8;
/// Codes are truncated to this width. Shorter queries may match by prefix.
const CODE_MAX_LEN: usize = 11;

/// One municipality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceEntry {
    pub code: String,
    pub name: String,
    /// Raw range string, e.g. `410000-410600; 410700`
    pub postal_ranges: String,
}

impl ReferenceEntry {
    pub fn new(code: &str, name: &str, postal_ranges: &str) -> Self {
        Self {
            code: normalize_code(code),
            name: name.trim().to_string(),
            postal_ranges: postal_ranges.trim().to_string(),
        }
    }
}

/// Digits only, left-padded with zeros to 8, truncated to 11.
pub fn normalize_code(code: &str) -> String {
    let digits = digits_only(code);
    if digits.is_empty() {
        return digits;
    }
    let mut padded = format!("{:0>width$}", digits, width = CODE_MIN_LEN);
    padded.truncate(CODE_MAX_LEN);
    padded
}

/// Expand a range string into six-digit postal codes.
///
/// Items are separated by `,` or `;`. Each item is a single code or an
/// inclusive `start-end` span. Returns the codes and the number of malformed
/// items that were skipped.
pub fn expand_ranges(ranges: &str) -> (Vec<String>, usize) {
    let mut codes = Vec::new();
    let mut skipped = 0;

    for item in ranges.split([',', ';']).map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('-') {
            Some((start, end)) => {
                let bounds = (start.trim().parse::<u32>(), end.trim().parse::<u32>());
                match bounds {
                    (Ok(start), Ok(end)) if start <= end && end <= 999_999 => {
                        codes.extend((start..=end).map(|n| format!("{:06}", n)));
                    }
                    _ => {
                        tracing::warn!(item = %item, "skipping malformed postal range");
                        skipped += 1;
                    }
                }
            }
            None => {
                if item.len() == 6 && item.chars().all(|c| c.is_ascii_digit()) {
                    codes.push(item.to_string());
                } else {
                    tracing::warn!(item = %item, "skipping malformed postal code");
                    skipped += 1;
                }
            }
        }
    }

    (codes, skipped)
}

/// Immutable municipality index.
#[derive(Debug, Clone, Default)]
pub struct AdminDirectory {
    entries: Vec<ReferenceEntry>,
    by_code: HashMap<String, usize>,
    by_postal: HashMap<String, String>,
    skipped_ranges: usize,
}

impl AdminDirectory {
    /// Directory with no entries; every lookup misses.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Entries of the embedded base dataset.
    pub fn base_entries() -> ReferenceResult<Vec<ReferenceEntry>> {
        let table = parse_bytes_auto(BASE_DATASET.as_bytes())
            .map_err(|e| ReferenceError::Embedded(e.to_string()))?;
        let roles = infer_columns(&table.headers, true)?;
        Ok(read_rows(&table, roles)
            .into_iter()
            .map(|(code, name, ranges)| ReferenceEntry::new(&code, &name, &ranges))
            .collect())
    }

    /// Entries of an external directory file.
    pub fn external_entries(path: &Path) -> ReferenceResult<Vec<ReferenceEntry>> {
        let table = load_table(path, None)?;
        let roles = infer_columns(&table.headers, true)?;
        let entries: Vec<ReferenceEntry> = read_rows(&table, roles)
            .into_iter()
            .map(|(code, name, ranges)| ReferenceEntry::new(&code, &name, &ranges))
            .collect();
        tracing::info!(
            path = %path.display(),
            entries = entries.len(),
            "loaded administrative directory"
        );
        Ok(entries)
    }

    /// The embedded dataset only.
    pub fn embedded() -> ReferenceResult<Self> {
        Ok(Self::from_entries(Self::base_entries()?))
    }

    /// The embedded dataset merged with an optional external file.
    pub fn load(external: Option<&Path>) -> ReferenceResult<Self> {
        let mut entries = Self::base_entries()?;
        if let Some(path) = external {
            entries.extend(Self::external_entries(path)?);
        }
        Ok(Self::from_entries(entries))
    }

    /// Build the index from entries in load order.
    ///
    /// Duplicate codes keep the position of their first appearance and the
    /// value of their last. Postal points resolve to the last loaded entry.
    pub fn from_entries(entries: Vec<ReferenceEntry>) -> Self {
        let mut merged: Vec<ReferenceEntry> = Vec::with_capacity(entries.len());
        let mut by_code: HashMap<String, usize> = HashMap::new();

        for entry in &entries {
            if entry.code.is_empty() {
                continue;
            }
            match by_code.get(&entry.code) {
                Some(&i) => merged[i] = entry.clone(),
                None => {
                    by_code.insert(entry.code.clone(), merged.len());
                    merged.push(entry.clone());
                }
            }
        }

        // Index postal points in load order, skipping superseded duplicates.
        let mut last_seen: HashMap<&str, usize> = HashMap::new();
        for (i, entry) in entries.iter().enumerate() {
            last_seen.insert(entry.code.as_str(), i);
        }

        let mut by_postal = HashMap::new();
        let mut skipped_ranges = 0;
        for (i, entry) in entries.iter().enumerate() {
            if entry.code.is_empty() || last_seen.get(entry.code.as_str()) != Some(&i) {
                continue;
            }
            let (codes, skipped) = expand_ranges(&entry.postal_ranges);
            skipped_ranges += skipped;
            for postal in codes {
                by_postal.insert(postal, entry.code.clone());
            }
        }

        tracing::debug!(
            entries = merged.len(),
            postal_points = by_postal.len(),
            skipped_ranges,
            "built administrative index"
        );

        Self {
            entries: merged,
            by_code,
            by_postal,
            skipped_ranges,
        }
    }

    /// Keep only entries whose code starts with a region prefix.
    pub fn restrict_to_region(&self, prefix: &str) -> Self {
        let kept = self
            .entries
            .iter()
            .filter(|e| e.code.starts_with(prefix))
            .cloned()
            .collect();
        Self::from_entries(kept)
    }

    /// Municipality code for a six-digit postal code.
    pub fn find_code_by_postal(&self, postal: &str) -> Option<&str> {
        let digits = digits_only(postal);
        if digits.len() != 6 {
            return None;
        }
        self.by_postal.get(&digits).map(String::as_str)
    }

    /// Name for a code: exact match first, then the first code with this prefix.
    pub fn get_name_by_code(&self, code: &str) -> Option<&str> {
        let normalized = normalize_code(code);
        if let Some(&i) = self.by_code.get(&normalized) {
            return Some(self.entries[i].name.as_str());
        }

        let digits = digits_only(code);
        if digits.is_empty() || digits.len() >= CODE_MAX_LEN {
            return None;
        }
        self.entries
            .iter()
            .find(|e| e.code.starts_with(&digits))
            .map(|e| e.name.as_str())
    }

    pub fn entries(&self) -> &[ReferenceEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of indexed postal points.
    pub fn postal_points(&self) -> usize {
        self.by_postal.len()
    }

    /// Malformed range items skipped while indexing.
    pub fn skipped_ranges(&self) -> usize {
        self.skipped_ranges
    }
}
