//! Reference directories used for enrichment.
//!
//! - [`AdminDirectory`] - municipalities (OKTMO-style codes) with postal ranges
//! - [`CategoryDirectory`] - code/name dictionary such as nationalities
//! - [`regions`] - fixed two-digit region table
//!
//! Both directories are built once before the row loop and only read
//! afterwards. Reference files go through the same loader as the main input,
//! so spreadsheets and any delimited text encoding work.

pub mod admin;
pub mod category;
pub mod regions;

pub use admin::{expand_ranges, normalize_code, AdminDirectory, ReferenceEntry};
pub use category::{CategoryDirectory, CategoryEntry};
pub use regions::{region_name, REGIONS};

use crate::error::{ReferenceError, ReferenceResult};
use crate::parser::ParseResult;

const CODE_PATTERNS: &[&str] = &["код", "code", "num", "номер", "oktmo", "октмо"];
const NAME_PATTERNS: &[&str] = &["наимен", "name", "название"];
const RANGE_PATTERNS: &[&str] = &["range", "диапазон", "индекс", "postal", "zip"];

/// Column positions of a reference file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ColumnRoles {
    pub code: usize,
    pub name: usize,
    pub ranges: Option<usize>,
}

fn find_column(headers: &[String], patterns: &[&str], taken: &[usize]) -> Option<usize> {
    headers.iter().enumerate().find_map(|(i, header)| {
        let lower = header.to_lowercase();
        (!taken.contains(&i) && patterns.iter().any(|p| lower.contains(p))).then_some(i)
    })
}

fn first_free(count: usize, taken: &[usize]) -> Option<usize> {
    (0..count).find(|i| !taken.contains(i))
}

/// Infer code/name (and optionally postal range) columns from header names.
///
/// Falls back to positions: code is column 0, name column 1, ranges column 2.
pub(crate) fn infer_columns(headers: &[String], with_ranges: bool) -> ReferenceResult<ColumnRoles> {
    if headers.len() < 2 {
        return Err(ReferenceError::MissingColumns(headers.join(", ")));
    }

    let mut taken = Vec::new();

    let ranges = if with_ranges {
        let found = find_column(headers, RANGE_PATTERNS, &taken);
        if let Some(i) = found {
            taken.push(i);
        }
        found
    } else {
        None
    };

    let code = find_column(headers, CODE_PATTERNS, &taken)
        .or_else(|| first_free(headers.len(), &taken))
        .ok_or_else(|| ReferenceError::MissingColumns(headers.join(", ")))?;
    taken.push(code);

    let name = find_column(headers, NAME_PATTERNS, &taken)
        .or_else(|| first_free(headers.len(), &taken))
        .ok_or_else(|| ReferenceError::MissingColumns(headers.join(", ")))?;
    taken.push(name);

    let ranges = match ranges {
        Some(i) => Some(i),
        None if with_ranges => first_free(headers.len(), &taken),
        None => None,
    };

    Ok(ColumnRoles { code, name, ranges })
}

/// `(code, name, ranges)` rows of a loaded reference table. Rows without a code are dropped.
pub(crate) fn read_rows(table: &ParseResult, roles: ColumnRoles) -> Vec<(String, String, String)> {
    let cell = |record: &crate::models::RawRecord, index: usize| {
        table
            .headers
            .get(index)
            .and_then(|h| record.get(h))
            .map(|v| v.to_plain_string())
            .unwrap_or_default()
    };

    table
        .records
        .iter()
        .map(|record| {
            let ranges = roles.ranges.map(|i| cell(record, i)).unwrap_or_default();
            (cell(record, roles.code), cell(record, roles.name), ranges)
        })
        .filter(|(code, _, _)| !code.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_infer_by_name() {
        let roles = infer_columns(&headers(&["Наименование", "Код"]), false).unwrap();
        assert_eq!(roles.code, 1);
        assert_eq!(roles.name, 0);
        assert_eq!(roles.ranges, None);
    }

    #[test]
    fn test_infer_admin_columns() {
        let roles =
            infer_columns(&headers(&["postal_ranges", "name", "oktmo"]), true).unwrap();
        assert_eq!(roles, ColumnRoles { code: 2, name: 1, ranges: Some(0) });
    }

    #[test]
    fn test_infer_positional_fallback() {
        let roles = infer_columns(&headers(&["a", "b", "c"]), true).unwrap();
        assert_eq!(roles, ColumnRoles { code: 0, name: 1, ranges: Some(2) });
    }

    #[test]
    fn test_single_column_rejected() {
        assert!(matches!(
            infer_columns(&headers(&["only"]), false),
            Err(ReferenceError::MissingColumns(_))
        ));
    }
}
