//! Spreadsheet reading through calamine (xlsx, xlsm, xlsb, xls, ods).

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};

use super::{build_table, ParseResult};
use crate::error::{LoadError, LoadResult};
use crate::models::RawValue;
use crate::transform::normalize::serial_to_date;

/// Sheet names of a workbook, in workbook order.
pub fn sheet_names(path: &Path) -> LoadResult<Vec<String>> {
    let workbook = open_workbook_auto(path).map_err(|e| LoadError::Spreadsheet(e.to_string()))?;
    Ok(workbook.sheet_names().to_vec())
}

/// Read one sheet (default: first) into a [`ParseResult`].
pub fn parse_spreadsheet(path: &Path, sheet: Option<&str>) -> LoadResult<ParseResult> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| LoadError::Spreadsheet(e.to_string()))?;
    let names = workbook.sheet_names().to_vec();

    let name = match sheet {
        Some(wanted) => names
            .iter()
            .find(|n| {
                n.as_str() == wanted || n.trim().to_lowercase() == wanted.trim().to_lowercase()
            })
            .cloned()
            .ok_or_else(|| LoadError::SheetNotFound {
                name: wanted.to_string(),
                available: names.join(", "),
            })?,
        None => names.first().cloned().ok_or(LoadError::EmptyFile)?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| LoadError::Spreadsheet(e.to_string()))?;
    if range.is_empty() {
        return Err(LoadError::EmptyFile);
    }

    let first_row = range.start().map(|(row, _)| row as usize).unwrap_or(0);
    tracing::debug!(sheet = %name, rows = range.height(), "reading sheet");

    let grid = range
        .rows()
        .enumerate()
        .map(|(i, row)| (first_row + i + 1, row.iter().map(cell_to_raw).collect()))
        .collect();

    let mut table = build_table(grid)?;
    table.sheet = Some(name);
    Ok(table)
}

fn cell_to_raw(cell: &Data) -> RawValue {
    match cell {
        Data::Empty | Data::Error(_) => RawValue::Empty,
        Data::String(s) => RawValue::from(s.as_str()),
        Data::Float(f) => RawValue::Number(*f),
        Data::Int(i) => RawValue::Number(*i as f64),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::DateTime(dt) => {
            let serial = dt.as_f64();
            serial_to_date(serial)
                .map(RawValue::Date)
                .unwrap_or(RawValue::Number(serial))
        }
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawValue::Text(s.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_cell_conversion() {
        assert_eq!(cell_to_raw(&Data::Empty), RawValue::Empty);
        assert_eq!(cell_to_raw(&Data::Int(7)), RawValue::Number(7.0));
        assert_eq!(
            cell_to_raw(&Data::String("Иванов".into())),
            RawValue::Text("Иванов".into())
        );
        assert_eq!(cell_to_raw(&Data::String(String::new())), RawValue::Empty);
        assert_eq!(cell_to_raw(&Data::Bool(true)), RawValue::Bool(true));
    }

    #[test]
    fn test_serial_dates_become_dates() {
        let date = serial_to_date(44197.0).map(RawValue::Date);
        assert_eq!(
            date,
            Some(RawValue::Date(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()))
        );
    }

    fn fixture() -> &'static Path {
        Path::new(concat!(env!("CARGO_MANIFEST_DIR"), "/testdata/registry.xlsx"))
    }

    #[test]
    fn test_workbook_sheet_names() {
        assert_eq!(sheet_names(fixture()).unwrap(), vec!["Реестр", "Лист2"]);
    }

    #[test]
    fn test_first_sheet_by_default() {
        let table = parse_spreadsheet(fixture(), None).unwrap();

        assert_eq!(table.sheet.as_deref(), Some("Реестр"));
        assert_eq!(table.headers, vec!["surname", "birth_date", "number_ticket"]);
        assert_eq!(table.records.len(), 1);
        assert_eq!(table.line_of(0), 2);
        assert_eq!(
            table.records[0]["birth_date"],
            RawValue::Date(NaiveDate::from_ymd_opt(1990, 2, 1).unwrap())
        );
        assert_eq!(table.records[0]["number_ticket"], RawValue::Number(3456.0));
    }

    #[test]
    fn test_sheet_selected_case_insensitively() {
        let table = parse_spreadsheet(fixture(), Some("лист2")).unwrap();

        assert_eq!(table.sheet.as_deref(), Some("Лист2"));
        assert_eq!(table.records[0]["surname"], RawValue::Text("Петров".into()));
        // Sheet data starts at row 3
        assert_eq!(table.line_of(0), 4);
    }

    #[test]
    fn test_exact_sheet_name() {
        let table = parse_spreadsheet(fixture(), Some("Реестр")).unwrap();
        assert_eq!(table.sheet.as_deref(), Some("Реестр"));
    }

    #[test]
    fn test_unknown_sheet() {
        let err = parse_spreadsheet(fixture(), Some("Нет")).unwrap_err();
        match err {
            LoadError::SheetNotFound { name, available } => {
                assert_eq!(name, "Нет");
                assert_eq!(available, "Реестр, Лист2");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unreadable_workbook() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();

        let err = parse_spreadsheet(&path, None).unwrap_err();
        assert!(matches!(err, LoadError::Spreadsheet(_)));
    }
}
