//! Tabular input loading for spreadsheets and delimited text.
//!
//! Produces [`RawRecord`]s keyed by header name. No registry-specific logic
//! here beyond the header-row convention.
//!
//! # Header rows
//!
//! Registry exports often carry two header rows: machine names
//! (`surname`, `birth_date`) followed by Russian captions
//! (`Фамилия`, `Дата рождения`). When row 1 looks latinized and row 2 looks
//! like native-script captions, row 1 names the fields and data starts at
//! row 3. Otherwise data starts at row 2.

pub mod delimited;
pub mod spreadsheet;

use std::collections::HashSet;
use std::path::Path;

use crate::error::{LoadError, LoadResult};
use crate::models::{RawRecord, RawValue};

pub use delimited::{
    decode_auto, decode_content, detect_delimiter, detect_encoding, parse_bytes_auto,
};
pub use spreadsheet::{parse_spreadsheet, sheet_names};

/// Spreadsheet extensions handled by calamine.
const SPREADSHEET_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

/// Result of loading a tabular file.
#[derive(Debug, Clone, Default)]
pub struct ParseResult {
    /// Data rows, in input order
    pub records: Vec<RawRecord>,
    /// 1-based source line (or sheet row) of each record
    pub line_numbers: Vec<usize>,
    /// Declared column names
    pub headers: Vec<String>,
    /// Encoding used to decode delimited text
    pub encoding: Option<String>,
    /// Delimiter used for delimited text
    pub delimiter: Option<char>,
    /// Sheet name for spreadsheets
    pub sheet: Option<String>,
    /// Whether a second (native-script) header row was skipped
    pub double_header: bool,
}

impl ParseResult {
    /// Source line of the record at `index`.
    pub fn line_of(&self, index: usize) -> usize {
        self.line_numbers
            .get(index)
            .copied()
            .unwrap_or(index + if self.double_header { 3 } else { 2 })
    }
}

/// Load a spreadsheet or delimited file, picking the reader by extension.
///
/// # Example
/// ```ignore
/// let table = hunterload::parser::load_table("registry.xlsx", Some("Лист1"))?;
/// println!("{} rows, columns: {}", table.records.len(), table.headers.join(", "));
/// ```
pub fn load_table<P: AsRef<Path>>(path: P, sheet: Option<&str>) -> LoadResult<ParseResult> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }

    if is_spreadsheet(path) {
        parse_spreadsheet(path, sheet)
    } else {
        let bytes = std::fs::read(path)?;
        parse_bytes_auto(&bytes)
    }
}

/// True when the extension is one calamine reads.
pub fn is_spreadsheet(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SPREADSHEET_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Turn a grid of `(line, cells)` rows into a [`ParseResult`].
pub(crate) fn build_table(grid: Vec<(usize, Vec<RawValue>)>) -> LoadResult<ParseResult> {
    let mut rows = grid.into_iter();

    let (_, header_row) = rows.next().ok_or(LoadError::EmptyFile)?;
    let headers = header_names(&header_row)?;

    let mut rest: Vec<(usize, Vec<RawValue>)> = rows.collect();

    let double_header = rest
        .first()
        .map(|(_, second)| is_latin_header(&header_row) && is_native_header(second))
        .unwrap_or(false);
    if double_header {
        rest.remove(0);
    }

    let mut records = Vec::with_capacity(rest.len());
    let mut line_numbers = Vec::with_capacity(rest.len());

    for (line, cells) in rest {
        let mut record = RawRecord::with_capacity(headers.len());
        for (i, header) in headers.iter().enumerate() {
            let value = cells.get(i).cloned().unwrap_or_default();
            record.insert(header.clone(), value);
        }
        records.push(record);
        line_numbers.push(line);
    }

    Ok(ParseResult {
        records,
        line_numbers,
        headers,
        double_header,
        ..Default::default()
    })
}

/// Header names from the first row; blanks and duplicates get positional names.
fn header_names(row: &[RawValue]) -> LoadResult<Vec<String>> {
    if row.iter().all(RawValue::is_blank) {
        return Err(LoadError::NoHeaders);
    }

    let mut seen = HashSet::new();
    let headers = row
        .iter()
        .enumerate()
        .map(|(i, cell)| {
            let name = cell
                .to_plain_string()
                .trim_start_matches('\u{feff}')
                .trim()
                .trim_matches('"')
                .to_string();
            if !name.is_empty() && seen.insert(name.clone()) {
                name
            } else {
                format!("column_{}", i + 1)
            }
        })
        .collect();

    Ok(headers)
}

fn has_cyrillic(s: &str) -> bool {
    s.chars().any(|c| matches!(c, '\u{0400}'..='\u{04FF}'))
}

/// Row of ASCII identifiers such as `surname`, `birth_date`.
fn is_latin_header(row: &[RawValue]) -> bool {
    let mut any = false;
    for cell in row.iter().filter(|c| !c.is_blank()) {
        match cell {
            RawValue::Text(s) => {
                let s = s.trim_start_matches('\u{feff}');
                if !s.is_ascii() || !s.chars().any(|c| c.is_ascii_alphabetic()) {
                    return false;
                }
                any = true;
            }
            _ => return false,
        }
    }
    any
}

/// Word stems of the Russian column captions used by registry exports.
const CAPTION_STEMS: &[&str] = &[
    "фамилия", "имя", "отчество", "дата", "место", "адрес", "почтов", "индекс", "телефон",
    "снилс", "серия", "номер", "билет", "паспорт", "муниципал", "октмо", "национальн",
    "коренн", "аннулир", "причин", "код", "наименован",
];

fn is_caption(s: &str) -> bool {
    let lower = s.trim().to_lowercase();
    lower.split_whitespace().nth(1).is_some()
        || CAPTION_STEMS.iter().any(|stem| lower.starts_with(stem))
}

/// Row of Cyrillic captions: no digits, and more than half of the cells read
/// as captions (a known caption word or several words). A row of names such
/// as `Иванов;Иван` is data.
fn is_native_header(row: &[RawValue]) -> bool {
    let mut cells = 0usize;
    let mut captions = 0usize;
    let mut cyrillic = false;
    for cell in row.iter().filter(|c| !c.is_blank()) {
        match cell {
            RawValue::Text(s) => {
                if s.chars().any(|c| c.is_ascii_digit()) {
                    return false;
                }
                cyrillic |= has_cyrillic(s);
                cells += 1;
                if is_caption(s) {
                    captions += 1;
                }
            }
            _ => return false,
        }
    }
    cyrillic && captions * 2 > cells
}
