//! Delimited text with encoding and delimiter auto-detection.

use encoding_rs::{Encoding, IBM866, KOI8_R, UTF_8, WINDOWS_1251};

use super::{build_table, ParseResult};
use crate::error::{LoadError, LoadResult};
use crate::models::RawValue;

/// Fixed fallback order after UTF-8 and the detector's guess.
const FALLBACK_ENCODINGS: &[&Encoding] = &[WINDOWS_1251, KOI8_R, IBM866];

/// Detector guesses worth trying before the fallbacks.
const TRUSTED_GUESSES: &[&str] = &[
    "windows-1251",
    "koi8-r",
    "ibm866",
    "x-mac-cyrillic",
    "iso-8859-5",
];

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Detect the encoding of raw bytes using chardet
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "windows-1251" | "cp1251" => "windows-1251".to_string(),
        "koi8-r" => "koi8-r".to_string(),
        "ibm866" | "cp866" => "ibm866".to_string(),
        "maccyrillic" => "x-mac-cyrillic".to_string(),
        other => other.to_string(),
    }
}

/// Strictly decode bytes with the named encoding; `None` on any malformed sequence.
pub fn decode_content(bytes: &[u8], encoding: &str) -> Option<String> {
    let encoding = Encoding::for_label(encoding.as_bytes())?;
    encoding
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|s| s.into_owned())
}

/// Try UTF-8, then the detector's guess, then the fixed Cyrillic list.
///
/// Returns the decoded text and the name of the encoding that worked.
pub fn decode_auto(bytes: &[u8]) -> LoadResult<(String, String)> {
    if let Some(rest) = bytes.strip_prefix(UTF8_BOM) {
        if let Ok(s) = std::str::from_utf8(rest) {
            return Ok((s.to_string(), "utf-8".to_string()));
        }
    }

    let mut candidates: Vec<&'static Encoding> = vec![UTF_8];
    let guess = detect_encoding(bytes);
    if TRUSTED_GUESSES.contains(&guess.as_str()) {
        if let Some(enc) = Encoding::for_label(guess.as_bytes()) {
            candidates.push(enc);
        }
    }
    for enc in FALLBACK_ENCODINGS {
        if !candidates.contains(enc) {
            candidates.push(enc);
        }
    }

    for enc in &candidates {
        if let Some(text) = enc.decode_without_bom_handling_and_without_replacement(bytes) {
            tracing::debug!(encoding = enc.name(), "decoded input");
            return Ok((text.into_owned(), enc.name().to_lowercase()));
        }
    }

    let tried: Vec<&str> = candidates.iter().map(|e| e.name()).collect();
    Err(LoadError::Encoding(tried.join(", ")))
}

/// Pick `;` or `,` by counting occurrences in the first line. Ties go to `;`.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let semicolons = first_line.matches(';').count();
    let commas = first_line.matches(',').count();

    if commas > semicolons {
        ','
    } else {
        ';'
    }
}

/// Parse delimited bytes with auto-detection of encoding and delimiter.
pub fn parse_bytes_auto(bytes: &[u8]) -> LoadResult<ParseResult> {
    let (content, encoding) = decode_auto(bytes)?;
    let delimiter = detect_delimiter(&content);
    parse_string_with_metadata(&content, delimiter, encoding)
}

/// Parse already-decoded text with an explicit delimiter.
pub fn parse_string_with_metadata(
    content: &str,
    delimiter: char,
    encoding: String,
) -> LoadResult<ParseResult> {
    if content.trim().is_empty() {
        return Err(LoadError::EmptyFile);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let bytes = content.as_bytes();
    let lines = LineIndex::new(content);
    let mut grid = Vec::new();
    let mut record = csv::StringRecord::new();
    let mut previous_end: Option<usize> = None;

    while reader.read_record(&mut record)? {
        // The record position is taken before csv skips empty lines.
        let gap = record
            .position()
            .map(|p| p.byte() as usize)
            .unwrap_or(0)
            .min(bytes.len());
        let start = gap + bytes[gap..].iter().take_while(|b| is_line_break(**b)).count();
        let line = lines.line_of(start);

        // Empty lines are blank rows, not separators.
        if let Some(end) = previous_end {
            for blank in end + 1..line {
                grid.push((blank, Vec::new()));
            }
        }

        let after = (reader.position().byte() as usize).min(bytes.len());
        let last = bytes[..after]
            .iter()
            .rposition(|b| !is_line_break(*b))
            .unwrap_or(start);
        previous_end = Some(lines.line_of(last.max(start)));

        grid.push((line, record.iter().map(RawValue::from).collect()));
    }

    let mut table = build_table(grid)?;
    table.encoding = Some(encoding);
    table.delimiter = Some(delimiter);
    Ok(table)
}

fn is_line_break(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

/// Byte offset to 1-based line number.
struct LineIndex {
    starts: Vec<usize>,
}

impl LineIndex {
    fn new(text: &str) -> Self {
        let mut starts = vec![0];
        starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { starts }
    }

    fn line_of(&self, byte: usize) -> usize {
        self.starts.partition_point(|&start| start <= byte)
    }
}
