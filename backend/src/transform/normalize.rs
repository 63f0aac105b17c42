//! Value normalizers.
//!
//! Pure `&RawValue -> String` functions, one per [`super::FieldKind`].
//! None of them fail: an input they cannot interpret comes back trimmed.

use chrono::{DateTime, Days, NaiveDate};

use crate::models::{format_number, RawValue};

/// Text date layouts tried in order.
const DATE_FORMATS: &[&str] = &[
    "%d.%m.%Y", "%d-%m-%Y", "%d/%m/%Y", "%Y-%m-%d", "%Y.%m.%d", "%Y/%m/%d",
];

/// Spreadsheet serial day numbers accepted as dates.
const SERIAL_RANGE: std::ops::RangeInclusive<f64> = 10_000.0..=100_000.0;

/// Unix seconds accepted as dates.
const UNIX_RANGE: std::ops::RangeInclusive<f64> = 1_000_000_000.0..=2_000_000_000.0;

const FLAG_TRUE: &[&str] = &["true", "1", "да", "yes", "истина"];
const FLAG_FALSE: &[&str] = &["false", "0", "нет", "no", "ложь"];

/// Keep ASCII digits only.
pub fn digits_only(s: &str) -> String {
    s.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Spreadsheet serial (epoch 1899-12-30) to a calendar date. Time of day is dropped.
pub fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !SERIAL_RANGE.contains(&serial) {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(serial.floor() as u64))
}

fn unix_to_date(seconds: f64) -> Option<NaiveDate> {
    if !UNIX_RANGE.contains(&seconds) {
        return None;
    }
    DateTime::from_timestamp(seconds as i64, 0).map(|dt| dt.date_naive())
}

fn date_from_number(n: f64) -> Option<NaiveDate> {
    serial_to_date(n).or_else(|| unix_to_date(n))
}

fn iso(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Dates to `YYYY-MM-DD`; unparseable input is returned trimmed.
pub fn normalize_date(value: &RawValue) -> String {
    match value {
        RawValue::Empty => String::new(),
        RawValue::Date(d) => iso(*d),
        RawValue::Number(n) => date_from_number(*n)
            .map(iso)
            .unwrap_or_else(|| format_number(*n)),
        RawValue::Bool(b) => b.to_string(),
        RawValue::Text(s) => normalize_date_text(s),
    }
}

fn normalize_date_text(s: &str) -> String {
    let text = s.trim();
    if text.is_empty() {
        return String::new();
    }

    // 1.5e9 and friends stay as typed
    if text.contains(['e', 'E']) && text.parse::<f64>().is_ok() {
        return text.to_string();
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(text, fmt) {
            return iso(date);
        }
    }

    // ISO with a trailing time part
    if let Some((day, _)) = text.split_once(['T', ' ']) {
        if let Ok(date) = NaiveDate::parse_from_str(day, "%Y-%m-%d") {
            return iso(date);
        }
    }

    if let Ok(n) = text.parse::<f64>() {
        if let Some(date) = date_from_number(n) {
            return iso(date);
        }
    }

    text.to_string()
}

/// Phones to `+7` followed by ten digits where the input allows it.
pub fn normalize_phone(value: &RawValue) -> String {
    let digits = digits_only(&value.to_plain_string());
    if digits.is_empty() {
        return String::new();
    }

    let trunk = digits.starts_with('7') || digits.starts_with('8');
    let len = digits.len();

    if len == 11 && trunk {
        format!("+7{}", &digits[1..])
    } else if len == 10 {
        format!("+7{}", digits)
    } else if trunk && len - 1 < 10 {
        format!("+7{:0>10}", &digits[1..])
    } else {
        format!("+7{}", &digits[len.saturating_sub(10)..])
    }
}

/// SNILS to `XXX-XXX-XXX XX` when it has 11 digits.
pub fn normalize_snils(value: &RawValue) -> String {
    let original = value.to_plain_string();
    let digits = digits_only(&original);
    if digits.len() != 11 {
        return original;
    }
    format!(
        "{}-{}-{} {}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..11]
    )
}

/// Six-digit postal codes; anything else is returned trimmed.
pub fn normalize_postal_code(value: &RawValue) -> String {
    let original = value.to_plain_string();
    let digits = digits_only(&original);
    if digits.len() == 6 {
        digits
    } else {
        original
    }
}

/// Flags to `"true"` / `"false"`.
///
/// Unrecognized tokens map to `"false"`: the registry treats anything that
/// is not an explicit yes as no.
pub fn normalize_flag(value: &RawValue) -> String {
    if let RawValue::Bool(b) = value {
        return b.to_string();
    }

    let token = value.to_plain_string().to_lowercase();
    if token.is_empty() {
        String::new()
    } else if FLAG_TRUE.contains(&token.as_str()) {
        "true".to_string()
    } else {
        if !FLAG_FALSE.contains(&token.as_str()) {
            tracing::debug!(token = %token, "unrecognized flag value, using false");
        }
        "false".to_string()
    }
}

/// Series and numbers: drop a float `.0` tail and all whitespace.
pub fn normalize_numeric_id(value: &RawValue) -> String {
    let plain = value.to_plain_string();
    let plain = plain.strip_suffix(".0").unwrap_or(&plain);
    plain.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Collapse whitespace runs to one space.
pub fn normalize_text(value: &RawValue) -> String {
    value
        .to_plain_string()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawValue {
        RawValue::from(s)
    }

    #[test]
    fn test_date_text_formats() {
        assert_eq!(normalize_date(&text("01.02.1990")), "1990-02-01");
        assert_eq!(normalize_date(&text("01-02-1990")), "1990-02-01");
        assert_eq!(normalize_date(&text("01/02/1990")), "1990-02-01");
        assert_eq!(normalize_date(&text("1990-02-01")), "1990-02-01");
        assert_eq!(normalize_date(&text("1990.02.01")), "1990-02-01");
        assert_eq!(normalize_date(&text("1990-02-01 00:00:00")), "1990-02-01");
        assert_eq!(normalize_date(&text("1990-02-01T10:30:00")), "1990-02-01");
    }

    #[test]
    fn test_date_iso_round_trip() {
        for s in ["2000-01-01", "2021-12-31", "1955-06-15"] {
            assert_eq!(normalize_date(&text(s)), s);
        }
    }

    #[test]
    fn test_date_serials() {
        assert_eq!(normalize_date(&RawValue::Number(44197.0)), "2021-01-01");
        assert_eq!(normalize_date(&RawValue::Number(44197.75)), "2021-01-01");
        assert_eq!(normalize_date(&text("44197")), "2021-01-01");
    }

    #[test]
    fn test_date_unix_seconds() {
        assert_eq!(normalize_date(&RawValue::Number(1_600_000_000.0)), "2020-09-13");
    }

    #[test]
    fn test_date_passthrough() {
        assert_eq!(normalize_date(&text(" not a date ")), "not a date");
        assert_eq!(normalize_date(&text("1.6e9")), "1.6e9");
        assert_eq!(normalize_date(&RawValue::Number(12.0)), "12");
        assert_eq!(normalize_date(&RawValue::Empty), "");
    }

    #[test]
    fn test_date_native() {
        let d = NaiveDate::from_ymd_opt(2019, 3, 4).unwrap();
        assert_eq!(normalize_date(&RawValue::Date(d)), "2019-03-04");
    }

    #[test]
    fn test_phone_variants() {
        assert_eq!(normalize_phone(&text("8 (916) 123-45-67")), "+79161234567");
        assert_eq!(normalize_phone(&text("+7 916 123 45 67")), "+79161234567");
        assert_eq!(normalize_phone(&text("9161234567")), "+79161234567");
        assert_eq!(normalize_phone(&RawValue::Number(89161234567.0)), "+79161234567");
        assert_eq!(normalize_phone(&text("8123")), "+70000000123");
        assert_eq!(normalize_phone(&text("")), "");
    }

    #[test]
    fn test_phone_shape_for_ten_and_eleven_digits() {
        let re = regex::Regex::new(r"^\+7\d{10}$").unwrap();
        for input in ["9001112233", "79001112233", "89001112233", "1234567890"] {
            assert!(re.is_match(&normalize_phone(&text(input))), "{}", input);
        }
    }

    #[test]
    fn test_phone_long_input_keeps_last_ten() {
        assert_eq!(normalize_phone(&text("123456789012345")), "+76789012345");
    }

    #[test]
    fn test_snils_grouping_and_idempotence() {
        let once = normalize_snils(&text("12345678901"));
        assert_eq!(once, "123-456-789 01");
        assert_eq!(normalize_snils(&text(&once)), once);
        assert_eq!(normalize_snils(&text("123")), "123");
    }

    #[test]
    fn test_postal_code() {
        assert_eq!(normalize_postal_code(&text(" 410 000 ")), "410000");
        assert_eq!(normalize_postal_code(&RawValue::Number(410000.0)), "410000");
        assert_eq!(normalize_postal_code(&text("4100")), "4100");
    }

    #[test]
    fn test_flag_mapping() {
        assert_eq!(normalize_flag(&text("Да")), "true");
        assert_eq!(normalize_flag(&text("ИСТИНА")), "true");
        assert_eq!(normalize_flag(&RawValue::Number(1.0)), "true");
        assert_eq!(normalize_flag(&text("нет")), "false");
        assert_eq!(normalize_flag(&RawValue::Bool(false)), "false");
        assert_eq!(normalize_flag(&text("")), "");
    }

    #[test]
    fn test_flag_unknown_token_is_false() {
        assert_eq!(normalize_flag(&text("unknown-token")), "false");
        assert_eq!(normalize_flag(&text("может быть")), "false");
    }

    #[test]
    fn test_numeric_id() {
        assert_eq!(normalize_numeric_id(&RawValue::Number(3456.0)), "3456");
        assert_eq!(normalize_numeric_id(&text("12 34.0")), "1234");
        assert_eq!(normalize_numeric_id(&text("АБ 12")), "АБ12");
    }

    #[test]
    fn test_text_collapses_whitespace() {
        assert_eq!(normalize_text(&text("  Иван   Иванович \t ")), "Иван Иванович");
    }
}
