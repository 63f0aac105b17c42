//! Plain-text conversion report (`conversion_report.txt`).

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use super::write_atomically;
use crate::error::ConvertResult;
use crate::transform::Diagnostics;

pub const REPORT_FILE: &str = "conversion_report.txt";

const RULE: &str = "============================================================";

/// Everything the report prints.
#[derive(Debug, Clone)]
pub struct ReportContext<'a> {
    pub input_name: String,
    /// `(code, display name)` of the region filter
    pub region: Option<(String, String)>,
    pub total_rows: usize,
    pub processed_rows: usize,
    pub skipped_rows: usize,
    pub output_files: &'a [PathBuf],
    pub diagnostics: &'a Diagnostics,
}

/// Render the report text.
pub fn render_report(ctx: &ReportContext<'_>) -> String {
    let mut out = String::new();
    let diag = ctx.diagnostics;

    // Writing to a String cannot fail.
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "ОТЧЕТ О КОНВЕРТАЦИИ");
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "Дата: {}", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"));
    let _ = writeln!(out, "Файл: {}", ctx.input_name);
    match &ctx.region {
        Some((code, name)) => {
            let _ = writeln!(out, "Регион: {} ({})", name, code);
        }
        None => {
            let _ = writeln!(out, "Регион: не указан");
        }
    }
    let _ = writeln!(out, "Всего строк: {}", ctx.total_rows);
    let _ = writeln!(out, "Записей: {}", ctx.processed_rows);
    let _ = writeln!(out, "Пропущено строк: {}", ctx.skipped_rows);
    for file in ctx.output_files {
        let name = file.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        let _ = writeln!(out, "Файл результата: {}", name);
    }

    section(&mut out, "ИЗМЕНЕНИЯ", diag.changes.iter().map(|c| {
        format!("Строка {}, {}: '{}' → '{}'", c.row, c.field, c.original, c.normalized)
    }));
    section(&mut out, "ОШИБКИ ПРОВЕРКИ", diag.errors.iter().map(|e| {
        format!("Строка {}, {}: '{}' ({})", e.row, e.field, e.value, e.message)
    }));
    section(&mut out, "ОБОГАЩЕНИЕ", diag.enrichments.iter().map(|e| {
        format!("Строка {}, {}: '{}' → '{}'", e.row, e.field, e.old, e.new)
    }));
    section(&mut out, "ПРОПУЩЕННЫЕ СТРОКИ", diag.skipped.iter().map(|s| {
        format!("Строка {}: {}", s.row, s.reason)
    }));
    section(&mut out, "ПРЕДУПРЕЖДЕНИЯ", diag.warnings.iter().cloned());

    let _ = writeln!(out, "{}", RULE);
    out
}

fn section(out: &mut String, title: &str, lines: impl ExactSizeIterator<Item = String>) {
    if lines.len() == 0 {
        return;
    }
    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "{} ({})", title, lines.len());
    for line in lines {
        let _ = writeln!(out, "  {}", line);
    }
}

/// Render and write the report into `folder`.
pub fn write_report(folder: &Path, ctx: &ReportContext<'_>) -> ConvertResult<PathBuf> {
    let written = write_atomically(folder, vec![(REPORT_FILE.to_string(), render_report(ctx))])?;
    Ok(written.into_iter().next().unwrap_or_else(|| folder.join(REPORT_FILE)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_lists_diagnostics() {
        let mut diag = Diagnostics::new();
        diag.change(2, "phone", "89161234567", "+79161234567");
        diag.skip(9, "two consecutive blank rows; 3 remaining row(s) ignored");
        let files = vec![PathBuf::from("/out/hunters.json")];

        let text = render_report(&ReportContext {
            input_name: "registry.xlsx".into(),
            region: Some(("63".into(), "Саратовская область".into())),
            total_rows: 10,
            processed_rows: 7,
            skipped_rows: 3,
            output_files: &files,
            diagnostics: &diag,
        });

        assert!(text.contains("ОТЧЕТ О КОНВЕРТАЦИИ"));
        assert!(text.contains("Файл: registry.xlsx"));
        assert!(text.contains("Регион: Саратовская область (63)"));
        assert!(text.contains("Записей: 7"));
        assert!(text.contains("ИЗМЕНЕНИЯ (1)"));
        assert!(text.contains("Строка 2, phone: '89161234567' → '+79161234567'"));
        assert!(text.contains("ПРОПУЩЕННЫЕ СТРОКИ (1)"));
        assert!(!text.contains("ОШИБКИ ПРОВЕРКИ"));
        assert!(text.contains("Файл результата: hunters.json"));
    }

    #[test]
    fn test_write_report() {
        let dir = tempfile::tempdir().unwrap();
        let diag = Diagnostics::new();
        let path = write_report(
            dir.path(),
            &ReportContext {
                input_name: "a.csv".into(),
                region: None,
                total_rows: 0,
                processed_rows: 0,
                skipped_rows: 0,
                output_files: &[],
                diagnostics: &diag,
            },
        )
        .unwrap();

        assert_eq!(path, dir.path().join(REPORT_FILE));
        assert!(std::fs::read_to_string(path).unwrap().contains("Регион: не указан"));
    }
}
