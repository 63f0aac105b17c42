//! Per-run diagnostics, keyed by 1-based source line.

use serde::Serialize;

/// A field whose value changed during normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldChange {
    pub row: usize,
    pub field: String,
    pub original: String,
    pub normalized: String,
}

/// A value that failed its validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub row: usize,
    pub field: String,
    pub value: String,
    pub message: String,
}

/// A blank field filled from a reference directory or the address service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enrichment {
    pub row: usize,
    pub field: String,
    pub old: String,
    pub new: String,
}

/// A row that was not converted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedRow {
    pub row: usize,
    pub reason: String,
}

/// Append-only logs collected while processing a dataset.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Diagnostics {
    pub changes: Vec<FieldChange>,
    pub errors: Vec<ValidationIssue>,
    pub enrichments: Vec<Enrichment>,
    pub skipped: Vec<SkippedRow>,
    /// Required-field warnings from the output schema check
    pub warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn change(&mut self, row: usize, field: &str, original: &str, normalized: &str) {
        self.changes.push(FieldChange {
            row,
            field: field.to_string(),
            original: original.to_string(),
            normalized: normalized.to_string(),
        });
    }

    pub fn error(&mut self, row: usize, field: &str, value: &str, message: impl Into<String>) {
        self.errors.push(ValidationIssue {
            row,
            field: field.to_string(),
            value: value.to_string(),
            message: message.into(),
        });
    }

    pub fn enrichment(&mut self, row: usize, field: &str, old: &str, new: &str) {
        self.enrichments.push(Enrichment {
            row,
            field: field.to_string(),
            old: old.to_string(),
            new: new.to_string(),
        });
    }

    pub fn skip(&mut self, row: usize, reason: impl Into<String>) {
        self.skipped.push(SkippedRow {
            row,
            reason: reason.into(),
        });
    }

    /// One-line summary, e.g. for the log stream.
    pub fn summary(&self) -> String {
        format!(
            "{} changes, {} validation errors, {} enrichments, {} skipped",
            self.changes.len(),
            self.errors.len(),
            self.enrichments.len(),
            self.skipped.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logs_are_append_only_and_keyed() {
        let mut diag = Diagnostics::new();
        diag.change(2, "phone", "8 916", "+70000000916");
        diag.error(3, "snils_code", "123", "bad");
        diag.enrichment(2, "municipality_code", "", "63701000");
        diag.skip(5, "two blank rows");

        assert_eq!(diag.changes[0].row, 2);
        assert_eq!(diag.errors[0].field, "snils_code");
        assert_eq!(diag.enrichments[0].new, "63701000");
        assert_eq!(diag.skipped[0].row, 5);
        assert_eq!(
            diag.summary(),
            "1 changes, 1 validation errors, 1 enrichments, 1 skipped"
        );
    }
}
