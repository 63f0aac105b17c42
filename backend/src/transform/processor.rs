//! Row processor.
//!
//! Each row moves through `Received → Normalized → Enriched → Validated →
//! Projected`. The only way to skip a row is the blank-row halt: two
//! consecutive blank rows end the dataset, and every row from the first of
//! the pair onward is dropped. A lone blank row is processed like any other.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::diagnostics::Diagnostics;
use super::fields::FieldTable;
use super::projection::{project_person, project_ticket};
use crate::enrich::Enricher;
use crate::models::{NormalizedRecord, PersonRecord, RawRecord, TicketRecord};
use crate::parser::ParseResult;
use crate::validation::RuleSet;

/// Cooperative cancellation shared between a run and its caller.
#[derive(Debug, Clone, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Lifecycle of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Received,
    Normalized,
    Enriched,
    Validated,
    Projected,
    Skipped,
}

/// Index of the first of two consecutive blank rows.
pub fn find_halt(rows: &[RawRecord], fields: &FieldTable) -> Option<usize> {
    rows.windows(2)
        .position(|pair| fields.is_blank_row(&pair[0]) && fields.is_blank_row(&pair[1]))
}

/// One fully processed row.
#[derive(Debug, Clone)]
pub struct ProcessedRow {
    pub line: usize,
    pub record: NormalizedRecord,
    pub person: PersonRecord,
    pub ticket: TicketRecord,
}

/// Result of the row loop.
#[derive(Debug, Default)]
pub struct ProcessOutput {
    pub hunters: Vec<PersonRecord>,
    pub tickets: Vec<TicketRecord>,
    /// Source line of each output record
    pub lines: Vec<usize>,
    pub diagnostics: Diagnostics,
    /// Data rows in the input
    pub total_rows: usize,
    /// Source line where the blank-row halt hit
    pub halted_at: Option<usize>,
    /// Loop ended because the stop flag was set
    pub stopped: bool,
}

impl ProcessOutput {
    pub fn processed_rows(&self) -> usize {
        self.hunters.len()
    }

    pub fn skipped_rows(&self) -> usize {
        self.total_rows.saturating_sub(self.hunters.len())
    }
}

pub struct RowProcessor<'a> {
    fields: &'a FieldTable,
    rules: &'a RuleSet,
    enricher: Enricher<'a>,
    stop: StopFlag,
}

impl<'a> RowProcessor<'a> {
    pub fn new(
        fields: &'a FieldTable,
        rules: &'a RuleSet,
        enricher: Enricher<'a>,
        stop: StopFlag,
    ) -> Self {
        Self {
            fields,
            rules,
            enricher,
            stop,
        }
    }

    /// Take one row through every stage.
    pub fn process_row(
        &self,
        raw: &RawRecord,
        line: usize,
        diagnostics: &mut Diagnostics,
    ) -> ProcessedRow {
        let mut state = RowState::Received;

        let (mut record, changes) = self.fields.normalize_row(raw);
        for (field, original, normalized) in &changes {
            diagnostics.change(line, field, original, normalized);
        }
        state = advance(state, RowState::Normalized, line);

        self.enricher.enrich(&mut record, line, diagnostics);
        state = advance(state, RowState::Enriched, line);

        for (field, value, message) in self.rules.validate_record(&record) {
            tracing::debug!(line, field = %field, message = %message, "validation failed");
            diagnostics.error(line, &field, &value, message);
        }
        state = advance(state, RowState::Validated, line);

        let person = project_person(&record);
        let ticket = project_ticket(&record);
        advance(state, RowState::Projected, line);

        ProcessedRow {
            line,
            record,
            person,
            ticket,
        }
    }

    /// Process a whole table.
    pub fn run(&self, table: &ParseResult) -> ProcessOutput {
        self.run_with_progress(table, |_, _| {})
    }

    /// Process a whole table, calling `progress(processed, total)` after each row.
    pub fn run_with_progress(
        &self,
        table: &ParseResult,
        mut progress: impl FnMut(usize, usize),
    ) -> ProcessOutput {
        let mut output = ProcessOutput {
            total_rows: table.records.len(),
            ..Default::default()
        };
        let halt = find_halt(&table.records, self.fields);

        for (i, raw) in table.records.iter().enumerate() {
            if self.stop.is_stopped() {
                tracing::info!(processed = output.hunters.len(), "stop requested, ending row loop");
                output.stopped = true;
                break;
            }

            let line = table.line_of(i);

            if halt == Some(i) {
                advance(RowState::Received, RowState::Skipped, line);
                tracing::warn!(line, "two consecutive blank rows, ignoring the rest of the file");
                output.diagnostics.skip(
                    line,
                    format!(
                        "two consecutive blank rows; {} remaining row(s) ignored",
                        table.records.len() - i
                    ),
                );
                output.halted_at = Some(line);
                break;
            }

            let row = self.process_row(raw, line, &mut output.diagnostics);
            output.hunters.push(row.person);
            output.tickets.push(row.ticket);
            output.lines.push(row.line);
            progress(output.hunters.len(), output.total_rows);
        }

        output
    }
}

fn advance(from: RowState, to: RowState, line: usize) -> RowState {
    tracing::trace!(line, ?from, ?to, "row state");
    to
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enrich::AddressHints;
    use crate::models::RawValue;
    use crate::parser::build_table;
    use crate::reference::{AdminDirectory, CategoryDirectory};

    fn grid(rows: &[&[&str]]) -> Vec<(usize, Vec<RawValue>)> {
        rows.iter()
            .enumerate()
            .map(|(i, cells)| (i + 1, cells.iter().map(|c| RawValue::from(*c)).collect()))
            .collect()
    }

    fn run(table: &ParseResult, stop: StopFlag) -> ProcessOutput {
        let fields = FieldTable::from_headers(&table.headers);
        let rules = RuleSet::registry();
        let admin = AdminDirectory::empty();
        let category = CategoryDirectory::not_loaded();
        let hints = AddressHints::new();
        let enricher = Enricher::new(&admin, &category, &hints);
        RowProcessor::new(&fields, &rules, enricher, stop).run(table)
    }

    fn names_table(count: usize) -> ParseResult {
        let mut rows = vec![vec!["surname".to_string()]];
        rows.extend((1..=count).map(|i| vec![format!("Охотник{}", i)]));
        let grid = rows
            .into_iter()
            .enumerate()
            .map(|(i, cells)| (i + 1, cells.into_iter().map(RawValue::from).collect()))
            .collect();
        build_table(grid).unwrap()
    }

    #[test]
    fn test_end_to_end_row() {
        let table = build_table(grid(&[
            &[
                "surname", "hunter_name", "patronymic", "birth_date", "phone",
                "snils_code", "series_ticket", "number_ticket", "date_issue_ticket",
            ],
            &[
                "Иванов", "Иван", "Иванович", "01.02.1990", "89161234567",
                "12345678901", "АБ 12", "003456", "2020-05-01",
            ],
        ]))
        .unwrap();

        let out = run(&table, StopFlag::new());
        let person = &out.hunters[0];

        assert_eq!(person.birth_date, "1990-02-01");
        assert_eq!(person.phone, "+79161234567");
        assert_eq!(person.snils_code, "123-456-789 01");
        assert_eq!(person.series_ticket, "АБ12");
        assert_eq!(person.number_ticket, "003456");
        assert_eq!(out.tickets[0].series, "АБ12");
        assert!(out.diagnostics.errors.is_empty(), "{:?}", out.diagnostics.errors);
        assert!(out.diagnostics.changes.iter().all(|c| c.row == 2));
    }

    #[test]
    fn test_two_blank_rows_halt_once() {
        let table = build_table(grid(&[
            &["surname", "hunter_name"],
            &["Иванов", "Иван"],
            &["", ""],
            &["", ""],
            &["Петров", "Пётр"],
            &["", ""],
            &["", ""],
        ]))
        .unwrap();

        let out = run(&table, StopFlag::new());

        assert_eq!(out.hunters.len(), 1);
        assert_eq!(out.tickets.len(), 1);
        assert!(out.hunters.iter().all(|h| h.surname != "Петров"));
        assert_eq!(out.diagnostics.skipped.len(), 1);
        assert_eq!(out.halted_at, Some(3));
        assert_eq!(out.skipped_rows(), 5);
    }

    #[test]
    fn test_single_blank_row_is_processed() {
        let table = build_table(grid(&[
            &["surname", "hunter_name"],
            &["Иванов", "Иван"],
            &["", ""],
            &["Петров", "Пётр"],
        ]))
        .unwrap();

        let out = run(&table, StopFlag::new());

        assert_eq!(out.hunters.len(), 3);
        assert_eq!(out.hunters[1].surname, "");
        assert_eq!(out.hunters[2].surname, "Петров");
        assert!(out.diagnostics.skipped.is_empty());
    }

    #[test]
    fn test_stop_flag_ends_loop() {
        let table = build_table(grid(&[&["surname"], &["Иванов"], &["Петров"]])).unwrap();
        let stop = StopFlag::new();
        stop.stop();

        let out = run(&table, stop);

        assert!(out.stopped);
        assert!(out.hunters.is_empty());
    }

    #[test]
    fn test_stop_during_loop_keeps_processed_rows() {
        let table = names_table(5);
        let fields = FieldTable::from_headers(&table.headers);
        let rules = RuleSet::registry();
        let admin = AdminDirectory::empty();
        let category = CategoryDirectory::not_loaded();
        let hints = AddressHints::new();
        let stop = StopFlag::new();
        let enricher = Enricher::new(&admin, &category, &hints);
        let processor = RowProcessor::new(&fields, &rules, enricher, stop.clone());

        let mut calls = Vec::new();
        let out = processor.run_with_progress(&table, |done, total| {
            calls.push((done, total));
            if done == 2 {
                stop.stop();
            }
        });

        assert!(out.stopped);
        assert_eq!(out.hunters.len(), 2);
        assert_eq!(out.hunters[1].surname, "Охотник2");
        assert_eq!(out.lines, vec![2, 3]);
        assert_eq!(calls, vec![(1, 5), (2, 5)]);
        assert_eq!(out.skipped_rows(), 3);
    }

    #[test]
    fn test_validation_errors_keyed_by_line() {
        let table = build_table(grid(&[
            &["surname", "hunter_name", "phone"],
            &["Иванов", "Иван", "12"],
        ]))
        .unwrap();

        let out = run(&table, StopFlag::new());

        let phone = out.diagnostics.errors.iter().find(|e| e.field == "phone").unwrap();
        assert_eq!(phone.row, 2);
        assert_eq!(phone.value, "+712");
    }

    #[test]
    fn test_find_halt() {
        let fields = FieldTable::from_headers(&["a"]);
        let blank = RawRecord::new();
        let mut full = RawRecord::new();
        full.insert("a".into(), RawValue::from("x"));

        assert_eq!(find_halt(&[full.clone(), blank.clone(), full.clone()], &fields), None);
        assert_eq!(find_halt(&[full, blank.clone(), blank], &fields), Some(1));
    }
}
