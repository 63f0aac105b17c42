//! Transformation module.
//!
//! This module turns loaded rows into output records:
//! - Normalize: per-kind value normalizers
//! - Fields: column classification
//! - Processor: the per-row state machine and blank-row halt
//! - Projection: person and ticket shapes
//! - Pipeline: the end-to-end conversion

pub mod diagnostics;
pub mod fields;
pub mod normalize;
pub mod pipeline;
pub mod processor;
pub mod projection;

pub use diagnostics::{Diagnostics, Enrichment, FieldChange, SkippedRow, ValidationIssue};
pub use fields::{FieldKind, FieldTable};
pub use processor::{find_halt, ProcessOutput, ProcessedRow, RowProcessor, RowState, StopFlag};
pub use projection::{cancellation_reason, project_person, project_ticket, CANCELLATION_REASONS};
pub use pipeline::{convert, ConversionOutput, ConvertOptions, Converter, TableInfo};
