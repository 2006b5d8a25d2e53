//! Spreadsheet enrollment import
//!
//! parse → validate → find-or-create → write, in batches, with a report at the end.

pub mod normalize;
pub mod orchestrator;
pub mod row_parser;
pub mod sheet;
pub mod stats;
pub mod validation_gate;

pub use orchestrator::EnrollmentImporter;
pub use row_parser::{Field, ParseResult, ParsedRow, RowParser, ValidationError};
pub use stats::{ImportRowError, ImportStats};
pub use validation_gate::FileValidation;
