pub mod progress_service;

pub use progress_service::{ImportProgress, ImportStage, ProgressReporter, ProgressService};
