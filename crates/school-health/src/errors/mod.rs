//! Centralized error handling for the school health service
//!
//! Errors are layered so each tier reports failures in its own terms and the
//! web layer maps them to HTTP responses in one place.
//!
//! # Error Categories
//!
//! - **Database Errors**: SeaORM connection, query and migration failures
//! - **Repository Errors**: find-or-create failures for students, schools, classes and enrollments
//! - **Import Errors**: file-level aborts of a spreadsheet import run
//! - **Validation Errors**: input validation and business rule violations
//! - **Access Errors**: missing identity or missing manager role
//!
//! # Usage
//!
//! ```rust
//! use school_health::errors::{AppError, AppResult};
//!
//! async fn example_function() -> AppResult<String> {
//!     // Function can return any error type that converts to AppError
//!     Ok("success".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

/// Convenience type alias for Results using AppError
pub type AppResult<T> = Result<T, AppError>;

/// Convenience type alias for Repository Results
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Convenience type alias for Import Results
pub type ImportResult<T> = Result<T, ImportError>;
