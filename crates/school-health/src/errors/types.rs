//! Error type definitions for the school health service
//!
//! Row-level problems never surface here: they are collected into the import
//! report. These types cover failures that stop an operation outright.

use thiserror::Error;

/// Top-level application error type
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors (SeaORM)
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// Repository layer errors
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Spreadsheet import errors
    #[error("Import error: {0}")]
    Import(#[from] ImportError),

    /// Validation errors
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Resource not found errors
    #[error("Not found: {resource} with id {id}")]
    NotFound { resource: String, id: String },

    /// Request carried no usable identity
    #[error("Unauthorized")]
    Unauthorized,

    /// Permission denied errors
    #[error("Permission denied: {action} on {resource}")]
    PermissionDenied { action: String, resource: String },

    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Generic internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Repository layer specific errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database errors from SeaORM
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// An identity field needed to find or create a record is blank
    #[error("Incomplete {entity} data: {field} is required")]
    MissingField { entity: String, field: String },

    /// Every generated school code collided with an existing one
    #[error("Could not allocate a school code after {attempts} attempts")]
    CodeGenerationExhausted { attempts: u32 },

    /// The highest stored school code leaves no room for another one
    #[error("No school code available above {max_code}")]
    CodeSpaceExhausted { max_code: i64 },
}

/// File-level import failures; each one aborts the run before any write
#[derive(Error, Debug)]
pub enum ImportError {
    /// The pre-flight validation gate refused the file
    #[error("File rejected: {}", errors.join("; "))]
    Rejected { errors: Vec<String> },

    /// The workbook could not be opened or read
    #[error("Failed to process Excel file: {message}")]
    Workbook { message: String },

    #[error("Excel file contains no worksheets")]
    NoSheets,

    #[error("Worksheet is empty")]
    EmptySheet,

    #[error(
        "Too many validation errors ({failed_rows} of {total_rows} records). Check the file format."
    )]
    TooManyErrors { failed_rows: usize, total_rows: usize },

    #[error("No valid records found to import")]
    NoValidRows,

    /// Database failure outside any single batch
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

impl AppError {
    /// Create a validation error with a custom message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Create a not found error
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create a permission denied error
    pub fn permission_denied<A: Into<String>, R: Into<String>>(action: A, resource: R) -> Self {
        Self::PermissionDenied {
            action: action.into(),
            resource: resource.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl RepositoryError {
    pub fn missing_field<E: Into<String>, F: Into<String>>(entity: E, field: F) -> Self {
        Self::MissingField {
            entity: entity.into(),
            field: field.into(),
        }
    }
}

impl ImportError {
    pub fn workbook<S: Into<String>>(message: S) -> Self {
        Self::Workbook {
            message: message.into(),
        }
    }

    /// True for failures caused by the uploaded file rather than the server
    pub fn is_client_error(&self) -> bool {
        !matches!(self, Self::Database(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_too_many_errors_message_carries_counts() {
        let err = ImportError::TooManyErrors {
            failed_rows: 6,
            total_rows: 10,
        };
        assert_eq!(
            err.to_string(),
            "Too many validation errors (6 of 10 records). Check the file format."
        );
        assert!(err.is_client_error());
    }

    #[test]
    fn test_rejected_joins_gate_errors() {
        let err = ImportError::Rejected {
            errors: vec!["first".to_string(), "second".to_string()],
        };
        assert_eq!(err.to_string(), "File rejected: first; second");
    }

    #[test]
    fn test_database_import_error_is_server_side() {
        let err = ImportError::Database(sea_orm::DbErr::Custom("boom".to_string()));
        assert!(!err.is_client_error());
    }

    #[test]
    fn test_missing_field_message() {
        let err = RepositoryError::missing_field("class", "period");
        assert_eq!(err.to_string(), "Incomplete class data: period is required");
    }
}
