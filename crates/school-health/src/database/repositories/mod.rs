//! SeaORM repository implementations
//!
//! The find-or-create functions are generic over [`sea_orm::ConnectionTrait`], so
//! callers pass either the pooled connection or an open transaction. The
//! `*SeaOrmRepository` types bind the pooled connection for read-side lookups.

pub mod enrollment;
pub mod school;
pub mod school_class;
pub mod student;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export for convenience
pub use enrollment::{EnrollmentInput, create_enrollment};
pub use school::{SchoolInput, SchoolSeaOrmRepository, find_or_create_school};
pub use school_class::{ClassInput, find_or_create_class};
pub use student::{StudentInput, StudentSeaOrmRepository, find_or_create_student};

use sea_orm::{DbErr, SqlErr};

/// True when the error is a unique-constraint violation on any backend
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}
