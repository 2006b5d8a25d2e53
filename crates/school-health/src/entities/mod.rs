//! SeaORM entity definitions for the enrollment tables

pub mod prelude;

pub mod enrollments;
pub mod school_classes;
pub mod schools;
pub mod students;
