//! HTTP request handlers organized by domain

pub mod health;
pub mod imports;
pub mod schools;
pub mod students;
