//! Domain models shared by the import pipeline and the HTTP API

pub mod school;
pub mod student;

pub use school::{Period, School, SchoolClass};
pub use student::{Cpf, Sex, Student};

use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

/// Outcome of a find-or-create call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Resolved {
    pub id: Uuid,
    /// True only when this call inserted the record
    pub is_new: bool,
}

impl Resolved {
    pub fn existing(id: Uuid) -> Self {
        Self { id, is_new: false }
    }

    pub fn created(id: Uuid) -> Self {
        Self { id, is_new: true }
    }
}
