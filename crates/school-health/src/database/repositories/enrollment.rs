//! Enrollment writer
//!
//! An enrollment is unique per student, class and school year. An existing
//! enrollment is returned untouched.

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{enrollments, prelude::Enrollments};
use crate::errors::RepositoryResult;
use crate::models::Resolved;

/// Status given to enrollments created by an import
pub const ACTIVE_STATUS: &str = "ativa";

#[derive(Debug, Clone, Copy)]
pub struct EnrollmentInput {
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub school_year: i32,
}

pub async fn create_enrollment<C>(conn: &C, input: &EnrollmentInput) -> RepositoryResult<Resolved>
where
    C: ConnectionTrait,
{
    if let Some(existing) = Enrollments::find()
        .filter(enrollments::Column::StudentId.eq(input.student_id))
        .filter(enrollments::Column::ClassId.eq(input.class_id))
        .filter(enrollments::Column::SchoolYear.eq(input.school_year))
        .one(conn)
        .await?
    {
        return Ok(Resolved::existing(existing.id));
    }

    let now = chrono::Utc::now();
    let id = Uuid::new_v4();
    enrollments::ActiveModel {
        id: Set(id),
        student_id: Set(input.student_id),
        class_id: Set(input.class_id),
        school_year: Set(input.school_year),
        status: Set(ACTIVE_STATUS.to_string()),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    debug!(enrollment_id = %id, student_id = %input.student_id, "Created enrollment");
    Ok(Resolved::created(id))
}
