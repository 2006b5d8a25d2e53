//! Student identity resolution and lookups

use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::entities::{prelude::Students, students};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{Cpf, Resolved, Sex, Student};

/// Identity fields of a student as read from an import row
#[derive(Debug, Clone, Copy)]
pub struct StudentInput<'a> {
    pub full_name: &'a str,
    pub birth_date: NaiveDate,
    pub sex: Option<Sex>,
    pub cpf: Option<&'a Cpf>,
    pub nis: Option<&'a str>,
}

/// Resolve a student by CPF, then NIS, then exact name and birth date,
/// inserting a new student when nothing matches.
pub async fn find_or_create_student<C>(conn: &C, input: &StudentInput<'_>) -> RepositoryResult<Resolved>
where
    C: ConnectionTrait,
{
    let full_name = input.full_name.trim();
    if full_name.is_empty() {
        return Err(RepositoryError::missing_field("student", "full_name"));
    }

    if let Some(cpf) = input.cpf {
        if let Some(existing) = Students::find()
            .filter(students::Column::Cpf.eq(cpf.as_str()))
            .one(conn)
            .await?
        {
            debug!(student_id = %existing.id, "Student matched by CPF");
            return Ok(Resolved::existing(existing.id));
        }
    }

    let nis = input.nis.map(str::trim).filter(|n| !n.is_empty());
    if let Some(nis) = nis {
        if let Some(existing) = Students::find()
            .filter(students::Column::Nis.eq(nis))
            .one(conn)
            .await?
        {
            debug!(student_id = %existing.id, "Student matched by NIS");
            return Ok(Resolved::existing(existing.id));
        }
    }

    if let Some(existing) = Students::find()
        .filter(students::Column::FullName.eq(full_name))
        .filter(students::Column::BirthDate.eq(input.birth_date))
        .one(conn)
        .await?
    {
        debug!(student_id = %existing.id, "Student matched by name and birth date");
        return Ok(Resolved::existing(existing.id));
    }

    let now = chrono::Utc::now();
    let id = Uuid::new_v4();
    students::ActiveModel {
        id: Set(id),
        full_name: Set(full_name.to_string()),
        birth_date: Set(input.birth_date),
        sex: Set(input.sex.map(|s| s.as_label().to_string())),
        cpf: Set(input.cpf.map(|c| c.as_str().to_string())),
        nis: Set(nis.map(str::to_string)),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await?;

    debug!(student_id = %id, "Created student");
    Ok(Resolved::created(id))
}

/// SeaORM-based repository for student lookups
#[derive(Clone)]
pub struct StudentSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl StudentSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<Student>> {
        let model = Students::find_by_id(*id).one(&*self.connection).await?;
        Ok(model.map(Student::from))
    }

    /// Find-or-create on the pooled connection, outside any transaction
    pub async fn find_or_create(&self, input: &StudentInput<'_>) -> RepositoryResult<Resolved> {
        find_or_create_student(&*self.connection, input).await
    }
}
