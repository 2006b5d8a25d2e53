//! Class resolution, keyed on school, name, period and school year

use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, Set};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{prelude::SchoolClasses, school_classes};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{Period, Resolved};

#[derive(Debug, Clone, Copy)]
pub struct ClassInput<'a> {
    pub school_id: Uuid,
    pub name: &'a str,
    pub period: Period,
    pub school_year: i32,
}

/// Find the class for `(school, name, period, year)` or create it.
///
/// `Period` is already canonical, so synonymous sheet spellings such as "M"
/// and "Manhã" land on the same class.
pub async fn find_or_create_class<C>(conn: &C, input: &ClassInput<'_>) -> RepositoryResult<Resolved>
where
    C: ConnectionTrait,
{
    let name = input.name.trim();
    if name.is_empty() {
        return Err(RepositoryError::missing_field("class", "name"));
    }
    let period = input.period.as_label();

    if let Some(existing) = SchoolClasses::find()
        .filter(school_classes::Column::SchoolId.eq(input.school_id))
        .filter(school_classes::Column::Name.eq(name))
        .filter(school_classes::Column::Period.eq(period))
        .filter(school_classes::Column::SchoolYear.eq(input.school_year))
        .one(conn)
        .await?
    {
        return Ok(Resolved::existing(existing.id));
    }

    let id = Uuid::new_v4();
    school_classes::ActiveModel {
        id: Set(id),
        school_id: Set(input.school_id),
        name: Set(name.to_string()),
        period: Set(period.to_string()),
        school_year: Set(input.school_year),
        created_at: Set(chrono::Utc::now()),
    }
    .insert(conn)
    .await?;

    debug!(class_id = %id, school_id = %input.school_id, "Created class");
    Ok(Resolved::created(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repositories::school::{SchoolCodePolicy, SchoolInput, find_or_create_school};
    use crate::database::repositories::test_support::create_test_db;

    async fn school(connection: &sea_orm::DatabaseConnection) -> Uuid {
        find_or_create_school(
            connection,
            &SchoolInput { name: "EMEF Jardim", code: None },
            SchoolCodePolicy::default(),
        )
        .await
        .unwrap()
        .id
    }

    #[tokio::test]
    async fn test_same_identity_resolves_to_same_class() {
        let connection = create_test_db().await;
        let school_id = school(&connection).await;

        let input = ClassInput {
            school_id,
            name: "5º Ano A",
            period: "m".parse().unwrap(),
            school_year: 2025,
        };
        let first = find_or_create_class(&*connection, &input).await.unwrap();

        let again = ClassInput {
            name: " 5º Ano A ",
            period: "Manhã".parse().unwrap(),
            ..input
        };
        let second = find_or_create_class(&*connection, &again).await.unwrap();

        assert!(first.is_new);
        assert!(!second.is_new);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn test_period_and_year_split_classes() {
        let connection = create_test_db().await;
        let school_id = school(&connection).await;

        let morning = ClassInput {
            school_id,
            name: "3º Ano B",
            period: Period::Morning,
            school_year: 2025,
        };
        let afternoon = ClassInput { period: Period::Afternoon, ..morning };
        let next_year = ClassInput { school_year: 2026, ..morning };

        let a = find_or_create_class(&*connection, &morning).await.unwrap();
        let b = find_or_create_class(&*connection, &afternoon).await.unwrap();
        let c = find_or_create_class(&*connection, &next_year).await.unwrap();

        assert!(a.is_new && b.is_new && c.is_new);
        assert_ne!(a.id, b.id);
        assert_ne!(a.id, c.id);
    }

    #[tokio::test]
    async fn test_blank_class_name_is_a_hard_error() {
        let connection = create_test_db().await;
        let school_id = school(&connection).await;
        let result = find_or_create_class(
            &*connection,
            &ClassInput {
                school_id,
                name: " ",
                period: Period::Evening,
                school_year: 2025,
            },
        )
        .await;
        assert!(matches!(result, Err(RepositoryError::MissingField { .. })));
    }
}
