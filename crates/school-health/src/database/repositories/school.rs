//! School resolution, code allocation and lookups

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

use super::is_unique_violation;
use crate::entities::{prelude::Schools, schools};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{Resolved, School};

#[derive(Debug, Clone, Copy)]
pub struct SchoolInput<'a> {
    pub name: &'a str,
    /// INEP code from the sheet, if any
    pub code: Option<i64>,
}

/// Allocation settings for schools created without a code
#[derive(Debug, Clone, Copy)]
pub struct SchoolCodePolicy {
    /// Codes start right after this value on an empty table
    pub floor: i64,
    pub max_attempts: u32,
}

impl Default for SchoolCodePolicy {
    fn default() -> Self {
        Self {
            floor: crate::config::defaults::DEFAULT_SCHOOL_CODE_FLOOR,
            max_attempts: crate::config::defaults::DEFAULT_SCHOOL_CODE_MAX_ATTEMPTS,
        }
    }
}

/// Resolve a school by code, then by exact name, creating it otherwise.
///
/// Inserts run inside a nested transaction (a savepoint when `conn` is already
/// a transaction). A unique violation on the code means another writer got
/// there first, so the lookup is repeated with a freshly allocated code.
pub async fn find_or_create_school<C>(
    conn: &C,
    input: &SchoolInput<'_>,
    policy: SchoolCodePolicy,
) -> RepositoryResult<Resolved>
where
    C: ConnectionTrait + TransactionTrait,
{
    let name = input.name.trim();
    if name.is_empty() {
        return Err(RepositoryError::missing_field("school", "name"));
    }

    for attempt in 1..=policy.max_attempts {
        if let Some(code) = input.code {
            if let Some(existing) = find_model_by_code(conn, code).await? {
                return Ok(Resolved::existing(existing.id));
            }
        }

        if let Some(existing) = Schools::find()
            .filter(schools::Column::Name.eq(name))
            .one(conn)
            .await?
        {
            return Ok(Resolved::existing(existing.id));
        }

        let code = match input.code {
            Some(code) => code,
            None => next_school_code(conn, policy.floor).await?,
        };

        let id = Uuid::new_v4();
        let txn = conn.begin().await?;
        let inserted = schools::ActiveModel {
            id: Set(id),
            code: Set(code),
            name: Set(name.to_string()),
            created_at: Set(chrono::Utc::now()),
        }
        .insert(&txn)
        .await;

        match inserted {
            Ok(_) => {
                txn.commit().await?;
                debug!(school_id = %id, code, "Created school");
                return Ok(Resolved::created(id));
            }
            Err(e) if is_unique_violation(&e) => {
                txn.rollback().await?;
                warn!(code, attempt, "School code already taken, retrying");
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(RepositoryError::CodeGenerationExhausted {
        attempts: policy.max_attempts,
    })
}

/// Next free school code: one past the current maximum, or past `floor` on an empty table
pub async fn next_school_code<C>(conn: &C, floor: i64) -> RepositoryResult<i64>
where
    C: ConnectionTrait,
{
    let max_code: Option<i64> = Schools::find()
        .select_only()
        .column_as(schools::Column::Code.max(), "max_code")
        .into_tuple::<Option<i64>>()
        .one(conn)
        .await?
        .flatten();

    let base = max_code.unwrap_or(floor);
    base.checked_add(1)
        .ok_or(RepositoryError::CodeSpaceExhausted { max_code: base })
}

async fn find_model_by_code<C>(conn: &C, code: i64) -> RepositoryResult<Option<schools::Model>>
where
    C: ConnectionTrait,
{
    Ok(Schools::find()
        .filter(schools::Column::Code.eq(code))
        .one(conn)
        .await?)
}

/// SeaORM-based repository for school lookups
#[derive(Clone)]
pub struct SchoolSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl SchoolSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn find_by_code(&self, code: i64) -> RepositoryResult<Option<School>> {
        Ok(find_model_by_code(&*self.connection, code)
            .await?
            .map(School::from))
    }

    /// All schools ordered by name
    pub async fn find_all(&self) -> RepositoryResult<Vec<School>> {
        let models = Schools::find()
            .order_by_asc(schools::Column::Name)
            .all(&*self.connection)
            .await?;
        Ok(models.into_iter().map(School::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::repositories::test_support::create_test_db;

    #[tokio::test]
    async fn test_first_generated_code_follows_floor() {
        let connection = create_test_db().await;
        let policy = SchoolCodePolicy::default();

        let created = find_or_create_school(
            &*connection,
            &SchoolInput { name: "EMEF Centro", code: None },
            policy,
        )
        .await
        .unwrap();
        assert!(created.is_new);

        let repo = SchoolSeaOrmRepository::new(connection.clone());
        let school = repo.find_by_code(35_000_001).await.unwrap().unwrap();
        assert_eq!(school.id, created.id);
        assert_eq!(school.name, "EMEF Centro");
    }

    #[tokio::test]
    async fn test_generated_code_is_max_plus_one() {
        let connection = create_test_db().await;
        let policy = SchoolCodePolicy::default();

        find_or_create_school(
            &*connection,
            &SchoolInput { name: "Escola A", code: Some(35_123_456) },
            policy,
        )
        .await
        .unwrap();
        assert_eq!(next_school_code(&*connection, policy.floor).await.unwrap(), 35_123_457);
    }

    #[tokio::test]
    async fn test_generated_code_past_i64_max_is_an_error() {
        let connection = create_test_db().await;
        let policy = SchoolCodePolicy::default();

        find_or_create_school(
            &*connection,
            &SchoolInput { name: "Escola A", code: Some(i64::MAX) },
            policy,
        )
        .await
        .unwrap();

        let result = find_or_create_school(
            &*connection,
            &SchoolInput { name: "Escola B", code: None },
            policy,
        )
        .await;
        assert!(matches!(
            result,
            Err(RepositoryError::CodeSpaceExhausted { max_code: i64::MAX })
        ));
    }

    #[tokio::test]
    async fn test_code_match_wins_over_name() {
        let connection = create_test_db().await;
        let policy = SchoolCodePolicy::default();

        let created = find_or_create_school(
            &*connection,
            &SchoolInput { name: "Escola Estadual Norte", code: Some(35_000_100) },
            policy,
        )
        .await
        .unwrap();
        let matched = find_or_create_school(
            &*connection,
            &SchoolInput { name: "EE Norte", code: Some(35_000_100) },
            policy,
        )
        .await
        .unwrap();

        assert_eq!(created.id, matched.id);
        assert!(!matched.is_new);
    }

    #[tokio::test]
    async fn test_name_match_without_code() {
        let connection = create_test_db().await;
        let policy = SchoolCodePolicy::default();

        let created = find_or_create_school(
            &*connection,
            &SchoolInput { name: "Escola Sul", code: None },
            policy,
        )
        .await
        .unwrap();
        let matched = find_or_create_school(
            &*connection,
            &SchoolInput { name: " Escola Sul ", code: None },
            policy,
        )
        .await
        .unwrap();

        assert_eq!(created.id, matched.id);
        assert!(!matched.is_new);
    }

    #[tokio::test]
    async fn test_find_all_orders_by_name() {
        let connection = create_test_db().await;
        let policy = SchoolCodePolicy::default();
        for name in ["Zeta", "Alfa", "Mu"] {
            find_or_create_school(&*connection, &SchoolInput { name, code: None }, policy)
                .await
                .unwrap();
        }

        let names: Vec<String> = SchoolSeaOrmRepository::new(connection)
            .find_all()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.name)
            .collect();
        assert_eq!(names, vec!["Alfa", "Mu", "Zeta"]);
    }

    #[tokio::test]
    async fn test_blank_school_name_is_a_hard_error() {
        let connection = create_test_db().await;
        let result = find_or_create_school(
            &*connection,
            &SchoolInput { name: "", code: Some(1) },
            SchoolCodePolicy::default(),
        )
        .await;
        assert!(matches!(result, Err(RepositoryError::MissingField { .. })));
    }
}
