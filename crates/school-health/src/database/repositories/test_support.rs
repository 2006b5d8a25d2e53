use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::config::DatabaseConfig;
use crate::database::Database;

/// Fresh, migrated in-memory SQLite database
pub(crate) async fn create_test_db() -> Arc<DatabaseConnection> {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        ..DatabaseConfig::default()
    };
    let database = Database::new(&config).await.unwrap();
    database.migrate().await.unwrap();
    database.connection()
}
