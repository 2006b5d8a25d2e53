//! Shared helpers for integration tests
#![allow(dead_code)]

use rust_xlsxwriter::Workbook;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use school_health::{
    config::{DatabaseConfig, ImportConfig},
    database::Database,
};

pub const HEADER: [&str; 10] = [
    "Nome Completo",
    "Data de Nascimento",
    "Sexo",
    "CPF",
    "NIS",
    "Escola",
    "INEP",
    "Turma",
    "Período",
    "Ano Letivo",
];

/// A valid row for student `name` in class 5º Ano A of EMEF Centro
pub fn student_row(name: &str, cpf: &str) -> Vec<String> {
    vec![
        name.to_string(),
        "10/03/2015".to_string(),
        "F".to_string(),
        cpf.to_string(),
        String::new(),
        "EMEF Centro".to_string(),
        "35000123".to_string(),
        "5º Ano A".to_string(),
        "Manhã".to_string(),
        "2025".to_string(),
    ]
}

/// Build an .xlsx whose first sheet holds [`HEADER`] and then `rows`
pub fn workbook(rows: &[Vec<String>]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (c, value) in HEADER.iter().enumerate() {
        sheet.write_string(0, c as u16, *value).unwrap();
    }
    for (r, row) in rows.iter().enumerate() {
        for (c, value) in row.iter().enumerate() {
            if !value.is_empty() {
                sheet.write_string(r as u32 + 1, c as u16, value).unwrap();
            }
        }
    }
    workbook.save_to_buffer().unwrap()
}

/// Import settings without the pause between batches
pub fn fast_import_config() -> ImportConfig {
    ImportConfig {
        batch_delay: std::time::Duration::ZERO,
        ..ImportConfig::default()
    }
}

pub async fn test_database() -> Database {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        ..DatabaseConfig::default()
    };
    let database = Database::new(&config)
        .await
        .expect("Failed to create test database");
    database.migrate().await.expect("Failed to run migrations");
    database
}

pub async fn test_connection() -> Arc<DatabaseConnection> {
    test_database().await.connection()
}
