//! Row parser: header mapping and per-field validation
//!
//! Every row is validated once here. Rows that pass become [`ParsedRow`]s with
//! typed fields; downstream code never looks at raw cell text again.

use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;
use utoipa::ToSchema;

use super::normalize::{normalize_header, normalize_period, normalize_sex, parse_date, validate_cpf};
use super::sheet::read_first_sheet;
use super::stats::ImportRowError;
use crate::errors::ImportResult;
use crate::models::{Cpf, Period, Sex};

/// Logical import columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    FullName,
    BirthDate,
    Sex,
    Cpf,
    Nis,
    SchoolName,
    SchoolCode,
    ClassName,
    Period,
    SchoolYear,
}

impl Field {
    pub const ALL: [Field; 10] = [
        Field::FullName,
        Field::BirthDate,
        Field::Sex,
        Field::Cpf,
        Field::Nis,
        Field::SchoolName,
        Field::SchoolCode,
        Field::ClassName,
        Field::Period,
        Field::SchoolYear,
    ];

    /// Name reported in validation errors
    pub fn key(&self) -> &'static str {
        match self {
            Field::FullName => "nome_completo",
            Field::BirthDate => "data_nascimento",
            Field::Sex => "sexo",
            Field::Cpf => "cpf",
            Field::Nis => "nis",
            Field::SchoolName => "escola",
            Field::SchoolCode => "inep",
            Field::ClassName => "turma",
            Field::Period => "periodo",
            Field::SchoolYear => "ano_letivo",
        }
    }

    /// Normalized header names accepted for this field, most specific first
    pub fn aliases(&self) -> &'static [&'static str] {
        match self {
            Field::FullName => &["nome_completo", "nome", "aluno", "nome_aluno"],
            Field::BirthDate => &["data_nascimento", "data_de_nascimento", "nascimento"],
            Field::Sex => &["sexo"],
            Field::Cpf => &["cpf"],
            Field::Nis => &["nis"],
            Field::SchoolName => &["escola", "nome_escola"],
            Field::SchoolCode => &["inep", "codigo_inep"],
            Field::ClassName => &["turma"],
            Field::Period => &["periodo", "turno"],
            Field::SchoolYear => &["ano_letivo", "ano"],
        }
    }
}

/// One row that passed validation
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ParsedRow {
    /// Sheet row number; the header is row 1
    pub row_number: usize,
    pub full_name: String,
    pub birth_date: NaiveDate,
    pub sex: Option<Sex>,
    pub cpf: Option<Cpf>,
    pub nis: Option<String>,
    pub school_name: String,
    pub school_code: Option<i64>,
    pub class_name: String,
    pub period: Period,
    pub school_year: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ValidationError {
    pub row: usize,
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, ToSchema)]
pub struct ParseResult {
    pub data: Vec<ParsedRow>,
    pub errors: Vec<ValidationError>,
    /// Data rows in the sheet, blank ones included
    pub total_rows: usize,
    pub valid_rows: usize,
}

impl ParseResult {
    /// Number of distinct rows with at least one error
    pub fn failed_rows(&self) -> usize {
        let mut rows: Vec<usize> = self.errors.iter().map(|e| e.row).collect();
        rows.dedup();
        rows.len()
    }

    /// Errors folded to one entry per row as `field: message` pairs in field order
    pub fn errors_by_row(&self) -> Vec<ImportRowError> {
        let mut by_row: BTreeMap<usize, Vec<String>> = BTreeMap::new();
        for error in &self.errors {
            by_row
                .entry(error.row)
                .or_default()
                .push(format!("{}: {}", error.field, error.message));
        }
        by_row
            .into_iter()
            .map(|(row, messages)| ImportRowError {
                row,
                message: messages.join("; "),
            })
            .collect()
    }
}

/// Column indexes per field, in alias preference order
#[derive(Debug, Default)]
struct HeaderMap {
    columns: BTreeMap<Field, Vec<usize>>,
}

impl HeaderMap {
    fn from_header(header: &[String]) -> Self {
        let normalized: Vec<String> = header.iter().map(|h| normalize_header(h)).collect();
        let mut columns = BTreeMap::new();
        for field in Field::ALL {
            let indexes: Vec<usize> = field
                .aliases()
                .iter()
                .flat_map(|alias| {
                    normalized
                        .iter()
                        .enumerate()
                        .filter(move |(_, h)| h.as_str() == *alias)
                        .map(|(i, _)| i)
                })
                .collect();
            columns.insert(field, indexes);
        }
        Self { columns }
    }

    /// First non-blank value for `field`, trimmed
    fn value<'r>(&self, row: &'r [String], field: Field) -> Option<&'r str> {
        self.columns.get(&field)?.iter().find_map(|&i| {
            row.get(i)
                .map(|cell| cell.trim())
                .filter(|cell| !cell.is_empty())
        })
    }
}

/// Validates sheet rows against the enrollment layout
#[derive(Debug, Clone, Copy)]
pub struct RowParser {
    pub min_year: i32,
    pub max_year: i32,
}

impl Default for RowParser {
    fn default() -> Self {
        Self::new(crate::config::defaults::DEFAULT_MIN_SCHOOL_YEAR)
    }
}

impl RowParser {
    /// Accept school years from `min_year` up to next calendar year
    pub fn new(min_year: i32) -> Self {
        Self {
            min_year,
            max_year: chrono::Utc::now().year() + 1,
        }
    }

    /// Read the first worksheet of `buffer` and validate its rows
    pub fn parse_buffer(&self, buffer: &[u8]) -> ImportResult<ParseResult> {
        let sheet = read_first_sheet(buffer)?;
        Ok(self.parse_rows(&sheet.rows))
    }

    /// Validate rows whose first entry is the header
    pub fn parse_rows(&self, rows: &[Vec<String>]) -> ParseResult {
        let Some((header, body)) = rows.split_first() else {
            return ParseResult::default();
        };
        let headers = HeaderMap::from_header(header);

        let mut result = ParseResult {
            total_rows: body.len(),
            ..ParseResult::default()
        };

        for (index, row) in body.iter().enumerate() {
            let row_number = index + 2;

            if row.iter().all(|cell| cell.is_empty()) {
                continue;
            }

            match self.parse_row(&headers, row, row_number) {
                Ok(parsed) => result.data.push(parsed),
                Err(errors) => result.errors.extend(errors),
            }
        }

        result.valid_rows = result.data.len();
        debug!(
            total_rows = result.total_rows,
            valid_rows = result.valid_rows,
            errors = result.errors.len(),
            "Parsed enrollment rows"
        );
        result
    }

    fn parse_row(
        &self,
        headers: &HeaderMap,
        row: &[String],
        row_number: usize,
    ) -> Result<ParsedRow, Vec<ValidationError>> {
        let mut errors = Vec::new();
        let mut fail = |field: Field, message: String| {
            errors.push(ValidationError {
                row: row_number,
                field: field.key().to_string(),
                message,
            });
        };
        let value = |field: Field| headers.value(row, field);

        let full_name = value(Field::FullName);
        if full_name.is_none() {
            fail(Field::FullName, "Full name is required".to_string());
        }

        let birth_date = match value(Field::BirthDate) {
            None => {
                fail(Field::BirthDate, "Birth date is required".to_string());
                None
            }
            Some(raw) => {
                let parsed = parse_date(raw);
                if parsed.is_none() {
                    fail(
                        Field::BirthDate,
                        "Invalid birth date. Use the DD/MM/YYYY format".to_string(),
                    );
                }
                parsed
            }
        };

        let school_name = value(Field::SchoolName);
        if school_name.is_none() {
            fail(Field::SchoolName, "School name is required".to_string());
        }

        let class_name = value(Field::ClassName);
        if class_name.is_none() {
            fail(Field::ClassName, "Class name is required".to_string());
        }

        let period = match value(Field::Period) {
            None => {
                fail(Field::Period, "Period is required".to_string());
                None
            }
            Some(raw) => {
                let parsed = normalize_period(raw);
                if parsed.is_none() {
                    fail(
                        Field::Period,
                        "Invalid period. Use: Manhã, Tarde, Integral or Noite".to_string(),
                    );
                }
                parsed
            }
        };

        let school_year = match value(Field::SchoolYear) {
            None => {
                fail(Field::SchoolYear, "School year is required".to_string());
                None
            }
            Some(raw) => {
                let parsed = raw
                    .parse::<i32>()
                    .ok()
                    .filter(|year| (self.min_year..=self.max_year).contains(year));
                if parsed.is_none() {
                    fail(
                        Field::SchoolYear,
                        format!(
                            "Invalid school year. Use a year between {} and {}",
                            self.min_year, self.max_year
                        ),
                    );
                }
                parsed
            }
        };

        let sex = value(Field::Sex).and_then(|raw| {
            let parsed = normalize_sex(raw);
            if parsed.is_none() {
                fail(
                    Field::Sex,
                    "Invalid sex. Use: M, F, Masculino or Feminino".to_string(),
                );
            }
            parsed
        });

        let cpf = value(Field::Cpf).and_then(|raw| {
            let parsed = validate_cpf(raw);
            if parsed.is_none() {
                fail(Field::Cpf, "Invalid CPF".to_string());
            }
            parsed
        });

        let school_code = value(Field::SchoolCode).and_then(|raw| {
            let parsed = raw.parse::<i64>().ok().filter(|code| *code > 0);
            if parsed.is_none() {
                fail(
                    Field::SchoolCode,
                    "Invalid INEP code. Use digits only".to_string(),
                );
            }
            parsed
        });

        let nis = value(Field::Nis).map(str::to_string);

        match (full_name, birth_date, school_name, class_name, period, school_year) {
            (Some(full_name), Some(birth_date), Some(school_name), Some(class_name), Some(period), Some(school_year))
                if errors.is_empty() =>
            {
                Ok(ParsedRow {
                    row_number,
                    full_name: full_name.to_string(),
                    birth_date,
                    sex,
                    cpf,
                    nis,
                    school_name: school_name.to_string(),
                    school_code,
                    class_name: class_name.to_string(),
                    period,
                    school_year,
                })
            }
            _ => Err(errors),
        }
    }
}
