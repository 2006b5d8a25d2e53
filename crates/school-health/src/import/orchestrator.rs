//! Batch orchestrator for enrollment imports
//!
//! A run parses the workbook, aborts before writing anything when the sheet is
//! mostly invalid, then writes valid rows in fixed-size batches. Each batch is
//! one database transaction and each row a savepoint inside it: a failing row
//! rolls back alone, while a failure to open or commit the batch fails every
//! row of that batch.

use bytes::Bytes;
use sea_orm::{ConnectionTrait, DatabaseConnection, DbErr, TransactionTrait};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::row_parser::{ParseResult, ParsedRow, RowParser};
use super::stats::{BatchStats, ImportRowError, ImportStats};
use super::validation_gate::{self, FileValidation};
use crate::config::ImportConfig;
use crate::database::repositories::school::SchoolCodePolicy;
use crate::database::repositories::{
    ClassInput, EnrollmentInput, SchoolInput, StudentInput, create_enrollment,
    find_or_create_class, find_or_create_school, find_or_create_student,
};
use crate::errors::{ImportError, ImportResult, RepositoryResult};
use crate::services::progress_service::{ImportStage, ProgressReporter, percent_of};

/// What a successfully written row created
#[derive(Debug, Clone, Copy, Default)]
struct RowOutcome {
    new_student: bool,
    new_school: bool,
    new_class: bool,
    new_enrollment: bool,
}

impl BatchStats {
    fn record(&mut self, outcome: RowOutcome) {
        if outcome.new_student {
            self.new_students += 1;
        } else {
            self.updated_students += 1;
        }
        if outcome.new_school {
            self.new_schools += 1;
        }
        if outcome.new_class {
            self.new_classes += 1;
        }
        if outcome.new_enrollment {
            self.new_enrollments += 1;
        } else {
            self.existing_enrollments += 1;
        }
    }
}

/// Runs spreadsheet enrollment imports against one database
#[derive(Clone)]
pub struct EnrollmentImporter {
    connection: Arc<DatabaseConnection>,
    config: ImportConfig,
    parser: RowParser,
}

impl EnrollmentImporter {
    pub fn new(connection: Arc<DatabaseConnection>, config: ImportConfig) -> Self {
        let parser = RowParser::new(config.min_school_year);
        Self {
            connection,
            config,
            parser,
        }
    }

    pub fn config(&self) -> &ImportConfig {
        &self.config
    }

    /// Pre-flight gate: file checks plus a trial parse, no writes
    pub fn validate_file(&self, buffer: &[u8], file_name: &str) -> FileValidation {
        validation_gate::validate_file(buffer, file_name, &self.config, &self.parser)
    }

    /// [`Self::validate_file`] on the blocking pool
    pub async fn validate_file_blocking(
        &self,
        buffer: Bytes,
        file_name: String,
    ) -> Result<FileValidation, tokio::task::JoinError> {
        let importer = self.clone();
        tokio::task::spawn_blocking(move || importer.validate_file(&buffer, &file_name)).await
    }

    /// Run [`Self::process_import`] on its own task.
    ///
    /// The run is detached from the caller: dropping the handle (a client
    /// disconnecting mid-upload) does not stop it, and the outcome still
    /// reaches `progress`.
    pub fn spawn_import(
        &self,
        buffer: Bytes,
        file_name: String,
        progress: ProgressReporter,
    ) -> JoinHandle<ImportResult<ImportStats>> {
        let importer = self.clone();
        tokio::spawn(async move {
            importer
                .process_import(&buffer, &file_name, &progress)
                .await
        })
    }

    /// Import every valid row of `buffer`, reporting through `progress`.
    ///
    /// Returns an error only for file-level problems; row and batch failures
    /// end up in [`ImportStats::errors`].
    pub async fn process_import(
        &self,
        buffer: &[u8],
        file_name: &str,
        progress: &ProgressReporter,
    ) -> ImportResult<ImportStats> {
        match self.run(buffer, file_name, progress).await {
            Ok(stats) => Ok(stats),
            Err(e) => {
                warn!(file_name, error = %e, "Import aborted");
                progress.fail(e.to_string()).await;
                Err(e)
            }
        }
    }

    async fn run(
        &self,
        buffer: &[u8],
        file_name: &str,
        progress: &ProgressReporter,
    ) -> ImportResult<ImportStats> {
        let started = Instant::now();
        info!(
            file_name,
            size_bytes = buffer.len(),
            detected_type = validation_gate::detect_mime_type(buffer).as_deref().unwrap_or("unknown"),
            "Starting enrollment import"
        );

        progress
            .report(ImportStage::Validating, 0, "Validating file...", 0, 0)
            .await;
        let file_errors = validation_gate::check_file(buffer, file_name, &self.config);
        if !file_errors.is_empty() {
            return Err(ImportError::Rejected { errors: file_errors });
        }

        progress
            .report(ImportStage::Parsing, 0, "Analysing Excel file...", 0, 0)
            .await;
        let parsed = self.parse_blocking(buffer).await?;

        let failed_rows = parsed.failed_rows();
        if failed_rows as f64 > parsed.total_rows as f64 * self.config.abort_error_ratio {
            return Err(ImportError::TooManyErrors {
                failed_rows,
                total_rows: parsed.total_rows,
            });
        }
        if parsed.valid_rows == 0 {
            return Err(ImportError::NoValidRows);
        }

        let mut stats = ImportStats {
            total_records: parsed.total_rows,
            errors: parsed.errors_by_row(),
            ..ImportStats::default()
        };

        let total = parsed.valid_rows;
        progress
            .report(ImportStage::Processing, 0, "Starting record processing...", 0, total)
            .await;

        let batch_size = self.config.batch_size.max(1);
        let batch_count = total.div_ceil(batch_size);

        for (batch_index, batch) in parsed.data.chunks(batch_size).enumerate() {
            let offset = batch_index * batch_size;
            progress
                .report(
                    ImportStage::Processing,
                    percent_of(offset, total),
                    format!("Processing batch {} of {}...", batch_index + 1, batch_count),
                    offset,
                    total,
                )
                .await;

            match self.process_batch(batch, offset, total, progress).await {
                Ok(batch_stats) => {
                    debug!(
                        batch = batch_index + 1,
                        rows = batch.len(),
                        errors = batch_stats.errors.len(),
                        "Batch committed"
                    );
                    stats.absorb(batch_stats);
                }
                Err(e) => {
                    warn!(batch = batch_index + 1, error = %e, "Batch failed, marking all rows as failed");
                    stats.errors.extend(batch.iter().map(|row| ImportRowError {
                        row: row.row_number,
                        message: format!("Batch processing error: {e}"),
                    }));
                }
            }

            if batch_index + 1 < batch_count && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }

        stats.errors.sort_by_key(|e| e.row);
        stats.duration_ms = started.elapsed().as_millis() as u64;

        info!(
            file_name,
            total_records = stats.total_records,
            new_students = stats.new_students,
            updated_students = stats.updated_students,
            new_schools = stats.new_schools,
            new_classes = stats.new_classes,
            errors = stats.errors.len(),
            duration_ms = stats.duration_ms,
            "Enrollment import completed"
        );
        progress
            .report(
                ImportStage::Completed,
                100,
                format!("Import completed in {} seconds", started.elapsed().as_secs()),
                total,
                total,
            )
            .await;

        Ok(stats)
    }

    async fn parse_blocking(&self, buffer: &[u8]) -> ImportResult<ParseResult> {
        let parser = self.parser;
        let buffer = Bytes::copy_from_slice(buffer);
        tokio::task::spawn_blocking(move || parser.parse_buffer(&buffer))
            .await
            .map_err(|e| ImportError::Workbook {
                message: format!("workbook parsing task failed: {e}"),
            })?
    }

    /// One transaction per batch, one savepoint per row
    async fn process_batch(
        &self,
        batch: &[ParsedRow],
        offset: usize,
        total: usize,
        progress: &ProgressReporter,
    ) -> Result<BatchStats, DbErr> {
        let txn = self.connection.begin().await?;
        let mut stats = BatchStats::default();

        for (i, row) in batch.iter().enumerate() {
            let savepoint = txn.begin().await?;
            match self.process_row(&savepoint, row).await {
                Ok(outcome) => {
                    savepoint.commit().await?;
                    stats.record(outcome);
                }
                Err(e) => {
                    savepoint.rollback().await?;
                    debug!(row = row.row_number, error = %e, "Row failed");
                    stats.errors.push(ImportRowError {
                        row: row.row_number,
                        message: e.to_string(),
                    });
                }
            }

            let done = offset + i + 1;
            progress
                .report(
                    ImportStage::Processing,
                    percent_of(done, total),
                    format!("Processing record {done} of {total}..."),
                    done,
                    total,
                )
                .await;
        }

        txn.commit().await?;
        Ok(stats)
    }

    /// Student, school, class, then enrollment, all on `conn`
    async fn process_row<C>(&self, conn: &C, row: &ParsedRow) -> RepositoryResult<RowOutcome>
    where
        C: ConnectionTrait + TransactionTrait,
    {
        let student = find_or_create_student(
            conn,
            &StudentInput {
                full_name: &row.full_name,
                birth_date: row.birth_date,
                sex: row.sex,
                cpf: row.cpf.as_ref(),
                nis: row.nis.as_deref(),
            },
        )
        .await?;

        let school = find_or_create_school(
            conn,
            &SchoolInput {
                name: &row.school_name,
                code: row.school_code,
            },
            SchoolCodePolicy {
                floor: self.config.school_code_floor,
                max_attempts: self.config.school_code_max_attempts,
            },
        )
        .await?;

        let class = find_or_create_class(
            conn,
            &ClassInput {
                school_id: school.id,
                name: &row.class_name,
                period: row.period,
                school_year: row.school_year,
            },
        )
        .await?;

        let enrollment = create_enrollment(
            conn,
            &EnrollmentInput {
                student_id: student.id,
                class_id: class.id,
                school_year: row.school_year,
            },
        )
        .await?;

        Ok(RowOutcome {
            new_student: student.is_new,
            new_school: school.is_new,
            new_class: class.is_new,
            new_enrollment: enrollment.is_new,
        })
    }
}
