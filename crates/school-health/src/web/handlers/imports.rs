//! Enrollment spreadsheet import handlers
//!
//! Uploads arrive as multipart forms with the workbook in the `file` field.
//! The import runs on its own task and the request waits for its report; a
//! client that disconnects does not cancel the run. Clients that want live
//! updates listen on the progress event stream while the upload is in flight.

use axum::{
    extract::{Multipart, Query, State},
    http::HeaderValue,
    response::{
        Response,
        sse::{Event, KeepAlive, Sse},
    },
};
use bytes::Bytes;
use futures::Stream;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::errors::{AppError, ImportError};
use crate::import::{FileValidation, ImportStats};
use crate::services::ImportProgress;
use crate::web::{
    AppState,
    extractors::{AuthenticatedUser, ProgressEventQuery},
    responses::{ok, ok_with_message},
};

const UPLOAD_FIELD: &str = "file";
const IMPORT_ID_HEADER: &str = "x-import-id";
const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(15);

struct Upload {
    file_name: String,
    data: Bytes,
}

async fn read_upload(multipart: &mut Multipart) -> Result<Upload, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let data = field
            .bytes()
            .await
            .map_err(|e| AppError::validation(format!("Could not read the uploaded file: {e}")))?;
        return Ok(Upload { file_name, data });
    }
    Err(AppError::validation("No file uploaded"))
}

async fn validate_upload(state: &AppState, upload: &Upload) -> Result<FileValidation, AppError> {
    state
        .importer
        .validate_file_blocking(upload.data.clone(), upload.file_name.clone())
        .await
        .map_err(|e| AppError::internal(format!("File validation task failed: {e}")))
}

/// Dry-run the gate over an upload without writing anything
#[utoipa::path(
    post,
    path = "/api/v1/imports/enrollments/validate",
    tag = "imports",
    request_body(content = String, description = "Multipart form with the workbook in `file`", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Validation report", body = FileValidation),
        (status = 401, description = "Missing identity headers"),
        (status = 403, description = "Caller is not a manager")
    )
)]
pub async fn validate_enrollment_file(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    user.require_manager("validate", "enrollment import")?;
    let upload = read_upload(&mut multipart).await?;

    let validation = validate_upload(&state, &upload).await?;
    debug!(
        file_name = %upload.file_name,
        is_valid = validation.is_valid,
        total_rows = validation.total_rows,
        valid_rows = validation.valid_rows,
        "Validated enrollment file"
    );
    Ok(ok(validation))
}

/// Import students, schools, classes and enrollments from a workbook
#[utoipa::path(
    post,
    path = "/api/v1/imports/enrollments",
    tag = "imports",
    request_body(content = String, description = "Multipart form with the workbook in `file`", content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Import report", body = ImportStats),
        (status = 400, description = "File rejected or not importable"),
        (status = 401, description = "Missing identity headers"),
        (status = 403, description = "Caller is not a manager")
    )
)]
pub async fn import_enrollments(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    user.require_manager("import", "enrollments")?;
    let upload = read_upload(&mut multipart).await?;
    if upload.data.is_empty() {
        return Err(AppError::validation("The uploaded file is empty"));
    }

    let validation = validate_upload(&state, &upload).await?;
    if !validation.is_valid {
        warn!(
            file_name = %upload.file_name,
            errors = ?validation.errors,
            "Enrollment file rejected"
        );
        return Err(ImportError::Rejected {
            errors: validation.errors,
        }
        .into());
    }

    let reporter = state.progress_service.start_import(&upload.file_name);
    info!(
        file_name = %upload.file_name,
        professional_id = user.professional_id,
        import_id = ?reporter.import_id(),
        "Enrollment import requested"
    );

    let import_id = reporter.import_id();
    let stats = state
        .importer
        .spawn_import(upload.data, upload.file_name, reporter)
        .await
        .map_err(|e| {
            error!(error = %e, "Enrollment import task failed");
            AppError::internal(format!("Import task failed: {e}"))
        })??;

    let message = format!(
        "Import completed successfully! {} students processed.",
        stats.processed_students()
    );
    let mut response = ok_with_message(stats, message);
    if let Some(import_id) = import_id
        && let Ok(value) = HeaderValue::from_str(&import_id.to_string())
    {
        response.headers_mut().insert(IMPORT_ID_HEADER, value);
    }
    Ok(response)
}

/// Latest progress snapshot of every tracked import
#[utoipa::path(
    get,
    path = "/api/v1/imports/progress",
    tag = "imports",
    responses((status = 200, description = "Progress snapshots, newest first", body = Vec<ImportProgress>))
)]
pub async fn list_import_progress(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Response {
    ok(state.progress_service.snapshots().await)
}

/// Server-sent progress events, optionally narrowed to one import
#[utoipa::path(
    get,
    path = "/api/v1/imports/progress/events",
    tag = "imports",
    params(ProgressEventQuery),
    responses((status = 200, description = "Stream of `progress` events", content_type = "text/event-stream"))
)]
pub async fn import_progress_events(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Query(query): Query<ProgressEventQuery>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let mut receiver = state.progress_service.subscribe();

    let stream = async_stream::stream! {
        // Late subscribers start from the current snapshot
        if let Some(import_id) = query.import_id {
            let snapshot = state.progress_service.get(&import_id).await;
            if let Some(event) = snapshot.as_ref().and_then(progress_event) {
                yield Ok::<Event, axum::Error>(event);
            }
        }

        loop {
            match receiver.recv().await {
                Ok(progress) => {
                    if query.import_id.is_some_and(|id| id != progress.import_id) {
                        continue;
                    }
                    if let Some(event) = progress_event(&progress) {
                        yield Ok::<Event, axum::Error>(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Progress subscriber lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(HEARTBEAT_INTERVAL)
            .text("heartbeat"),
    )
}

fn progress_event(progress: &ImportProgress) -> Option<Event> {
    match serde_json::to_string(progress) {
        Ok(json) => Some(
            Event::default()
                .event("progress")
                .id(progress.import_id.to_string())
                .data(json),
        ),
        Err(e) => {
            error!("Failed to serialize progress event: {}", e);
            None
        }
    }
}
