//! School lookup handlers

use axum::{
    extract::{Path, State},
    response::Response,
};

use crate::database::repositories::SchoolSeaOrmRepository;
use crate::errors::AppError;
use crate::models::School;
use crate::web::{AppState, extractors::AuthenticatedUser, responses::ok};

/// List every school, ordered by name
#[utoipa::path(
    get,
    path = "/api/v1/schools",
    tag = "schools",
    responses(
        (status = 200, description = "All schools", body = Vec<School>),
        (status = 401, description = "Missing identity headers")
    )
)]
pub async fn list_schools(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
) -> Result<Response, AppError> {
    let repo = SchoolSeaOrmRepository::new(state.database.connection());
    Ok(ok(repo.find_all().await?))
}

/// Look up one school by its INEP code
#[utoipa::path(
    get,
    path = "/api/v1/schools/{code}",
    tag = "schools",
    params(("code" = i64, Path, description = "INEP school code")),
    responses(
        (status = 200, description = "School found", body = School),
        (status = 404, description = "No school with that code")
    )
)]
pub async fn get_school(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(code): Path<i64>,
) -> Result<Response, AppError> {
    let repo = SchoolSeaOrmRepository::new(state.database.connection());
    match repo.find_by_code(code).await? {
        Some(school) => Ok(ok(school)),
        None => Err(AppError::not_found("School", code.to_string())),
    }
}
