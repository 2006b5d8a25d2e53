//! Student lookup handlers

use axum::{
    extract::{Path, State},
    response::Response,
};
use uuid::Uuid;

use crate::database::repositories::StudentSeaOrmRepository;
use crate::errors::AppError;
use crate::models::Student;
use crate::web::{AppState, extractors::AuthenticatedUser, responses::ok};

#[utoipa::path(
    get,
    path = "/api/v1/students/{id}",
    tag = "students",
    params(("id" = Uuid, Path, description = "Student id")),
    responses(
        (status = 200, description = "Student found", body = Student),
        (status = 404, description = "Student not found")
    )
)]
pub async fn get_student(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let repo = StudentSeaOrmRepository::new(state.database.connection());
    repo.find_by_id(&id)
        .await?
        .map(ok)
        .ok_or_else(|| AppError::not_found("Student", id.to_string()))
}
