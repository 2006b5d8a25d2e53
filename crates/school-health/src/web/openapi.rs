//! OpenAPI document, served through Swagger UI at `/api/docs`

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "School Health API",
        version = "0.1.0",
        description = "Enrollment spreadsheet import and school lookups for the school health service. \
            Identity is read from the `x-profissional-id`, `x-usf-id` and `x-is-gestor` headers."
    ),
    tags(
        (name = "health", description = "Liveness and readiness probes"),
        (name = "imports", description = "Enrollment spreadsheet imports and their progress"),
        (name = "schools", description = "School lookups"),
        (name = "students", description = "Student lookups"),
    ),
    components(
        schemas(
            crate::models::School,
            crate::models::SchoolClass,
            crate::models::Student,
            crate::models::Sex,
            crate::models::Period,
            crate::import::ImportStats,
            crate::import::ImportRowError,
            crate::import::FileValidation,
            crate::services::ImportProgress,
            crate::services::ImportStage,
            crate::web::handlers::health::HealthResponse,
        )
    ),
    paths(
        crate::web::handlers::health::health_check,
        crate::web::handlers::health::readiness_check,
        crate::web::handlers::imports::validate_enrollment_file,
        crate::web::handlers::imports::import_enrollments,
        crate::web::handlers::imports::list_import_progress,
        crate::web::handlers::imports::import_progress_events,
        crate::web::handlers::schools::list_schools,
        crate::web::handlers::schools::get_school,
        crate::web::handlers::students::get_student,
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_import_routes() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/api/v1/imports/enrollments"));
        assert!(doc.paths.paths.contains_key("/api/v1/schools/{code}"));
    }
}
