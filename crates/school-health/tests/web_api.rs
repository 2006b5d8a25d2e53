//! HTTP API tests against the full router

mod common;

use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::{
    TestServer,
    multipart::{MultipartForm, Part},
};
use serde_json::Value;

use school_health::{
    config::Config,
    web::{AppState, create_router},
};

use common::{fast_import_config, student_row, test_database, workbook};

const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

fn professional() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-profissional-id"),
        HeaderValue::from_static("42"),
    )
}

fn manager() -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("x-is-gestor"),
        HeaderValue::from_static("true"),
    )
}

async fn test_server() -> TestServer {
    let config = Config {
        import: fast_import_config(),
        ..Config::default()
    };
    let state = AppState::new(test_database().await, config);
    TestServer::new(create_router(state)).expect("Failed to start test server")
}

fn upload(buffer: Vec<u8>, file_name: &str) -> MultipartForm {
    MultipartForm::new().add_part(
        "file",
        Part::bytes(buffer)
            .file_name(file_name.to_string())
            .mime_type(XLSX_MIME),
    )
}

fn sample_workbook() -> Vec<u8> {
    workbook(&[
        student_row("Ana Souza", "529.982.247-25"),
        student_row("Bruno Dias", "111.444.777-35"),
    ])
}

#[tokio::test]
async fn test_health_endpoints() {
    let server = test_server().await;

    let response = server.get("/health").await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["status"], "ok");

    let response = server.get("/ready").await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "ready");
    assert_eq!(body["database"], "SQLite");
}

#[tokio::test]
async fn test_import_requires_identity_headers() {
    let server = test_server().await;

    let response = server
        .post("/api/v1/imports/enrollments")
        .multipart(upload(sample_workbook(), "alunos.xlsx"))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["success"], false);
}

#[tokio::test]
async fn test_import_requires_a_manager() {
    let server = test_server().await;
    let (name, value) = professional();

    let response = server
        .post("/api/v1/imports/enrollments")
        .add_header(name, value)
        .multipart(upload(sample_workbook(), "alunos.xlsx"))
        .await;
    response.assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_manager_imports_workbook() {
    let server = test_server().await;
    let (id_name, id_value) = professional();
    let (manager_name, manager_value) = manager();

    let response = server
        .post("/api/v1/imports/enrollments")
        .add_header(id_name, id_value)
        .add_header(manager_name, manager_value)
        .multipart(upload(sample_workbook(), "alunos.xlsx"))
        .await;
    response.assert_status_ok();

    let body = response.json::<Value>();
    assert_eq!(body["success"], true);
    assert_eq!(
        body["message"],
        "Import completed successfully! 2 students processed."
    );
    assert_eq!(body["data"]["totalRecords"], 2);
    assert_eq!(body["data"]["newStudents"], 2);
    assert_eq!(body["data"]["newEnrollments"], 2);
    assert!(response.maybe_header("x-import-id").is_some());

    let (id_name, id_value) = professional();
    let progress = server
        .get("/api/v1/imports/progress")
        .add_header(id_name, id_value)
        .await;
    progress.assert_status_ok();
    let snapshots = progress.json::<Value>();
    assert_eq!(snapshots["data"][0]["stage"], "completed");
    assert_eq!(snapshots["data"][0]["percentage"], 100);
}

#[tokio::test]
async fn test_rejected_file_returns_gate_errors() {
    let server = test_server().await;
    let (id_name, id_value) = professional();
    let (manager_name, manager_value) = manager();

    let response = server
        .post("/api/v1/imports/enrollments")
        .add_header(id_name, id_value)
        .add_header(manager_name, manager_value)
        .multipart(upload(b"not a spreadsheet".to_vec(), "alunos.txt"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let body = response.json::<Value>();
    assert_eq!(body["success"], false);
    let errors = body["details"]["errors"].as_array().unwrap();
    assert!(errors.contains(&Value::from(
        "Invalid file type. Only .xlsx and .xls files are allowed"
    )));
    assert!(errors.contains(&Value::from("Invalid file extension. Use .xlsx or .xls")));
}

#[tokio::test]
async fn test_empty_upload_is_a_bad_request() {
    let server = test_server().await;
    let (id_name, id_value) = professional();
    let (manager_name, manager_value) = manager();

    let response = server
        .post("/api/v1/imports/enrollments")
        .add_header(id_name, id_value)
        .add_header(manager_name, manager_value)
        .multipart(upload(Vec::new(), "alunos.xlsx"))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["error"], "The uploaded file is empty");
}

#[tokio::test]
async fn test_validate_endpoint_reports_without_writing() {
    let server = test_server().await;
    let (id_name, id_value) = professional();
    let (manager_name, manager_value) = manager();

    let mut no_name = student_row("", "");
    no_name[0].clear();
    let buffer = workbook(&[student_row("Ana Souza", "529.982.247-25"), no_name]);

    let response = server
        .post("/api/v1/imports/enrollments/validate")
        .add_header(id_name, id_value)
        .add_header(manager_name, manager_value)
        .multipart(upload(buffer, "alunos.xlsx"))
        .await;
    response.assert_status_ok();

    let data = &response.json::<Value>()["data"];
    assert_eq!(data["isValid"], true);
    assert_eq!(data["totalRows"], 2);
    assert_eq!(data["validRows"], 1);

    let (id_name, id_value) = professional();
    let schools = server.get("/api/v1/schools").add_header(id_name, id_value).await;
    schools.assert_status_ok();
    assert_eq!(schools.json::<Value>()["data"], Value::Array(Vec::new()));
}

#[tokio::test]
async fn test_school_lookup_after_import() {
    let server = test_server().await;
    let (id_name, id_value) = professional();
    let (manager_name, manager_value) = manager();

    server
        .post("/api/v1/imports/enrollments")
        .add_header(id_name, id_value)
        .add_header(manager_name, manager_value)
        .multipart(upload(sample_workbook(), "alunos.xlsx"))
        .await
        .assert_status_ok();

    let (id_name, id_value) = professional();
    let response = server
        .get("/api/v1/schools/35000123")
        .add_header(id_name, id_value)
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["data"]["name"], "EMEF Centro");

    let (id_name, id_value) = professional();
    server
        .get("/api/v1/schools/1")
        .add_header(id_name, id_value)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unknown_student_is_not_found() {
    let server = test_server().await;
    let (id_name, id_value) = professional();

    server
        .get(&format!("/api/v1/students/{}", uuid::Uuid::new_v4()))
        .add_header(id_name, id_value)
        .await
        .assert_status(StatusCode::NOT_FOUND);
}
