//! HTTP middleware

use axum::{
    extract::Request,
    http::{Method, Uri},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{Instrument, debug, info, info_span, warn};

use super::extractors::PROFESSIONAL_ID_HEADER;

/// Logs every request with its status and timing.
///
/// Runs the rest of the stack inside a span carrying the request id, so
/// import logs emitted by handlers can be tied back to the upload.
pub async fn request_logging_middleware(
    method: Method,
    uri: Uri,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let request_id = uuid::Uuid::new_v4();
    let professional_id = request
        .headers()
        .get(PROFESSIONAL_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("-")
        .to_string();

    let span = info_span!("http_request", %request_id, %method, %uri);
    async move {
        debug!(%professional_id, "HTTP request started");

        let response = next.run(request).await;
        let status = response.status().as_u16();
        let duration_ms = start.elapsed().as_millis();

        if status >= 400 {
            warn!(status, duration_ms, %professional_id, "HTTP request completed with error");
        } else {
            info!(status, duration_ms, %professional_id, "HTTP request completed");
        }
        response
    }
    .instrument(span)
    .await
}
