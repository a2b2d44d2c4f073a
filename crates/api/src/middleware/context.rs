//! Request id scoping and access logging.

use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

/// Header carrying the handler duration.
pub const X_RESPONSE_TIME: HeaderName = HeaderName::from_static("x-response-time");

const X_REQUEST_ID: &str = "x-request-id";

tokio::task_local! {
    static REQUEST_ID: String;
}

/// The request id of the request being handled on this task.
#[must_use]
pub fn current_request_id() -> Option<String> {
    REQUEST_ID.try_with(Clone::clone).ok()
}

/// Makes the request id visible to response builders and logs the
/// request start and completion.
pub async fn request_context(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map_or_else(|| Uuid::new_v4().to_string(), String::from);
    let method = request.method().clone();
    let path = request.uri().path().to_owned();
    let start = Instant::now();

    info!(request_id = %request_id, "→ {method} {path}");
    let mut response = REQUEST_ID
        .scope(request_id.clone(), next.run(request))
        .await;

    let elapsed = start.elapsed().as_millis();
    if let Ok(value) = HeaderValue::from_str(&format!("{elapsed}ms")) {
        response.headers_mut().insert(X_RESPONSE_TIME, value);
    }

    let status = response.status().as_u16();
    match status {
        500.. => error!(request_id = %request_id, status, elapsed_ms = elapsed, "← {method} {path}"),
        400..=499 => warn!(request_id = %request_id, status, elapsed_ms = elapsed, "← {method} {path}"),
        _ => info!(request_id = %request_id, status, elapsed_ms = elapsed, "← {method} {path}"),
    }
    response
}
