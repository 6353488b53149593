use axum::{
    body::{to_bytes, Body, Bytes},
    http::{header::CONTENT_LENGTH, Request},
    middleware::Next,
    response::Response,
};
use serde_json::Value;
use std::time::Instant;

use crate::middleware::request_id::RequestId;

const MAX_BUFFERED_BODY_BYTES: usize = 64 * 1024;

/// Records 4xx/5xx responses with the callable error code and cause. The body is
/// buffered and forwarded unchanged.
pub async fn log_error_responses(req: Request<Body>, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    let start = Instant::now();

    let response = next.run(req).await;
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return response;
    }

    let latency_ms = start.elapsed().as_millis() as u64;
    let (mut parts, body) = response.into_parts();
    let bytes = match to_bytes(body, MAX_BUFFERED_BODY_BYTES).await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(
                status = status.as_u16(),
                method = %method,
                path = %path,
                request_id = %request_id,
                error = ?err,
                "Failed to read error response body"
            );
            parts.headers.remove(CONTENT_LENGTH);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let (code, details) = error_fields(&bytes);
    if status.is_server_error() {
        tracing::error!(
            status = status.as_u16(),
            method = %method,
            path = %path,
            request_id = %request_id,
            latency_ms,
            code = %code,
            details = %details,
            "Request completed with error status"
        );
    } else {
        tracing::warn!(
            status = status.as_u16(),
            method = %method,
            path = %path,
            request_id = %request_id,
            latency_ms,
            code = %code,
            "Request completed with error status"
        );
    }

    Response::from_parts(parts, Body::from(bytes))
}

/// Pulls `error.code` and `error.details` out of an error body, if it is one.
fn error_fields(bytes: &Bytes) -> (String, String) {
    let Ok(body) = serde_json::from_slice::<Value>(bytes) else {
        return (String::new(), String::new());
    };
    let field = |name: &str| {
        body.pointer(&format!("/error/{}", name))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    (field("code"), field("details"))
}
