use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Span;
use uuid::Uuid;

pub const REQUEST_ID_HEADER: &str = "x-request-id";
const CORRELATION_ID_HEADER: &str = "x-correlation-id";
/// Delivery id header set by the change notifier on trigger calls.
const EVENT_ID_HEADER: &str = "ce-id";

#[derive(Clone, Debug)]
pub struct RequestId(pub String);

/// Reuses an inbound request or delivery id when present, otherwise mints one,
/// and echoes it on the response.
pub async fn request_id(mut req: Request, next: Next) -> Response {
    let header_name = HeaderName::from_static(REQUEST_ID_HEADER);

    let id = [REQUEST_ID_HEADER, CORRELATION_ID_HEADER, EVENT_ID_HEADER]
        .into_iter()
        .find_map(|name| req.headers().get(name))
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    req.extensions_mut().insert(RequestId(id.clone()));

    let mut response = next.run(req).await;

    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(header_name, value);
    }

    response
}

/// Span factory for `TraceLayer` so every event carries the request id.
pub fn request_span<B>(req: &axum::http::Request<B>) -> Span {
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.as_str())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %req.method(),
        uri = %req.uri(),
        request_id = %request_id,
    )
}
