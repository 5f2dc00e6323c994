//! Per-request CORS headers

use axum::extract::{Request, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::AppState;

const ALLOW_METHODS: &str = "GET,POST,PUT,DELETE,OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, X-Passphrase";
const MAX_AGE: &str = "86400";

/// Add CORS headers to every response and answer preflight requests
///
/// A configured origin is reflected only when it matches the request's
/// `Origin`; otherwise the configured value is sent as-is.
pub async fn apply_cors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = allow_origin(
        &state.config.allowed_origin,
        request
            .headers()
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok()),
    );

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_str(&origin).unwrap_or_else(|_| HeaderValue::from_static("*")),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));

    response
}

fn allow_origin(allowed: &str, request_origin: Option<&str>) -> String {
    match request_origin {
        _ if allowed == "*" => "*".to_string(),
        Some(origin) if origin == allowed => origin.to_string(),
        _ => allowed.to_string(),
    }
}
