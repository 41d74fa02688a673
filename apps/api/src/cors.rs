//! CORS for browser callers. The allowed origin header always names one
//! configured origin: the caller's if it is on the allow-list, otherwise the
//! first configured one. Arbitrary origins are never reflected.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::DEFAULT_ALLOWED_ORIGINS;
use crate::state::AppState;

const ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";
const ALLOW_METHODS: &str = "POST, OPTIONS";

pub fn resolve_origin<'a>(request_origin: Option<&str>, allowed: &'a [String]) -> &'a str {
    request_origin
        .and_then(|origin| allowed.iter().find(|a| a.as_str() == origin))
        .or_else(|| allowed.first())
        .map(String::as_str)
        .unwrap_or_else(|| {
            DEFAULT_ALLOWED_ORIGINS
                .split(',')
                .next()
                .unwrap_or_default()
        })
}

pub fn cors_headers(origin: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(origin) = HeaderValue::from_str(origin) {
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(header::VARY, HeaderValue::from_static("Origin"));
    headers
}

/// Answers preflight directly and decorates every other response.
pub async fn cors_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let origin = resolve_origin(
        req.headers()
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok()),
        &state.config.allowed_origins,
    );
    let headers = cors_headers(origin);

    if req.method() == Method::OPTIONS {
        return (StatusCode::OK, headers).into_response();
    }

    let mut response = next.run(req).await;
    response.headers_mut().extend(headers);
    response
}
