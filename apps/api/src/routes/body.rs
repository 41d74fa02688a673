use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::errors::AppError;

/// Parses a JSON request body after auth and rate limiting have run.
/// An empty body is treated as `{}` so required-field checks produce the 400.
pub fn parse_json_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(raw).map_err(|_| AppError::Validation("Invalid request body".to_string()))
}
