use axum::{
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

use crate::auth::AuthError;
use crate::envelope::Envelope;
use crate::llm_client::LlmError;
use crate::rate_limit::{rate_limit_headers, RateLimitDecision};

pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`;
/// every variant renders as the `{success: false, error}` envelope.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Rate limit exceeded. Please try again later.")]
    RateLimited(RateLimitDecision),

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Upstream(String),

    #[error("{0}")]
    Configuration(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Upstream(_)
            | AppError::Configuration(_)
            | AppError::Database(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let mut headers = HeaderMap::new();

        let message = match &self {
            AppError::Auth(e) => e.to_string(),
            AppError::RateLimited(decision) => {
                headers = rate_limit_headers(decision);
                if let Ok(v) = decision.retry_after_secs().to_string().parse() {
                    headers.insert("retry-after", v);
                }
                RATE_LIMITED_MESSAGE.to_string()
            }
            AppError::Validation(msg) => msg.clone(),
            AppError::Upstream(msg) => {
                error!("Upstream error: {msg}");
                msg.clone()
            }
            AppError::Configuration(msg) => {
                error!("Configuration error: {msg}");
                msg.clone()
            }
            AppError::Database(e) => {
                error!("Database error: {e}");
                "A database error occurred".to_string()
            }
            AppError::Internal(e) => {
                error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        };

        (status, headers, Json(Envelope::<()>::failure(message))).into_response()
    }
}

impl From<LlmError> for AppError {
    fn from(e: LlmError) -> Self {
        match e {
            LlmError::MissingApiKey => AppError::Configuration(e.to_string()),
            LlmError::Api { status, message } => {
                error!("LLM API returned {status}: {message}");
                AppError::Upstream(message)
            }
            LlmError::Http(e) => {
                error!("LLM request failed: {e}");
                AppError::Upstream("Failed to reach AI service".to_string())
            }
            LlmError::Parse(_) | LlmError::EmptyContent => {
                error!("LLM response unusable: {e}");
                AppError::Upstream("AI service returned an invalid response".to_string())
            }
        }
    }
}
