//! Bearer-token authentication.
//!
//! Resolution is an ordered chain behind one `resolve` call:
//! 1. full session verification with the identity provider;
//! 2. for tokens it rejects (guest sessions), read the unverified `sub` claim
//!    and accept it only if the admin API confirms the user exists.
//!
//! Handlers take an [`AuthUser`] extractor and never see which path was used.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

pub mod provider;
pub mod token;

use provider::IdentityProvider;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserIdentity {
    pub id: Uuid,
    pub is_anonymous: bool,
    pub email: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing authorization header")]
    MissingHeader,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Invalid token or user not found")]
    InvalidTokenOrUserNotFound,
}

#[derive(Clone)]
pub struct IdentityResolver {
    provider: Arc<dyn IdentityProvider>,
}

impl IdentityResolver {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self { provider }
    }

    pub fn provider(&self) -> &dyn IdentityProvider {
        self.provider.as_ref()
    }

    pub async fn resolve(&self, token: &str) -> Result<UserIdentity, AuthError> {
        match self.provider.verify_session(token).await {
            Ok(Some(user)) => return Ok(user),
            Ok(None) => {}
            Err(e) => warn!("Session verification failed, trying guest lookup: {e}"),
        }

        let subject = token::unverified_subject(token)?;
        let id = Uuid::parse_str(&subject).map_err(|_| AuthError::InvalidTokenOrUserNotFound)?;

        match self.provider.get_user_by_id(id).await {
            Ok(Some(user)) => {
                info!(user_id = %user.id, anonymous = user.is_anonymous, "Resolved identity via admin lookup");
                Ok(user)
            }
            Ok(None) => Err(AuthError::InvalidTokenOrUserNotFound),
            Err(e) => {
                warn!("Admin user lookup failed for {id}: {e}");
                Err(AuthError::InvalidTokenOrUserNotFound)
            }
        }
    }
}

/// Extracts `Authorization: Bearer <token>`. The scheme is matched case-insensitively.
pub fn bearer_token(value: &str) -> Option<&str> {
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// The caller's resolved identity. Rejects with a 401 envelope.
#[derive(Debug, Clone)]
pub struct AuthUser(pub UserIdentity);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .ok_or(AuthError::MissingHeader)?;
        let token = header
            .to_str()
            .ok()
            .and_then(bearer_token)
            .ok_or(AuthError::InvalidToken)?;

        Ok(AuthUser(state.identity.resolve(token).await?))
    }
}
