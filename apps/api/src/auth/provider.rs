//! Identity provider client. The hosted auth service is reached over its REST API:
//! session verification uses the public key, everything under `/admin` uses the
//! service-role key.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::UserIdentity;

#[derive(Debug, Error)]
pub enum IdentityProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Api { status: u16, message: String },
}

impl IdentityProviderError {
    /// HTTP status returned by the provider, if it answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            IdentityProviderError::Api { status, .. } => Some(*status),
            IdentityProviderError::Http(e) => e.status().map(|s| s.as_u16()),
        }
    }
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Full signature-checked verification of a session token.
    /// `Ok(None)` means the provider rejected the token.
    async fn verify_session(&self, token: &str)
        -> Result<Option<UserIdentity>, IdentityProviderError>;

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>, IdentityProviderError>;

    async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, IdentityProviderError>;

    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityProviderError>;
}

#[derive(Debug, Deserialize)]
struct ProviderUser {
    id: Uuid,
    email: Option<String>,
    #[serde(default)]
    is_anonymous: bool,
}

impl From<ProviderUser> for UserIdentity {
    fn from(user: ProviderUser) -> Self {
        UserIdentity {
            id: user.id,
            is_anonymous: user.is_anonymous,
            email: user.email.filter(|e| !e.is_empty()),
        }
    }
}

/// Error bodies vary by endpoint; take whichever message field is present.
#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

#[derive(Clone)]
pub struct SupabaseAuth {
    client: Client,
    base_url: String,
    anon_key: String,
    service_role_key: String,
}

impl SupabaseAuth {
    pub fn new(client: Client, base_url: &str, anon_key: String, service_role_key: String) -> Self {
        Self {
            client,
            base_url: format!("{}/auth/v1", base_url.trim_end_matches('/')),
            anon_key,
            service_role_key,
        }
    }

    fn admin(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("apikey", &self.service_role_key)
            .bearer_auth(&self.service_role_key)
    }
}

async fn api_error(response: reqwest::Response) -> IdentityProviderError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ProviderErrorBody>(&body)
        .ok()
        .and_then(|e| e.msg.or(e.message).or(e.error_description))
        .unwrap_or(body);
    IdentityProviderError::Api { status, message }
}

#[async_trait]
impl IdentityProvider for SupabaseAuth {
    async fn verify_session(
        &self,
        token: &str,
    ) -> Result<Option<UserIdentity>, IdentityProviderError> {
        let response = self
            .client
            .get(format!("{}/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(token)
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(Some(response.json::<ProviderUser>().await?.into())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::BAD_REQUEST => Ok(None),
            _ => Err(api_error(response).await),
        }
    }

    async fn get_user_by_id(&self, id: Uuid) -> Result<Option<UserIdentity>, IdentityProviderError> {
        let response = self
            .admin(self.client.get(format!("{}/admin/users/{id}", self.base_url)))
            .send()
            .await?;

        match response.status() {
            s if s.is_success() => Ok(Some(response.json::<ProviderUser>().await?.into())),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(api_error(response).await),
        }
    }

    async fn create_user(
        &self,
        email: &str,
        password: &str,
    ) -> Result<UserIdentity, IdentityProviderError> {
        let response = self
            .admin(self.client.post(format!("{}/admin/users", self.base_url)))
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json::<ProviderUser>().await?.into())
    }

    async fn delete_user(&self, id: Uuid) -> Result<(), IdentityProviderError> {
        let response = self
            .admin(self.client.delete(format!("{}/admin/users/{id}", self.base_url)))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }
}
