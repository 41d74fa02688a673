use std::sync::Arc;

use crate::auth::IdentityResolver;
use crate::config::Config;
use crate::llm_client::CompletionBackend;
use crate::rate_limit::RateLimiter;
use crate::records::RecordStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub identity: IdentityResolver,
    pub records: Arc<dyn RecordStore>,
    /// Production: `LlmClient`. Swapped for a fake in handler tests.
    pub llm: Arc<dyn CompletionBackend>,
    /// Process-local; the only mutable state shared between requests.
    pub rate_limiter: Arc<dyn RateLimiter>,
}
