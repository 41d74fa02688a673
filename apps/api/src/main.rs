mod account;
mod auth;
mod coach;
mod config;
mod cors;
mod db;
mod envelope;
mod errors;
mod llm_client;
mod models;
mod rate_limit;
mod records;
mod routes;
mod state;

#[cfg(test)]
mod testing;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::auth::provider::SupabaseAuth;
use crate::auth::IdentityResolver;
use crate::config::Config;
use crate::db::create_pool;
use crate::llm_client::LlmClient;
use crate::rate_limit::{InMemoryRateLimiter, SWEEP_INTERVAL};
use crate::records::PgRecordStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Huntlog API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize PostgreSQL (connections are opened on first use)
    let db = create_pool(&config.database_url)?;
    let records = Arc::new(PgRecordStore::new(db));

    // Initialize identity provider
    let http = reqwest::Client::new();
    let identity = IdentityResolver::new(Arc::new(SupabaseAuth::new(
        http,
        &config.supabase_url,
        config.supabase_anon_key.clone(),
        config.supabase_service_role_key.clone(),
    )));
    info!("Identity provider client initialized ({})", config.supabase_url);

    // Initialize LLM client
    let llm = LlmClient::new(config.openai_api_key.clone())?;
    if llm.is_configured() {
        info!("LLM client initialized (model: {})", llm_client::MODEL);
    } else {
        warn!("OPENAI_API_KEY not set; AI endpoints will return 500");
    }

    // Per-instance rate limiter with periodic cleanup of expired windows
    let rate_limiter = Arc::new(InMemoryRateLimiter::new());
    rate_limiter.spawn_sweeper(SWEEP_INTERVAL);

    // Build app state
    let state = AppState {
        config: config.clone(),
        identity,
        records,
        llm: Arc::new(llm),
        rate_limiter,
    };

    // Build router
    let app = build_router(state).layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
