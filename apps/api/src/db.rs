use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

/// Creates the Postgres pool used by the record store.
/// Connection is lazy so a cold database does not block startup; the first
/// query surfaces connection errors per request instead.
pub fn create_pool(database_url: &str) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect_lazy(database_url)
        .context("DATABASE_URL is not a valid Postgres connection string")?;

    info!("PostgreSQL pool configured");
    Ok(pool)
}
