pub mod body;
pub mod health;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::account::handlers as account;
use crate::coach::handlers as coach;
use crate::cors::cors_middleware;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // AI endpoints (rate limited)
        .route("/ai-coach", post(coach::handle_ai_coach))
        .route("/ai-weekly-summary", post(coach::handle_weekly_summary))
        // Account lifecycle
        .route("/delete-account", post(account::handle_delete_account))
        .route("/export-data", post(account::handle_export_data))
        .route("/upgrade-guest", post(account::handle_upgrade_guest))
        .layer(middleware::from_fn_with_state(state.clone(), cors_middleware))
        .with_state(state)
}
