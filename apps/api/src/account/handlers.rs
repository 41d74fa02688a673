use axum::{body::Bytes, extract::State, Json};
use chrono::Utc;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::envelope::Envelope;
use crate::errors::AppError;
use crate::records::UserTable;
use crate::routes::body::parse_json_body;
use crate::state::AppState;

const CONFIRM_PHRASE: &str = "DELETE";
const MIN_PASSWORD_CHARS: usize = 6;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DeleteAccountRequest {
    pub confirm: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteAccountResponse {
    pub deleted: bool,
    pub tables_cleared: Vec<&'static str>,
    pub tables_failed: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub export: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct UpgradeGuestRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct UpgradeGuestResponse {
    pub new_user_id: Uuid,
    pub message: String,
    /// Tables whose rows are still owned by the guest identity.
    pub tables_failed: Vec<&'static str>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /delete-account
///
/// Clears every user-owned table, then deletes the identity. Table failures are
/// logged and skipped; only the identity deletion can fail the request.
pub async fn handle_delete_account(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Bytes,
) -> Result<Json<Envelope<DeleteAccountResponse>>, AppError> {
    let request: DeleteAccountRequest = parse_json_body(&body)?;
    if request.confirm.as_deref() != Some(CONFIRM_PHRASE) {
        return Err(AppError::Validation(
            r#"Confirmation required. Send {"confirm": "DELETE"}"#.to_string(),
        ));
    }

    let mut tables_cleared = Vec::new();
    let mut tables_failed = Vec::new();
    for table in UserTable::ALL {
        match state.records.delete_rows(table, user.id).await {
            Ok(rows) => {
                info!(user_id = %user.id, table = table.as_str(), rows, "Deleted user rows");
                tables_cleared.push(table.as_str());
            }
            Err(e) => {
                warn!(user_id = %user.id, table = table.as_str(), "Failed to delete rows: {e}");
                tables_failed.push(table.as_str());
            }
        }
    }

    state
        .identity
        .provider()
        .delete_user(user.id)
        .await
        .map_err(|e| {
            error!(user_id = %user.id, status = e.status(), "Failed to delete identity: {e}");
            AppError::Upstream(format!("Failed to delete account: {e}"))
        })?;

    info!(user_id = %user.id, "Account deleted");
    Ok(Json(Envelope::ok(DeleteAccountResponse {
        deleted: true,
        tables_cleared,
        tables_failed,
    })))
}

/// POST /export-data
///
/// One JSON snapshot of every user-owned table. Tables are fetched concurrently;
/// if any fetch fails the first failure is reported instead of partial data.
pub async fn handle_export_data(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
) -> Result<Json<Envelope<ExportResponse>>, AppError> {
    let fetches = UserTable::ALL.map(|table| {
        let records = state.records.clone();
        async move { (table, records.export_table(table, user.id).await) }
    });
    let results = join_all(fetches).await;

    let mut export = Map::new();
    export.insert("exported_at".to_string(), Value::String(Utc::now().to_rfc3339()));
    export.insert("user_id".to_string(), Value::String(user.id.to_string()));
    export.insert(
        "email".to_string(),
        user.email.clone().map(Value::String).unwrap_or(Value::Null),
    );

    let mut first_error = None;
    for (table, result) in results {
        match result {
            Ok(rows) => {
                export.insert(table.as_str().to_string(), Value::Array(rows));
            }
            Err(e) => {
                warn!(user_id = %user.id, table = table.as_str(), "Export fetch failed: {e}");
                first_error.get_or_insert(table);
            }
        }
    }

    if let Some(table) = first_error {
        return Err(AppError::Upstream(format!(
            "Failed to export {}",
            table.as_str()
        )));
    }

    Ok(Json(Envelope::ok(ExportResponse { export })))
}

/// POST /upgrade-guest
///
/// Creates a credentialed identity for a guest and moves every owned row to it.
/// The guest identity is removed only once every table has moved; otherwise it
/// is kept so rows that failed to move stay reachable.
pub async fn handle_upgrade_guest(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Bytes,
) -> Result<Json<Envelope<UpgradeGuestResponse>>, AppError> {
    if !user.is_anonymous {
        return Err(AppError::Validation("User is not a guest account".to_string()));
    }

    let request: UpgradeGuestRequest = parse_json_body(&body)?;
    let (Some(email), Some(password)) = (
        request.email.as_deref().map(str::trim).filter(|e| !e.is_empty()),
        request.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::Validation("Email and password are required".to_string()));
    };
    if !email.contains('@') {
        return Err(AppError::Validation("Invalid email address".to_string()));
    }
    if password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_CHARS} characters"
        )));
    }

    let provider = state.identity.provider();
    let new_user = provider.create_user(email, password).await.map_err(|e| {
        warn!(user_id = %user.id, status = e.status(), "Failed to create upgraded identity: {e}");
        AppError::Validation(e.to_string())
    })?;

    let mut tables_failed = Vec::new();
    for table in UserTable::ALL {
        match state.records.reassign_rows(table, user.id, new_user.id).await {
            Ok(rows) => info!(table = table.as_str(), rows, "Migrated guest rows"),
            Err(e) => {
                warn!(
                    from = %user.id,
                    to = %new_user.id,
                    table = table.as_str(),
                    "Failed to migrate guest rows: {e}"
                );
                tables_failed.push(table.as_str());
            }
        }
    }

    if tables_failed.is_empty() {
        if let Err(e) = provider.delete_user(user.id).await {
            warn!(
                user_id = %user.id,
                status = e.status(),
                "Failed to remove guest identity after upgrade: {e}"
            );
        }
    } else {
        warn!(
            user_id = %user.id,
            failed = ?tables_failed,
            "Keeping guest identity; some rows were not migrated"
        );
    }

    info!(guest_id = %user.id, new_user_id = %new_user.id, "Guest account upgraded");
    Ok(Json(Envelope::ok(UpgradeGuestResponse {
        new_user_id: new_user.id,
        message: "Account upgraded successfully. Please sign in with your new credentials."
            .to_string(),
        tables_failed,
    })))
}
