//! Axum route handlers for the AI endpoints.
//!
//! Order per request: auth (extractor) → rate limit → body validation →
//! context build → completion → envelope. Any step can end the request.

use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::auth::{AuthUser, UserIdentity};
use crate::coach::context::{assemble, assemble_week, clamp_time_range};
use crate::coach::gateway::{complete_chat, complete_summary, WeeklySummary};
use crate::coach::prompts::{persona_prompt, WEEKLY_SUMMARY_PROMPT};
use crate::coach::CoachMode;
use crate::envelope::Envelope;
use crate::errors::AppError;
use crate::rate_limit::{rate_limit_headers, RateLimitConfig, RateLimitDecision, CHAT_LIMIT, SUMMARY_LIMIT};
use crate::routes::body::parse_json_body;
use crate::state::AppState;

pub const MAX_MESSAGE_CHARS: usize = 4000;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CoachRequest {
    pub mode: Option<String>,
    pub message: Option<String>,
    pub time_range: Option<f64>,
}

#[derive(Debug, Serialize)]
pub struct CoachResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct WeeklySummaryRequest {
    pub week_start: Option<String>,
    pub week_end: Option<String>,
    pub stats: Option<Value>,
    pub review_text: Option<String>,
    pub goals: Option<Value>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /ai-coach
pub async fn handle_ai_coach(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Bytes,
) -> Result<(HeaderMap, Json<Envelope<CoachResponse>>), AppError> {
    let decision = enforce_rate_limit(&state, &user, CHAT_LIMIT)?;

    let request: CoachRequest = parse_json_body(&body)?;
    let (mode, message) = validate_coach_request(&request)?;
    let days = clamp_time_range(request.time_range);

    info!(user_id = %user.id, mode = %mode, days, "AI coach request");

    let context = assemble(state.records.as_ref(), user.id, mode, days).await;
    let response = complete_chat(
        state.llm.as_ref(),
        &persona_prompt(mode),
        &context,
        message,
    )
    .await?;

    Ok((
        rate_limit_headers(&decision),
        Json(Envelope::ok(CoachResponse { response })),
    ))
}

/// POST /ai-weekly-summary
pub async fn handle_weekly_summary(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    body: Bytes,
) -> Result<(HeaderMap, Json<Envelope<WeeklySummary>>), AppError> {
    let decision = enforce_rate_limit(&state, &user, SUMMARY_LIMIT)?;

    let request: WeeklySummaryRequest = parse_json_body(&body)?;
    let (week_start, week_end, stats) = validate_summary_request(&request)?;

    info!(user_id = %user.id, %week_start, %week_end, "Weekly summary request");

    let context = assemble_week(state.records.as_ref(), user.id, week_start, week_end).await;
    let prompt = build_summary_prompt(
        week_start,
        week_end,
        stats,
        &context,
        request.review_text.as_deref(),
        request.goals.as_ref(),
    );
    let summary = complete_summary(state.llm.as_ref(), &prompt).await?;

    Ok((rate_limit_headers(&decision), Json(Envelope::ok(summary))))
}

// ────────────────────────────────────────────────────────────────────────────
// Helpers
// ────────────────────────────────────────────────────────────────────────────

fn enforce_rate_limit(
    state: &AppState,
    user: &UserIdentity,
    config: RateLimitConfig,
) -> Result<RateLimitDecision, AppError> {
    let decision = state
        .rate_limiter
        .check(&config.key_for(&user.id.to_string()), config);
    if !decision.allowed {
        warn!(user_id = %user.id, scope = config.scope, limit = config.max_requests, "Rate limit exceeded");
        return Err(AppError::RateLimited(decision));
    }
    Ok(decision)
}

fn validate_coach_request(request: &CoachRequest) -> Result<(CoachMode, &str), AppError> {
    let (Some(mode), Some(message)) = (
        request.mode.as_deref(),
        request.message.as_deref().map(str::trim).filter(|m| !m.is_empty()),
    ) else {
        return Err(AppError::Validation("Mode and message are required".to_string()));
    };

    let mode: CoachMode = mode
        .parse()
        .map_err(|_| AppError::Validation("Invalid mode".to_string()))?;

    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(AppError::Validation(format!(
            "Message must be at most {MAX_MESSAGE_CHARS} characters"
        )));
    }
    Ok((mode, message))
}

fn validate_summary_request(
    request: &WeeklySummaryRequest,
) -> Result<(NaiveDate, NaiveDate, &Value), AppError> {
    let (Some(start), Some(end), Some(stats)) = (
        request.week_start.as_deref().filter(|s| !s.trim().is_empty()),
        request.week_end.as_deref().filter(|s| !s.trim().is_empty()),
        request.stats.as_ref().filter(|s| !s.is_null()),
    ) else {
        return Err(AppError::Validation(
            "week_start, week_end, and stats are required".to_string(),
        ));
    };

    let parse = |s: &str| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d");
    let (Ok(start), Ok(end)) = (parse(start), parse(end)) else {
        return Err(AppError::Validation(
            "week_start and week_end must be YYYY-MM-DD dates".to_string(),
        ));
    };
    if end < start {
        return Err(AppError::Validation(
            "week_end must not be before week_start".to_string(),
        ));
    }
    Ok((start, end, stats))
}

fn build_summary_prompt(
    week_start: NaiveDate,
    week_end: NaiveDate,
    stats: &Value,
    context: &str,
    review_text: Option<&str>,
    goals: Option<&Value>,
) -> String {
    let review = review_text
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or("None");
    let goals = goals.map(render_value).unwrap_or_else(|| "None".to_string());

    WEEKLY_SUMMARY_PROMPT
        .replace("{week_start}", &week_start.to_string())
        .replace("{week_end}", &week_end.to_string())
        .replace("{stats}", &render_value(stats))
        .replace("{context}", context)
        .replace("{review_text}", review)
        .replace("{goals}", &goals)
}

/// Objects become `key: value` lines, arrays become `- item` lines.
fn render_value(value: &Value) -> String {
    let scalar = |v: &Value| match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    let lines: Vec<String> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| format!("{k}: {}", scalar(v))).collect(),
        Value::Array(items) => items.iter().map(|v| format!("- {}", scalar(v))).collect(),
        other => vec![scalar(other)],
    };
    if lines.is_empty() {
        "None".to_string()
    } else {
        lines.join("\n")
    }
}
