//! Completion Gateway: the two call shapes the coach endpoints use.
//!
//! Chat: `[system(persona), system(context), user(message)]` → free text.
//! Summary: one user prompt → JSON object, parsed as untrusted input with a
//! default for every field.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::coach::prompts::CONTEXT_PREAMBLE;
use crate::llm_client::{
    strip_json_fences, ChatMessage, CompletionBackend, CompletionRequest, LlmError,
};

pub const TEMPERATURE: f32 = 0.7;
pub const CHAT_MAX_TOKENS: u32 = 800;
pub const SUMMARY_MAX_TOKENS: u32 = 1500;

pub const EMPTY_SUMMARY: &str = "No summary generated.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeeklySummary {
    pub summary: String,
    pub focus_points: Vec<String>,
}

pub async fn complete_chat(
    backend: &dyn CompletionBackend,
    persona: &str,
    context: &str,
    message: &str,
) -> Result<String, LlmError> {
    let request = CompletionRequest {
        messages: vec![
            ChatMessage::system(persona),
            ChatMessage::system(format!("{CONTEXT_PREAMBLE}{context}")),
            ChatMessage::user(message),
        ],
        temperature: TEMPERATURE,
        max_tokens: CHAT_MAX_TOKENS,
        json_output: false,
    };
    backend.complete(&request).await
}

pub async fn complete_summary(
    backend: &dyn CompletionBackend,
    prompt: &str,
) -> Result<WeeklySummary, LlmError> {
    let request = CompletionRequest {
        messages: vec![ChatMessage::user(prompt)],
        temperature: TEMPERATURE,
        max_tokens: SUMMARY_MAX_TOKENS,
        json_output: true,
    };
    let text = backend.complete(&request).await?;
    Ok(parse_summary(&text))
}

/// Reads `{summary, focus_points}` out of model output. Missing or mistyped
/// fields fall back to defaults; output that is not JSON becomes the summary.
pub fn parse_summary(text: &str) -> WeeklySummary {
    let text = strip_json_fences(text);

    let Ok(value) = serde_json::from_str::<Value>(text) else {
        return WeeklySummary {
            summary: if text.is_empty() {
                EMPTY_SUMMARY.to_string()
            } else {
                text.to_string()
            },
            focus_points: Vec::new(),
        };
    };

    let summary = value
        .get("summary")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .unwrap_or(EMPTY_SUMMARY)
        .to_string();

    let focus_points = value
        .get("focus_points")
        .and_then(Value::as_array)
        .map(|points| {
            points
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default();

    WeeklySummary {
        summary,
        focus_points,
    }
}
