//! Opaque LLM capability: send a structured prompt, get back a JSON-ish
//! completion with token counts and latency.

mod client;
pub mod dto;
#[cfg(test)]
pub mod testing;

use async_trait::async_trait;
use serde::Serialize;

use crate::generator::MealType;

pub use client::OpenAiClient;

/// What a completion is for. Used for log fields and by test doubles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LlmTask {
    QueryValidation,
    DayPlan { day: u32, meal_types: Vec<MealType> },
    SingleMeal { meal_type: MealType },
}

impl LlmTask {
    pub fn name(&self) -> &'static str {
        match self {
            LlmTask::QueryValidation => "query_validation",
            LlmTask::DayPlan { .. } => "day_plan",
            LlmTask::SingleMeal { .. } => "single_meal",
        }
    }
}

#[derive(Debug, Clone)]
pub enum ResponseFormat {
    JsonObject,
    JsonSchema {
        name: &'static str,
        schema: serde_json::Value,
    },
}

impl ResponseFormat {
    pub fn to_wire(&self) -> serde_json::Value {
        match self {
            ResponseFormat::JsonObject => serde_json::json!({ "type": "json_object" }),
            ResponseFormat::JsonSchema { name, schema } => serde_json::json!({
                "type": "json_schema",
                "json_schema": { "name": name, "schema": schema }
            }),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub task: LlmTask,
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub format: ResponseFormat,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TokenUsage {
    pub prompt: u64,
    pub completion: u64,
    pub total: u64,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
    pub latency_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM provider is not configured")]
    NotConfigured,
    #[error("LLM transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("LLM provider returned {status}: {body}")]
    Api { status: u16, body: String },
    #[error("LLM completion had no content")]
    EmptyResponse,
    #[error("LLM completion is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    /// False when no provider key is set; callers skip optional LLM phases.
    fn is_configured(&self) -> bool {
        true
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError>;
}

/// Slice out the JSON value of a completion, ignoring markdown fences or
/// chatter around it. The value starts at the first `{` or `[` and ends at
/// its matching closer; string contents are skipped while matching.
pub fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(start) = trimmed.find(|c: char| c == '{' || c == '[') else {
        return trimmed;
    };
    let body = &trimmed[start..];

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in body.char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return &body[..=i];
                }
            }
            _ => {}
        }
    }
    // unbalanced: hand back the tail and let the decoder report it
    body
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extract_json_strips_code_fences() {
        let raw = "```json\n{\"meals\": []}\n```";
        assert_eq!(extract_json(raw), "{\"meals\": []}");
    }

    #[test]
    fn extract_json_keeps_top_level_arrays() {
        let raw = "```json\n[{\"a\": 1}, {\"b\": \"}]\"}]\n```";
        assert_eq!(extract_json(raw), "[{\"a\": 1}, {\"b\": \"}]\"}]");
        let value: serde_json::Value = serde_json::from_str(extract_json(raw)).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[test]
    fn extract_json_ignores_trailing_chatter() {
        let raw = "Here you go: {\"meals\": [{\"x\": \"{\"}]} hope that helps {}";
        assert_eq!(extract_json(raw), "{\"meals\": [{\"x\": \"{\"}]}");
    }

    #[test]
    fn extract_json_leaves_plain_text_alone() {
        assert_eq!(extract_json("  not json "), "not json");
    }

    #[test]
    fn schema_format_wraps_name_and_schema() {
        let format = ResponseFormat::JsonSchema {
            name: "query_validation",
            schema: serde_json::json!({ "type": "object" }),
        };
        let wire = format.to_wire();
        assert_eq!(wire["type"], "json_schema");
        assert_eq!(wire["json_schema"]["name"], "query_validation");
        assert_eq!(ResponseFormat::JsonObject.to_wire()["type"], "json_object");
    }
}
