use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Clone)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_format: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionChoice {
    pub message: ChatCompletionResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChatCompletionUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChatCompletionResponse {
    #[serde(default)]
    pub model: Option<String>,
    pub choices: Vec<ChatCompletionChoice>,
    #[serde(default)]
    pub usage: Option<ChatCompletionUsage>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_omits_unset_options() {
        let req = ChatCompletionRequest {
            model: "gpt-4o-mini".into(),
            messages: vec![ChatMessage::system("s"), ChatMessage::user("u")],
            response_format: None,
            temperature: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("response_format").is_none());
        assert!(json.get("temperature").is_none());
        assert_eq!(json["messages"][1]["role"], "user");
    }

    #[test]
    fn response_tolerates_missing_usage_and_content() {
        let raw = r#"{"choices":[{"message":{"role":"assistant"},"finish_reason":"stop"}]}"#;
        let resp: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert!(resp.usage.is_none());
        assert!(resp.choices[0].message.content.is_none());
        assert_eq!(resp.choices[0].finish_reason.as_deref(), Some("stop"));
        assert!(resp.model.is_none());
    }

    #[test]
    fn response_reports_model_and_finish_reason() {
        let raw = r#"{"model":"gpt-4o-mini-2024-07-18","choices":[{"message":{"content":"{}"},"finish_reason":"length"}]}"#;
        let resp: ChatCompletionResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(resp.model.as_deref(), Some("gpt-4o-mini-2024-07-18"));
        assert_eq!(resp.choices[0].finish_reason.as_deref(), Some("length"));
    }
}
