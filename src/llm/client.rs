use std::time::Instant;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::dto::{ChatCompletionRequest, ChatCompletionResponse, ChatMessage};
use super::{Completion, CompletionRequest, LlmClient, LlmError, TokenUsage};
use crate::config::LlmConfig;

/// Chat-completions client for OpenAI-compatible providers.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: Option<String>,
    model: String,
    endpoint: String,
}

impl OpenAiClient {
    pub fn new(config: &LlmConfig) -> anyhow::Result<Self> {
        let http = Client::builder().build()?;
        if config.api_key.is_none() {
            warn!("no LLM API key configured; LLM calls will fail over to placeholders");
        }
        Ok(Self {
            http,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::NotConfigured)?;

        let payload = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(request.system),
                ChatMessage::user(request.prompt),
            ],
            response_format: Some(request.format.to_wire()),
            temperature: Some(request.temperature),
        };

        let started = Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "failed to read error body".to_string());
            return Err(LlmError::Api { status, body });
        }

        let parsed = response.json::<ChatCompletionResponse>().await?;
        let latency_ms = started.elapsed().as_millis() as u64;

        let usage = parsed.usage.unwrap_or_default();
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::EmptyResponse)?;
        let finish_reason = choice.finish_reason.unwrap_or_default();
        if finish_reason == "length" {
            warn!(task = request.task.name(), "llm reply truncated at the token limit");
        }
        let content = choice
            .message
            .content
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        debug!(
            task = request.task.name(),
            model = parsed.model.as_deref().unwrap_or(&self.model),
            finish_reason = finish_reason.as_str(),
            tokens_prompt = usage.prompt_tokens,
            tokens_completion = usage.completion_tokens,
            latency_ms,
            "llm completion"
        );

        Ok(Completion {
            content,
            usage: TokenUsage {
                prompt: usage.prompt_tokens,
                completion: usage.completion_tokens,
                total: usage.total_tokens,
            },
            latency_ms,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmTask, ResponseFormat};

    fn config(api_key: Option<&str>) -> LlmConfig {
        LlmConfig {
            api_key: api_key.map(str::to_string),
            model: "gpt-4o-mini".into(),
            base_url: "https://api.example.test/v1/".into(),
        }
    }

    #[test]
    fn builds_endpoint_without_double_slash() {
        let client = OpenAiClient::new(&config(Some("k"))).unwrap();
        assert_eq!(client.endpoint, "https://api.example.test/v1/chat/completions");
        assert!(client.is_configured());
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let client = OpenAiClient::new(&config(None)).unwrap();
        assert!(!client.is_configured());
        let err = client
            .complete(CompletionRequest {
                task: LlmTask::QueryValidation,
                system: "s".into(),
                prompt: "p".into(),
                temperature: 0.3,
                format: ResponseFormat::JsonObject,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured));
    }
}
