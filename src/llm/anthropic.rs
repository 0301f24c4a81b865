use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::llm::provider::{http_client, send_json, single_shot_parts, text_at, ChatProvider, PathStep};
use crate::llm::types::*;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const ANSWER_PATH: [PathStep; 3] = [PathStep::Key("content"), PathStep::Index(0), PathStep::Key("text")];

/// Anthropic Messages API. Single-shot: tool definitions are never sent.
pub struct AnthropicClient {
    http: Client,
    config: LlmConfig,
    api_key: String,
}

impl AnthropicClient {
    pub fn new(config: LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let http = http_client(config.timeout)?;
        Ok(Self { http, config, api_key })
    }
}

#[async_trait]
impl ChatProvider for AnthropicClient {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn supports_tools(&self) -> bool {
        false
    }

    async fn complete(
        &self,
        conversation: &[ChatMessage],
        _tools: Option<&[Value]>,
    ) -> Result<LlmResponse, LlmError> {
        let (system, user) = single_shot_parts(conversation);
        let body = json!({
            "model": self.config.model,
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
            "system": system,
            "messages": [{ "role": "user", "content": user }],
        });

        let url = format!("{}/messages", self.config.base_url.trim_end_matches('/'));
        let envelope = send_json(
            self.http
                .post(&url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&body),
        )
        .await?;

        Ok(LlmResponse::text(text_at(&envelope, &ANSWER_PATH)?))
    }
}
