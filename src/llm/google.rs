use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

use crate::llm::provider::{http_client, send_json, single_shot_parts, text_at, ChatProvider, PathStep};
use crate::llm::types::*;

const ANSWER_PATH: [PathStep; 6] = [
    PathStep::Key("candidates"),
    PathStep::Index(0),
    PathStep::Key("content"),
    PathStep::Key("parts"),
    PathStep::Index(0),
    PathStep::Key("text"),
];

/// Gemini `generateContent`. The key travels as a query parameter.
pub struct GoogleClient {
    http: Client,
    config: LlmConfig,
    api_key: String,
}

impl GoogleClient {
    pub fn new(config: LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let http = http_client(config.timeout)?;
        Ok(Self { http, config, api_key })
    }
}

#[async_trait]
impl ChatProvider for GoogleClient {
    fn name(&self) -> &'static str {
        "google"
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
            "contents": [{
                "parts": [{ "text": format!("{system}\n\nUser: {user}") }]
            }],
            "generationConfig": {
                "temperature": self.config.temperature,
                "maxOutputTokens": self.config.max_tokens,
            },
        });

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model,
        );
        let envelope = send_json(
            self.http
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body),
        )
        .await?;

        Ok(LlmResponse::text(text_at(&envelope, &ANSWER_PATH)?))
    }
}
