use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::llm::provider::{http_client, ChatProvider};
use crate::llm::types::*;

/// Client for OpenAI-compatible `/chat/completions` endpoints (OpenAI, xAI).
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
    api_key: String,
    name: &'static str,
}

impl LlmClient {
    pub fn new(config: LlmConfig, api_key: String, name: &'static str) -> Result<Self, LlmError> {
        let http = http_client(config.timeout)?;
        Ok(Self { http, config, api_key, name })
    }

    pub async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: Option<&[Value]>,
    ) -> Result<LlmResponse, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::MissingApiKey(self.name));
        }

        let tools = tools.filter(|t| !t.is_empty());
        let request = OpenAIChatRequest {
            model: &self.config.model,
            messages,
            tools,
            tool_choice: tools.map(|_| "auto"),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));

        let response = self.http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let result: OpenAIChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        if let Some(choice) = result.choices.into_iter().next() {
            tracing::debug!(
                provider = self.name,
                model = %self.config.model,
                finish_reason = choice.finish_reason.as_deref().unwrap_or(""),
                "chat completion received"
            );
            Ok(LlmResponse {
                content: choice.message.content,
                tool_calls: choice.message.tool_calls,
            })
        } else {
            Err(LlmError::InvalidResponse("No choices in response".to_string()))
        }
    }
}

#[async_trait]
impl ChatProvider for LlmClient {
    fn name(&self) -> &'static str {
        self.name
    }

    fn supports_tools(&self) -> bool {
        true
    }

    async fn complete(
        &self,
        conversation: &[ChatMessage],
        tools: Option<&[Value]>,
    ) -> Result<LlmResponse, LlmError> {
        self.chat_with_tools(conversation, tools).await
    }
}
