//! Provider adapters share one seam: [`ChatProvider::complete`].
//!
//! Tool-capable backends receive the full conversation plus tool definitions;
//! single-shot backends fold the system turn and the user turn into one call.

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::llm::anthropic::AnthropicClient;
use crate::llm::client::LlmClient;
use crate::llm::google::GoogleClient;
use crate::llm::types::*;

pub const TEMPERATURE: f64 = 0.7;
pub const MAX_OUTPUT_TOKENS: i64 = 4096;
pub const TOOL_LOOP_TIMEOUT: Duration = Duration::from_secs(180);
pub const SINGLE_SHOT_TIMEOUT: Duration = Duration::from_secs(120);

#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &'static str;

    fn supports_tools(&self) -> bool;

    async fn complete(
        &self,
        conversation: &[ChatMessage],
        tools: Option<&[Value]>,
    ) -> Result<LlmResponse, LlmError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Xai,
    Openai,
    Anthropic,
    Google,
}

impl Provider {
    pub fn as_str(self) -> &'static str {
        match self {
            Provider::Xai => "xai",
            Provider::Openai => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Google => "google",
        }
    }

    pub fn default_model(self) -> &'static str {
        match self {
            Provider::Xai => "grok-3",
            Provider::Openai => "gpt-4",
            Provider::Anthropic => "claude-3-sonnet-20240229",
            Provider::Google => "gemini-pro",
        }
    }

    pub fn supports_tools(self) -> bool {
        matches!(self, Provider::Xai | Provider::Openai)
    }
}

/// Base URLs for each backend plus the per-call timeouts. Overridable so
/// deployments and tests can point at a proxy or a local double.
#[derive(Debug, Clone)]
pub struct ProviderEndpoints {
    pub xai: String,
    pub openai: String,
    pub anthropic: String,
    pub google: String,
    /// Tool-capable backends while the relay loop is active.
    pub tool_loop_timeout: Duration,
    pub single_shot_timeout: Duration,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            xai: "https://api.x.ai/v1".into(),
            openai: "https://api.openai.com/v1".into(),
            anthropic: "https://api.anthropic.com/v1".into(),
            google: "https://generativelanguage.googleapis.com/v1".into(),
            tool_loop_timeout: TOOL_LOOP_TIMEOUT,
            single_shot_timeout: SINGLE_SHOT_TIMEOUT,
        }
    }
}

impl ProviderEndpoints {
    fn base_url(&self, provider: Provider) -> &str {
        match provider {
            Provider::Xai => &self.xai,
            Provider::Openai => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::Google => &self.google,
        }
    }
}

/// Build the adapter for `provider`. `tool_mode` only matters for the
/// backends that can run the tool loop; it picks the longer timeout.
pub fn provider_for(
    provider: Provider,
    endpoints: &ProviderEndpoints,
    api_key: &str,
    model: Option<&str>,
    tool_mode: bool,
) -> Result<Box<dyn ChatProvider>, LlmError> {
    if api_key.trim().is_empty() {
        return Err(LlmError::MissingApiKey(provider.as_str()));
    }

    let config = LlmConfig {
        provider_name: provider.as_str().to_string(),
        base_url: endpoints.base_url(provider).to_string(),
        model: model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(provider.default_model())
            .to_string(),
        temperature: TEMPERATURE,
        max_tokens: MAX_OUTPUT_TOKENS,
        timeout: if tool_mode && provider.supports_tools() {
            endpoints.tool_loop_timeout
        } else {
            endpoints.single_shot_timeout
        },
    };
    let api_key = api_key.to_string();

    Ok(match provider {
        Provider::Xai => Box::new(LlmClient::new(config, api_key, "xai")?),
        Provider::Openai => Box::new(LlmClient::new(config, api_key, "openai")?),
        Provider::Anthropic => Box::new(AnthropicClient::new(config, api_key)?),
        Provider::Google => Box::new(GoogleClient::new(config, api_key)?),
    })
}

pub(crate) fn http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Http(format!("failed to build HTTP client: {e}")))
}

/// Send a request and decode a JSON body, turning non-2xx into [`LlmError::Api`].
pub(crate) async fn send_json(request: RequestBuilder) -> Result<Value, LlmError> {
    let response: Response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(LlmError::Api {
            status: status.as_u16(),
            message,
        });
    }
    Ok(response.json::<Value>().await?)
}

/// Split a single-shot conversation into its system text and user text.
pub(crate) fn single_shot_parts(conversation: &[ChatMessage]) -> (String, String) {
    let system = conversation
        .iter()
        .filter(|m| m.role == "system")
        .map(ChatMessage::text)
        .collect::<Vec<_>>()
        .join("\n\n");
    let user = conversation
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.text().to_string())
        .unwrap_or_default();
    (system, user)
}

/// Follow `path` through a JSON envelope and return the string at its end.
pub(crate) fn text_at(envelope: &Value, path: &[PathStep]) -> Result<String, LlmError> {
    let mut cursor = envelope;
    for step in path {
        cursor = match step {
            PathStep::Key(key) => cursor.get(*key),
            PathStep::Index(index) => cursor.get(*index),
        }
        .ok_or_else(|| LlmError::InvalidResponse(format!("missing {step:?} in provider response")))?;
    }
    cursor
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| LlmError::InvalidResponse("answer is not a string".into()))
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum PathStep {
    Key(&'static str),
    Index(usize),
}
