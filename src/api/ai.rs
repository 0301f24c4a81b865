use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::error::{ApiError, ApiJson};
use crate::llm::Provider;
use crate::workflows::relay::{run_chat, ChatRequest, ExecutedToolCall};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub content: String,
    pub provider: Provider,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ExecutedToolCall>,
}

pub async fn chat(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    tracing::info!(
        provider = request.provider.as_str(),
        role = request.role.as_str(),
        tools = request.enable_tools,
        "chat request"
    );

    let outcome = run_chat(&request, &state.config.providers, state.github.as_ref()).await?;

    Ok(Json(ChatResponse {
        content: outcome.content,
        provider: request.provider,
        tool_calls: outcome.tool_calls,
    }))
}
