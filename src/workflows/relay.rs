use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::llm::{provider_for, ChatMessage, ChatProvider, LlmError, Provider, ProviderEndpoints, ToolCall};
use crate::repo_tools::schemas::{catalog_tools, AccessRole};
use crate::repo_tools::{dispatch_repo_tool, tool_catalog, RemoteRepository};

pub const MAX_PROVIDER_ROUND_TRIPS: usize = 10;
pub const MAX_ITERATIONS_MARKER: &str = "Maximum iterations reached";

#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    pub provider: Provider,
    pub api_key: String,
    pub message: String,
    pub system_prompt: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default = "default_true")]
    pub enable_tools: bool,
    #[serde(default)]
    pub role: AccessRole,
}

fn default_true() -> bool { true }

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ExecutedToolCall {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Debug)]
pub struct RelayOutcome {
    pub content: String,
    pub round_trips: usize,
    pub tool_calls: Vec<ExecutedToolCall>,
    pub conversation: Vec<ChatMessage>,
}

#[derive(Debug)]
enum RelayState {
    AwaitingProvider,
    ProcessingToolCalls(Vec<ToolCall>),
    Done(String),
}

/// Handle one chat request end to end: pick the adapter, seed the
/// conversation, and run the loop (or the single round-trip).
pub async fn run_chat(
    request: &ChatRequest,
    endpoints: &ProviderEndpoints,
    repo: &dyn RemoteRepository,
) -> Result<RelayOutcome, LlmError> {
    let tool_mode = request.enable_tools && request.provider.supports_tools();
    let provider = provider_for(
        request.provider,
        endpoints,
        &request.api_key,
        request.model.as_deref(),
        tool_mode,
    )?;
    relay(provider.as_ref(), repo, request, tool_mode).await
}

/// Drive `provider` until it stops asking for tools or the round-trip cap is hit.
pub async fn relay(
    provider: &dyn ChatProvider,
    repo: &dyn RemoteRepository,
    request: &ChatRequest,
    tool_mode: bool,
) -> Result<RelayOutcome, LlmError> {
    let tool_mode = tool_mode && provider.supports_tools();
    let tools = tool_mode.then(|| tool_catalog(request.role));
    let mut conversation = build_initial_messages(request, tool_mode);

    let mut state = RelayState::AwaitingProvider;
    let mut round_trips = 0;
    let mut last_assistant_text: Option<String> = None;
    let mut executed = Vec::new();

    let content = loop {
        state = match state {
            RelayState::AwaitingProvider => {
                if round_trips >= MAX_PROVIDER_ROUND_TRIPS {
                    tracing::warn!(provider = provider.name(), round_trips, "relay iteration cap reached");
                    RelayState::Done(
                        last_assistant_text
                            .take()
                            .unwrap_or_else(|| MAX_ITERATIONS_MARKER.to_string()),
                    )
                } else {
                    round_trips += 1;
                    let response = provider.complete(&conversation, tools.as_deref()).await?;
                    let text = response.content.clone().filter(|c| !c.trim().is_empty());

                    match response.pending_tool_calls().filter(|_| tool_mode) {
                        Some(calls) => {
                            tracing::debug!(
                                provider = provider.name(),
                                round_trip = round_trips,
                                tool_calls = calls.len(),
                                "provider requested tools"
                            );
                            let calls = calls.to_vec();
                            if text.is_some() {
                                last_assistant_text = text;
                            }
                            conversation.push(ChatMessage::assistant_with_tools(
                                response.content,
                                calls.clone(),
                            ));
                            RelayState::ProcessingToolCalls(calls)
                        }
                        None => {
                            let final_text = text
                                .or(last_assistant_text.take())
                                .unwrap_or_else(|| MAX_ITERATIONS_MARKER.to_string());
                            conversation.push(ChatMessage::assistant(final_text.clone()));
                            RelayState::Done(final_text)
                        }
                    }
                }
            }
            RelayState::ProcessingToolCalls(calls) => {
                // In emission order: later calls may rely on earlier writes.
                for call in calls {
                    let (arguments, result) = match parse_arguments(&call.function.arguments) {
                        Ok(args) => {
                            let result =
                                dispatch_repo_tool(repo, request.role, &call.function.name, &args).await;
                            (args, result)
                        }
                        Err(e) => (
                            Value::Null,
                            format!("Error: could not parse arguments for {}: {}", call.function.name, e),
                        ),
                    };
                    conversation.push(ChatMessage::tool(call.id.clone(), result));
                    executed.push(ExecutedToolCall {
                        id: call.id,
                        name: call.function.name,
                        arguments,
                    });
                }
                RelayState::AwaitingProvider
            }
            RelayState::Done(text) => break text,
        };
    };

    tracing::info!(
        provider = provider.name(),
        role = request.role.as_str(),
        round_trips,
        tool_calls = executed.len(),
        "chat relay finished"
    );

    Ok(RelayOutcome {
        content,
        round_trips,
        tool_calls: executed,
        conversation,
    })
}

fn parse_arguments(raw: &str) -> Result<Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(json!({}));
    }
    serde_json::from_str(raw)
}

/// System turn plus user turn. With tools on, the system turn also tells the
/// assistant exactly which repository operations its role permits.
pub fn build_initial_messages(request: &ChatRequest, tool_mode: bool) -> Vec<ChatMessage> {
    let system = if tool_mode {
        format!(
            "{}\n\n{}\n\n{}",
            request.system_prompt,
            request.context,
            capability_disclosure(request.role)
        )
    } else {
        format!("{}\n\n{}", request.system_prompt, request.context)
    };

    vec![ChatMessage::system(system), ChatMessage::user(request.message.clone())]
}

pub fn capability_disclosure(role: AccessRole) -> String {
    let tools: Vec<&str> = catalog_tools(role).iter().map(|t| t.name()).collect();
    match role {
        AccessRole::Privileged => format!(
            r#"You have access to GitHub tools to read and modify the codebase: {tools}.
When asked to make changes:
1. First read the relevant files to understand the current code
2. Create or update files on a new branch (use branch names like 'ai/feature-name')
3. Create a pull request for the changes

Always use tools when making actual code changes. Do not just provide code snippets."#,
            tools = tools.join(", ")
        ),
        AccessRole::Restricted => format!(
            r#"You have READ-ONLY access to the GitHub repository. Your only tools are: {tools}.
You can read any file, list directory contents, and explore the project structure.

You CANNOT make changes to files. If asked to make changes, explain that you can only view files
and provide code suggestions. Tell the user to switch to Developer Mode to make actual changes to the repository."#,
            tools = tools.join(", ")
        ),
    }
}
