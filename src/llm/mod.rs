pub mod anthropic;
pub mod client;
pub mod google;
pub mod provider;
pub mod types;

pub use client::LlmClient;
pub use provider::{provider_for, ChatProvider, Provider, ProviderEndpoints};
pub use types::{ChatMessage, LlmConfig, LlmError, LlmResponse, ToolCall, ToolFunction};
