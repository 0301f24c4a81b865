pub mod relay;

pub use relay::{run_chat, ChatRequest, RelayOutcome};
