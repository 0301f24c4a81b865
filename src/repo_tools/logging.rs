use serde_json::Value;

use crate::repo_tools::safety::truncate_string;
use crate::repo_tools::schemas::AccessRole;

pub const MAX_RESULT_CHARS: usize = 200_000;

/// Record a finished tool call and cap the text fed back to the provider.
pub fn log_tool_call(name: &str, role: AccessRole, args: &Value, result: String) -> String {
    let arg_keys = args
        .as_object()
        .map(|obj| obj.keys().map(String::as_str).collect::<Vec<_>>().join(","))
        .unwrap_or_default();

    let (final_result, truncated) = if result.chars().count() > MAX_RESULT_CHARS {
        let (mut cut, _) = truncate_string(&result, MAX_RESULT_CHARS);
        cut.push_str("\n\n[output truncated]");
        (cut, true)
    } else {
        (result, false)
    };

    let failed = final_result.starts_with("Error");
    tracing::info!(
        tool = name,
        role = role.as_str(),
        args = %arg_keys,
        result_chars = final_result.len(),
        truncated,
        failed,
        "tool_call"
    );

    final_result
}
