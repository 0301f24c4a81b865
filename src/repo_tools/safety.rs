use crate::repo_tools::remote::RepoError;

/// Normalize a repository path so it stays under the repository root.
///
/// Backslashes become `/`, empty and `.` segments are dropped, and a leading
/// `/` is treated as the root. Any `..` segment is rejected outright.
pub fn normalize_repo_path(rel_path: &str) -> Result<String, RepoError> {
    let normalized = rel_path.replace('\\', "/");
    let mut clean = Vec::new();
    for comp in normalized.split('/') {
        match comp {
            "" | "." => continue,
            ".." => return Err(RepoError::InvalidPath(rel_path.to_string())),
            _ if comp.chars().any(char::is_control) => {
                return Err(RepoError::InvalidPath(rel_path.to_string()))
            }
            _ => clean.push(comp),
        }
    }
    Ok(clean.join("/"))
}

/// Cut `s` to `max_chars` characters. The flag is set when something was dropped.
pub fn truncate_string(s: &str, max_chars: usize) -> (String, bool) {
    if s.chars().count() <= max_chars {
        (s.to_string(), false)
    } else {
        let truncated: String = s.chars().take(max_chars).collect();
        (truncated, true)
    }
}
