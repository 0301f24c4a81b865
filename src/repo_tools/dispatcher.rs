use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::repo_tools::logging::log_tool_call;
use crate::repo_tools::remote::*;
use crate::repo_tools::schemas::{catalog_tools, AccessRole, RepoTool};

pub use crate::repo_tools::schemas::tool_catalog;

pub const WRITE_DENIED: &str =
    "Error: Write access denied. You have read-only access. Switch to Developer Mode to make changes.";

#[derive(Deserialize)]
struct ReadFileArgs {
    path: String,
    #[serde(default = "default_branch")]
    branch: String,
}

#[derive(Deserialize)]
struct ListDirectoryArgs {
    #[serde(default)]
    path: String,
    #[serde(default = "default_branch")]
    branch: String,
}

#[derive(Deserialize)]
struct WriteFileArgs {
    path: String,
    content: String,
    commit_message: String,
    branch: String,
}

#[derive(Deserialize)]
struct PullRequestArgs {
    title: String,
    body: String,
    head_branch: String,
    #[serde(default = "default_branch")]
    base_branch: String,
}

/// Run one tool call for `role` and return the text the assistant will see.
///
/// Never fails: unknown tools, refused writes, bad arguments and repository
/// errors all come back as `Error: ...` text.
pub async fn dispatch_repo_tool(
    repo: &dyn RemoteRepository,
    role: AccessRole,
    name: &str,
    args: &Value,
) -> String {
    let result = match RepoTool::parse(name) {
        Some(tool) if tool.is_write() && !role.allows_writes() => WRITE_DENIED.to_string(),
        Some(tool) if catalog_tools(role).contains(&tool) => {
            match execute(repo, tool, args).await {
                Ok(text) => text,
                Err(e) => format!("Error executing {name}: {e}"),
            }
        }
        _ => format!("Error: Unknown tool: {name}"),
    };

    log_tool_call(name, role, args, result)
}

async fn execute(repo: &dyn RemoteRepository, tool: RepoTool, args: &Value) -> Result<String, String> {
    match tool {
        RepoTool::ReadFile => {
            let a: ReadFileArgs = parse_args(tool, args)?;
            let file = repo.read_file(&a.path, &a.branch).await.map_err(|e| e.to_string())?;
            Ok(format!("File: {}\n\n```\n{}\n```", file.path, file.content))
        }
        RepoTool::ListDirectory => {
            let a: ListDirectoryArgs = parse_args(tool, args)?;
            let items = repo
                .list_directory(&a.path, &a.branch)
                .await
                .map_err(|e| e.to_string())?;
            let shown = if a.path.is_empty() { "/" } else { a.path.as_str() };
            let lines: Vec<String> = items
                .iter()
                .map(|item| {
                    let marker = if item.kind == EntryKind::Dir { "[dir] " } else { "[file]" };
                    format!("{marker} {}", item.name)
                })
                .collect();
            Ok(format!("Contents of {shown}:\n{}", lines.join("\n")))
        }
        RepoTool::CreateOrUpdateFile => {
            let a: WriteFileArgs = parse_args(tool, args)?;
            let request = WriteFileRequest {
                path: a.path,
                content: a.content,
                message: a.commit_message,
                branch: a.branch,
                create_branch: true,
                base_branch: default_branch(),
            };
            let written = repo.write_file(&request).await.map_err(|e| e.to_string())?;
            Ok(format!(
                "File {}: {}\nBranch: {}\nCommit: {}",
                if written.created { "created" } else { "updated" },
                written.path,
                written.branch,
                written.commit_url
            ))
        }
        RepoTool::CreatePullRequest => {
            let a: PullRequestArgs = parse_args(tool, args)?;
            let pr = repo
                .create_pull_request(&a.title, &a.body, &a.head_branch, &a.base_branch)
                .await
                .map_err(|e| e.to_string())?;
            Ok(format!(
                "Pull Request created!\nPR #{}: {}\nURL: {}",
                pr.number, pr.title, pr.html_url
            ))
        }
    }
}

fn parse_args<T: DeserializeOwned>(tool: RepoTool, args: &Value) -> Result<T, String> {
    serde_json::from_value(args.clone())
        .map_err(|e| format!("invalid arguments for {}: {}", tool.name(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{FakeRepo, RepoCall};
    use serde_json::json;

    #[tokio::test]
    async fn test_restricted_write_refused_without_remote_call() {
        let repo = FakeRepo::default();
        let args = json!({
            "path": "README.md",
            "content": "x",
            "commit_message": "m",
            "branch": "ai/x"
        });

        let out = dispatch_repo_tool(&repo, AccessRole::Restricted, "create_or_update_file", &args).await;
        assert!(out.contains("read-only"));

        let out = dispatch_repo_tool(
            &repo,
            AccessRole::Restricted,
            "create_pull_request",
            &json!({"title": "t", "body": "b", "head_branch": "ai/x"}),
        )
        .await;
        assert!(out.contains("read-only"));
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_tool_is_text() {
        let repo = FakeRepo::default();
        let out = dispatch_repo_tool(&repo, AccessRole::Privileged, "delete_repo", &json!({})).await;
        assert_eq!(out, "Error: Unknown tool: delete_repo");
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_read_file_renders_content() {
        let repo = FakeRepo::with_file("src/lib.rs", "pub fn x() {}");
        let out = dispatch_repo_tool(&repo, AccessRole::Restricted, "read_file", &json!({"path": "src/lib.rs"})).await;
        assert!(out.starts_with("File: src/lib.rs"));
        assert!(out.contains("pub fn x() {}"));
        assert_eq!(repo.calls(), vec![RepoCall::Read("src/lib.rs".into(), "main".into())]);
    }

    #[tokio::test]
    async fn test_repository_error_becomes_text() {
        let repo = FakeRepo::default();
        let out = dispatch_repo_tool(&repo, AccessRole::Restricted, "read_file", &json!({"path": "missing/path.txt"})).await;
        assert!(out.starts_with("Error executing read_file: Not found"));
    }

    #[tokio::test]
    async fn test_missing_argument_is_text() {
        let repo = FakeRepo::default();
        let out = dispatch_repo_tool(&repo, AccessRole::Restricted, "read_file", &json!({})).await;
        assert!(out.contains("invalid arguments for read_file"));
        assert!(repo.calls().is_empty());
    }

    #[tokio::test]
    async fn test_privileged_write_creates_branch_from_main() {
        let repo = FakeRepo::default();
        let args = json!({
            "path": "docs/new.md",
            "content": "hello",
            "commit_message": "add doc",
            "branch": "ai/docs"
        });
        let out = dispatch_repo_tool(&repo, AccessRole::Privileged, "create_or_update_file", &args).await;
        assert!(out.starts_with("File created: docs/new.md"));

        match &repo.calls()[0] {
            RepoCall::Write(request) => {
                assert!(request.create_branch);
                assert_eq!(request.base_branch, "main");
                assert_eq!(request.branch, "ai/docs");
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_list_directory_marks_dirs() {
        let repo = FakeRepo::with_file("src/lib.rs", "");
        let out = dispatch_repo_tool(&repo, AccessRole::Restricted, "list_directory", &json!({})).await;
        assert!(out.starts_with("Contents of /:"));
        assert!(out.contains("[dir]  src"));
    }
}
