use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Who is asking. Wire names from the chat front end are accepted as aliases:
/// `developer` means privileged, anything else is restricted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", rename_all = "lowercase")]
pub enum AccessRole {
    #[default]
    Restricted,
    Privileged,
}

impl From<String> for AccessRole {
    fn from(s: String) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "developer" | "privileged" => AccessRole::Privileged,
            _ => AccessRole::Restricted,
        }
    }
}

impl AccessRole {
    pub fn allows_writes(self) -> bool {
        self == AccessRole::Privileged
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AccessRole::Restricted => "restricted",
            AccessRole::Privileged => "privileged",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepoTool {
    ReadFile,
    ListDirectory,
    CreateOrUpdateFile,
    CreatePullRequest,
}

impl RepoTool {
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "read_file" => Some(RepoTool::ReadFile),
            "list_directory" => Some(RepoTool::ListDirectory),
            "create_or_update_file" => Some(RepoTool::CreateOrUpdateFile),
            "create_pull_request" => Some(RepoTool::CreatePullRequest),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            RepoTool::ReadFile => "read_file",
            RepoTool::ListDirectory => "list_directory",
            RepoTool::CreateOrUpdateFile => "create_or_update_file",
            RepoTool::CreatePullRequest => "create_pull_request",
        }
    }

    pub fn is_write(self) -> bool {
        matches!(self, RepoTool::CreateOrUpdateFile | RepoTool::CreatePullRequest)
    }

    fn schema(self, role: AccessRole) -> Value {
        match self {
            RepoTool::ReadFile => read_file_schema(role),
            RepoTool::ListDirectory => list_directory_schema(),
            RepoTool::CreateOrUpdateFile => create_or_update_file_schema(),
            RepoTool::CreatePullRequest => create_pull_request_schema(),
        }
    }
}

const FULL_CATALOG: &[RepoTool] = &[
    RepoTool::ReadFile,
    RepoTool::ListDirectory,
    RepoTool::CreateOrUpdateFile,
    RepoTool::CreatePullRequest,
];

const RESTRICTED_CATALOG: &[RepoTool] = &[RepoTool::ReadFile, RepoTool::ListDirectory];

/// Tools offered to the provider for `role`.
pub fn catalog_tools(role: AccessRole) -> &'static [RepoTool] {
    match role {
        AccessRole::Privileged => FULL_CATALOG,
        AccessRole::Restricted => RESTRICTED_CATALOG,
    }
}

/// Function-calling definitions for `role`, in catalog order.
pub fn tool_catalog(role: AccessRole) -> Vec<Value> {
    catalog_tools(role).iter().map(|tool| tool.schema(role)).collect()
}

fn read_file_schema(role: AccessRole) -> Value {
    let description = if role.allows_writes() {
        "Read a file from the GitHub repository. Use this to view current code before making changes."
    } else {
        "Read a file from the GitHub repository. Use this to view current code."
    };
    json!({
        "type": "function",
        "function": {
            "name": "read_file",
            "description": description,
            "parameters": {
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The file path relative to repository root, e.g., 'frontend/src/app/page.tsx'"
                    },
                    "branch": {
                        "type": "string",
                        "description": "The branch to read from. Default is 'main'",
                        "default": "main"
                    }
                },
                "required": ["path"]
            }
        }
    })
}

fn list_directory_schema() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": "list_directory",
            "description": "List files and folders in a directory of the repository",
            "parameters": {
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The directory path relative to repository root, e.g., 'frontend/src/components'",
                        "default": ""
                    },
                    "branch": {
                        "type": "string",
                        "description": "The branch to list from. Default is 'main'",
                        "default": "main"
                    }
                },
                "required": []
            }
        }
    })
}

fn create_or_update_file_schema() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": "create_or_update_file",
            "description": "Create a new file or update an existing file in the repository. This will create a new branch and commit the changes.",
            "parameters": {
                "type": "object",
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "The file path relative to repository root"
                    },
                    "content": {
                        "type": "string",
                        "description": "The complete file content to write"
                    },
                    "commit_message": {
                        "type": "string",
                        "description": "A descriptive commit message"
                    },
                    "branch": {
                        "type": "string",
                        "description": "The branch name to create/update. Use a descriptive name like 'ai/add-dark-mode'"
                    }
                },
                "required": ["path", "content", "commit_message", "branch"]
            }
        }
    })
}

fn create_pull_request_schema() -> Value {
    json!({
        "type": "function",
        "function": {
            "name": "create_pull_request",
            "description": "Create a pull request to merge changes from a feature branch into main",
            "parameters": {
                "type": "object",
                "properties": {
                    "title": {
                        "type": "string",
                        "description": "The PR title"
                    },
                    "body": {
                        "type": "string",
                        "description": "The PR description explaining the changes"
                    },
                    "head_branch": {
                        "type": "string",
                        "description": "The branch containing the changes"
                    },
                    "base_branch": {
                        "type": "string",
                        "description": "The branch to merge into. Default is 'main'",
                        "default": "main"
                    }
                },
                "required": ["title", "body", "head_branch"]
            }
        }
    })
}
