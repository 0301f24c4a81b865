use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::secrets::SecretError;

pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Wrong type: {0}")]
    WrongType(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Upstream error {status}: {message}")]
    Upstream { status: u16, message: String },
    #[error("Repository API timed out")]
    Timeout,
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid path: {0}")]
    InvalidPath(String),
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Invalid response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for RepoError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            RepoError::Timeout
        } else if e.is_decode() {
            RepoError::Decode(e.to_string())
        } else {
            RepoError::Http(e.to_string())
        }
    }
}

impl From<SecretError> for RepoError {
    fn from(e: SecretError) -> Self {
        RepoError::Configuration(format!("Failed to get GitHub token: {e}"))
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RemoteFile {
    pub path: String,
    pub branch: String,
    pub content: String,
    pub sha: String,
    pub size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    File,
    Dir,
    Symlink,
    Submodule,
    #[serde(other)]
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DirectoryItem {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(default)]
    pub size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WriteFileRequest {
    pub path: String,
    pub content: String,
    pub message: String,
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default)]
    pub create_branch: bool,
    #[serde(default = "default_branch")]
    pub base_branch: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WriteResult {
    pub path: String,
    pub sha: String,
    pub branch: String,
    pub commit_url: String,
    /// False when an existing file was replaced.
    #[serde(skip)]
    pub created: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PullRequest {
    pub number: u64,
    pub url: String,
    pub html_url: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Branch {
    pub name: String,
    pub protected: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CommitSummary {
    pub sha: String,
    pub message: String,
    pub author: String,
    pub date: String,
}

pub fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

/// The four operations the assistant may drive through tool calls.
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    async fn read_file(&self, path: &str, branch: &str) -> Result<RemoteFile, RepoError>;

    async fn list_directory(&self, path: &str, branch: &str) -> Result<Vec<DirectoryItem>, RepoError>;

    async fn write_file(&self, request: &WriteFileRequest) -> Result<WriteResult, RepoError>;

    async fn create_pull_request(
        &self,
        title: &str,
        body: &str,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<PullRequest, RepoError>;
}
