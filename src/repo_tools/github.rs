use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::GitHubSettings;
use crate::repo_tools::remote::*;
use crate::repo_tools::safety::normalize_repo_path;
use crate::secrets::SecretSource;

const ACCEPT: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = concat!("afpi-gateway/", env!("CARGO_PKG_VERSION"));

/// GitHub REST client bound to one owner/repository pair.
pub struct GitHubClient {
    http: Client,
    api_url: String,
    owner: String,
    repo: String,
    secrets: Arc<dyn SecretSource>,
    read_timeout: Duration,
    write_timeout: Duration,
}

#[derive(Deserialize)]
struct ContentEntry {
    #[serde(rename = "type")]
    kind: EntryKind,
    path: String,
    sha: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct GitRef {
    object: GitObject,
}

#[derive(Deserialize)]
struct GitObject {
    sha: String,
}

#[derive(Deserialize)]
struct PutContentResponse {
    content: PutContent,
    commit: PutCommit,
}

#[derive(Deserialize)]
struct PutContent {
    path: String,
    sha: String,
}

#[derive(Deserialize)]
struct PutCommit {
    html_url: String,
}

#[derive(Deserialize)]
struct BranchEntry {
    name: String,
    #[serde(default)]
    protected: bool,
}

#[derive(Deserialize)]
struct CommitEntry {
    sha: String,
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    message: String,
    author: CommitAuthor,
}

#[derive(Deserialize)]
struct CommitAuthor {
    name: String,
    date: String,
}

impl GitHubClient {
    pub fn new(settings: &GitHubSettings, secrets: Arc<dyn SecretSource>) -> Result<Self, RepoError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RepoError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            owner: settings.owner.clone(),
            repo: settings.repo.clone(),
            secrets,
            read_timeout: settings.read_timeout,
            write_timeout: settings.write_timeout,
        })
    }

    fn repo_url(&self, suffix: &str) -> String {
        format!("{}/repos/{}/{}/{}", self.api_url, self.owner, self.repo, suffix)
    }

    fn contents_url(&self, path: &str) -> String {
        if path.is_empty() {
            self.repo_url("contents")
        } else {
            self.repo_url(&format!("contents/{}", encode_segments(path)))
        }
    }

    /// Looked up once per operation; every call of that operation reuses it.
    async fn token(&self) -> Result<String, RepoError> {
        Ok(self.secrets.secret().await?)
    }

    fn authorized(&self, builder: RequestBuilder, token: &str, timeout: Duration) -> RequestBuilder {
        builder
            .bearer_auth(token)
            .header(reqwest::header::ACCEPT, ACCEPT)
            .timeout(timeout)
    }

    async fn get(&self, token: &str, url: &str, query: &[(&str, &str)]) -> Result<Response, RepoError> {
        let request = self.authorized(self.http.get(url).query(query), token, self.read_timeout);
        Ok(request.send().await?)
    }

    async fn send_json(
        &self,
        token: &str,
        builder: RequestBuilder,
        body: &Value,
        timeout: Duration,
    ) -> Result<Response, RepoError> {
        let request = self.authorized(builder.json(body), token, timeout);
        Ok(request.send().await?)
    }

    /// Latest commits on `branch`, newest first.
    pub async fn recent_commits(&self, branch: &str, limit: u32) -> Result<Vec<CommitSummary>, RepoError> {
        let token = self.token().await?;
        let per_page = limit.clamp(1, 100).to_string();
        let response = self
            .get(
                &token,
                &self.repo_url("commits"),
                &[("sha", branch), ("per_page", per_page.as_str())],
            )
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RepoError::NotFound(format!("branch {branch}")));
        }
        let entries: Vec<CommitEntry> = ensure_success(response).await?.json().await?;
        Ok(entries
            .into_iter()
            .map(|c| CommitSummary {
                sha: c.sha.chars().take(7).collect(),
                message: c.commit.message.lines().next().unwrap_or("").to_string(),
                author: c.commit.author.name,
                date: c.commit.author.date,
            })
            .collect())
    }

    pub async fn list_branches(&self) -> Result<Vec<Branch>, RepoError> {
        let token = self.token().await?;
        let response = self
            .get(&token, &self.repo_url("branches"), &[("per_page", "100")])
            .await?;
        let entries: Vec<BranchEntry> = ensure_success(response).await?.json().await?;
        Ok(entries
            .into_iter()
            .map(|b| Branch { name: b.name, protected: b.protected })
            .collect())
    }

    async fn branch_tip(&self, token: &str, branch: &str) -> Result<String, RepoError> {
        let url = self.repo_url(&format!("git/ref/heads/{}", encode_segments(branch)));
        let response = self.get(token, &url, &[]).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RepoError::NotFound(format!("branch {branch}")));
        }
        let git_ref: GitRef = ensure_success(response).await?.json().await?;
        Ok(git_ref.object.sha)
    }

    /// Create `branch` at the tip of `base`. An existing branch is left as is.
    async fn ensure_branch(&self, token: &str, branch: &str, base: &str) -> Result<(), RepoError> {
        let base_sha = self.branch_tip(token, base).await?;
        let response = self
            .send_json(
                token,
                self.http.post(self.repo_url("git/refs")),
                &json!({ "ref": format!("refs/heads/{branch}"), "sha": base_sha }),
                self.write_timeout,
            )
            .await?;

        match response.status() {
            StatusCode::CREATED => {
                tracing::info!(branch, base, "branch created");
                Ok(())
            }
            StatusCode::UNPROCESSABLE_ENTITY => {
                tracing::debug!(branch, "branch already exists");
                Ok(())
            }
            _ => ensure_success(response).await.map(|_| ()),
        }
    }

    /// Current blob sha of `path` on `branch`, or `None` when the file does not exist yet.
    async fn current_sha(&self, token: &str, path: &str, branch: &str) -> Result<Option<String>, RepoError> {
        let response = self
            .get(token, &self.contents_url(path), &[("ref", branch)])
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let body: Value = ensure_success(response).await?.json().await?;
        if body.is_array() {
            return Err(RepoError::WrongType(format!("Path is a directory, not a file: {path}")));
        }
        Ok(body.get("sha").and_then(Value::as_str).map(str::to_string))
    }
}

#[async_trait]
impl RemoteRepository for GitHubClient {
    async fn read_file(&self, path: &str, branch: &str) -> Result<RemoteFile, RepoError> {
        let path = normalize_repo_path(path)?;
        let token = self.token().await?;
        let response = self
            .get(&token, &self.contents_url(&path), &[("ref", branch)])
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(RepoError::NotFound(format!("File not found: {path}")));
        }

        let body: Value = ensure_success(response).await?.json().await?;
        if body.is_array() {
            return Err(RepoError::WrongType(format!("Path is a directory, not a file: {path}")));
        }
        let entry: ContentEntry =
            serde_json::from_value(body).map_err(|e| RepoError::Decode(e.to_string()))?;
        if entry.kind != EntryKind::File {
            return Err(RepoError::WrongType(format!("Path is not a file: {path}")));
        }

        let content = decode_content(entry.content.as_deref().unwrap_or(""))?;
        Ok(RemoteFile {
            path: entry.path,
            branch: branch.to_string(),
            content,
            sha: entry.sha,
            size: entry.size,
        })
    }

    async fn list_directory(&self, path: &str, branch: &str) -> Result<Vec<DirectoryItem>, RepoError> {
        let path = normalize_repo_path(path)?;
        let token = self.token().await?;
        let response = self
            .get(&token, &self.contents_url(&path), &[("ref", branch)])
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            let shown = if path.is_empty() { "/" } else { path.as_str() };
            return Err(RepoError::NotFound(format!("Directory not found: {shown}")));
        }

        let body: Value = ensure_success(response).await?.json().await?;
        if !body.is_array() {
            return Err(RepoError::WrongType(format!("Path is a file, not a directory: {path}")));
        }
        serde_json::from_value(body).map_err(|e| RepoError::Decode(e.to_string()))
    }

    async fn write_file(&self, request: &WriteFileRequest) -> Result<WriteResult, RepoError> {
        let path = normalize_repo_path(&request.path)?;
        if path.is_empty() {
            return Err(RepoError::InvalidPath("file path is empty".into()));
        }

        let token = self.token().await?;
        if request.create_branch {
            self.ensure_branch(&token, &request.branch, &request.base_branch).await?;
        }

        let existing_sha = self.current_sha(&token, &path, &request.branch).await?;

        let mut payload = json!({
            "message": request.message,
            "content": STANDARD.encode(request.content.as_bytes()),
            "branch": request.branch,
        });
        if let Some(sha) = &existing_sha {
            payload["sha"] = json!(sha);
        }

        let response = self
            .send_json(&token, self.http.put(self.contents_url(&path)), &payload, self.write_timeout)
            .await?;
        if matches!(response.status(), StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY) {
            return Err(RepoError::Conflict(error_message(response).await));
        }

        let data: PutContentResponse = ensure_success(response).await?.json().await?;
        tracing::info!(
            path = %data.content.path,
            branch = %request.branch,
            updated = existing_sha.is_some(),
            "file committed"
        );
        Ok(WriteResult {
            path: data.content.path,
            sha: data.content.sha,
            branch: request.branch.clone(),
            commit_url: data.commit.html_url,
            created: existing_sha.is_none(),
        })
    }

    async fn create_pull_request(
        &self,
        title: &str,
        body: &str,
        head_branch: &str,
        base_branch: &str,
    ) -> Result<PullRequest, RepoError> {
        let token = self.token().await?;
        let response = self
            .send_json(
                &token,
                self.http.post(self.repo_url("pulls")),
                &json!({
                    "title": title,
                    "body": body,
                    "head": head_branch,
                    "base": base_branch,
                }),
                self.read_timeout,
            )
            .await?;

        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(RepoError::Conflict(error_message(response).await));
        }

        let pr: PullRequest = ensure_success(response).await?.json().await?;
        tracing::info!(number = pr.number, head = head_branch, base = base_branch, "pull request opened");
        Ok(pr)
    }
}

/// Percent-encode each `/`-separated segment so `#`, `?` and spaces stay in the path.
fn encode_segments(path: &str) -> String {
    path.split('/')
        .map(urlencoding::encode)
        .collect::<Vec<_>>()
        .join("/")
}

fn decode_content(encoded: &str) -> Result<String, RepoError> {
    let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| RepoError::Decode(format!("content is not base64: {e}")))?;
    String::from_utf8(bytes).map_err(|_| RepoError::Decode("File is not valid UTF-8".into()))
}

async fn ensure_success(response: Response) -> Result<Response, RepoError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    Err(RepoError::Upstream {
        status: status.as_u16(),
        message: error_message(response).await,
    })
}

/// GitHub error bodies carry `message` and sometimes `errors[].message`.
async fn error_message(response: Response) -> String {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    let Ok(body) = serde_json::from_str::<Value>(&text) else {
        return if text.is_empty() { status.to_string() } else { text };
    };

    let mut message = body
        .get("message")
        .and_then(Value::as_str)
        .unwrap_or("Unknown error")
        .to_string();
    if let Some(detail) = body
        .get("errors")
        .and_then(|e| e.get(0))
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str)
    {
        message = format!("{message}: {detail}");
    }
    message
}
