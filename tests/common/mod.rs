#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use afpi_gateway::config::GitHubSettings;
use afpi_gateway::repo_tools::GitHubClient;
use afpi_gateway::secrets::{SecretError, SecretSource};

pub const TOKEN: &str = "ghp_test_token";

/// Hands out a fixed token.
pub struct StaticToken(pub &'static str);

#[async_trait]
impl SecretSource for StaticToken {
    fn describe(&self) -> &'static str {
        "static"
    }

    async fn secret(&self) -> Result<String, SecretError> {
        Ok(self.0.to_string())
    }
}

/// Fixed token that records how often it was asked for.
#[derive(Default)]
pub struct CountingToken {
    pub lookups: AtomicUsize,
}

#[async_trait]
impl SecretSource for CountingToken {
    fn describe(&self) -> &'static str {
        "counting"
    }

    async fn secret(&self) -> Result<String, SecretError> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        Ok(TOKEN.to_string())
    }
}

pub async fn serve(app: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind mock server");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("mock server");
    });
    addr
}

// ---- GitHub double ----

/// In-memory stand-in for the subset of the GitHub REST API the gateway uses.
/// Files are keyed by (branch, path).
#[derive(Default)]
pub struct MockGitHub {
    files: Mutex<HashMap<(String, String), (String, String)>>,
    branches: Mutex<Vec<String>>,
    pulls: Mutex<Vec<String>>,
    pub puts: Mutex<Vec<Value>>,
    pub ref_posts: Mutex<Vec<Value>>,
    pub auth_headers: Mutex<Vec<String>>,
    next_sha: AtomicUsize,
}

impl MockGitHub {
    pub fn new() -> Arc<Self> {
        let mock = Self::default();
        mock.branches.lock().unwrap().push("main".into());
        Arc::new(mock)
    }

    pub fn add_file(&self, branch: &str, path: &str, content: &str) {
        let sha = self.fresh_sha();
        self.files
            .lock()
            .unwrap()
            .insert((branch.into(), path.into()), (content.into(), sha));
    }

    pub fn add_branch(&self, branch: &str) {
        self.branches.lock().unwrap().push(branch.into());
    }

    pub fn file(&self, branch: &str, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(&(branch.to_string(), path.to_string()))
            .map(|(content, _)| content.clone())
    }

    pub fn write_count(&self) -> usize {
        self.puts.lock().unwrap().len()
    }

    fn fresh_sha(&self) -> String {
        format!("sha{:04}", self.next_sha.fetch_add(1, Ordering::SeqCst))
    }

    fn note_auth(&self, headers: &HeaderMap) {
        let auth = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();
        self.auth_headers.lock().unwrap().push(auth);
    }

    fn contents(&self, branch: &str, path: &str) -> Response {
        if path == "boom.txt" {
            return (StatusCode::INTERNAL_SERVER_ERROR, Json(json!({"message": "Server Error"}))).into_response();
        }

        let files = self.files.lock().unwrap();
        if let Some((content, sha)) = files.get(&(branch.to_string(), path.to_string())) {
            let encoded = STANDARD.encode(content.as_bytes());
            // GitHub wraps base64 content at 60 columns
            let wrapped: Vec<String> = encoded
                .as_bytes()
                .chunks(60)
                .map(|c| String::from_utf8_lossy(c).into_owned())
                .collect();
            return Json(json!({
                "type": "file",
                "name": path.rsplit('/').next().unwrap_or(path),
                "path": path,
                "sha": sha,
                "size": content.len(),
                "encoding": "base64",
                "content": wrapped.join("\n") + "\n",
            }))
            .into_response();
        }

        let prefix = if path.is_empty() { String::new() } else { format!("{path}/") };
        let mut items: BTreeMap<String, Value> = BTreeMap::new();
        for ((b, p), (content, _)) in files.iter() {
            if b != branch || !p.starts_with(&prefix) {
                continue;
            }
            let rest = &p[prefix.len()..];
            let (name, item) = match rest.split_once('/') {
                Some((dir, _)) => (dir, json!({"name": dir, "path": format!("{prefix}{dir}"), "type": "dir", "size": 0})),
                None => (rest, json!({"name": rest, "path": p, "type": "file", "size": content.len()})),
            };
            items.entry(name.to_string()).or_insert(item);
        }
        if items.is_empty() {
            return (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response();
        }
        Json(Value::Array(items.into_values().collect())).into_response()
    }

    fn put(&self, path: &str, body: Value) -> Response {
        self.puts.lock().unwrap().push(body.clone());
        let branch = body["branch"].as_str().unwrap_or("main").to_string();
        if !self.branches.lock().unwrap().contains(&branch) {
            return (StatusCode::NOT_FOUND, Json(json!({"message": "Branch not found"}))).into_response();
        }

        let key = (branch, path.to_string());
        let existing = self.files.lock().unwrap().get(&key).map(|(_, sha)| sha.clone());
        match (&existing, body.get("sha").and_then(Value::as_str)) {
            (Some(_), None) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({"message": "Invalid request.", "errors": [{"message": "\"sha\" wasn't supplied."}]})),
                )
                    .into_response()
            }
            (Some(current), Some(given)) if current != given => {
                return (StatusCode::CONFLICT, Json(json!({"message": format!("{path} does not match {given}")})))
                    .into_response()
            }
            _ => {}
        }

        let raw = STANDARD.decode(body["content"].as_str().unwrap_or("")).unwrap_or_default();
        let content = String::from_utf8(raw).unwrap_or_default();
        let sha = self.fresh_sha();
        self.files.lock().unwrap().insert(key, (content, sha.clone()));

        let status = if existing.is_some() { StatusCode::OK } else { StatusCode::CREATED };
        (
            status,
            Json(json!({
                "content": {"path": path, "sha": sha},
                "commit": {"sha": format!("commit-{sha}"), "html_url": format!("https://github.test/commit/{sha}")},
            })),
        )
            .into_response()
    }

    fn create_ref(&self, body: Value) -> Response {
        self.ref_posts.lock().unwrap().push(body.clone());
        let name = body["ref"].as_str().unwrap_or("").trim_start_matches("refs/heads/").to_string();
        let mut branches = self.branches.lock().unwrap();
        if branches.contains(&name) {
            return (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({"message": "Reference already exists"})))
                .into_response();
        }
        branches.push(name.clone());

        // new branch starts as a copy of main
        let mut files = self.files.lock().unwrap();
        let copies: Vec<_> = files
            .iter()
            .filter(|((b, _), _)| b == "main")
            .map(|((_, p), v)| ((name.clone(), p.clone()), v.clone()))
            .collect();
        files.extend(copies);

        (StatusCode::CREATED, Json(json!({"ref": body["ref"], "object": {"sha": "base-sha"}}))).into_response()
    }

    fn create_pull(&self, body: Value) -> Response {
        let head = body["head"].as_str().unwrap_or("").to_string();
        let base = body["base"].as_str().unwrap_or("main");
        if head == base || !self.branches.lock().unwrap().contains(&head) {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"message": "Validation Failed", "errors": [{"message": format!("No commits between {base} and {head}")}]})),
            )
                .into_response();
        }
        let mut pulls = self.pulls.lock().unwrap();
        if pulls.contains(&head) {
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(json!({"message": "Validation Failed", "errors": [{"message": format!("A pull request already exists for renduples:{head}.")}]})),
            )
                .into_response();
        }
        pulls.push(head);
        let number = 41 + pulls.len() as u64;
        (
            StatusCode::CREATED,
            Json(json!({
                "number": number,
                "url": format!("https://api.github.test/repos/renduples/afpip/pulls/{number}"),
                "html_url": format!("https://github.test/renduples/afpip/pull/{number}"),
                "title": body["title"],
                "state": "open",
            })),
        )
            .into_response()
    }
}

#[derive(Deserialize)]
struct RefQuery {
    #[serde(rename = "ref")]
    git_ref: Option<String>,
}

#[derive(Deserialize)]
struct CommitsQuery {
    sha: Option<String>,
    per_page: Option<usize>,
}

async fn root_contents(
    State(mock): State<Arc<MockGitHub>>,
    headers: HeaderMap,
    Query(q): Query<RefQuery>,
) -> Response {
    mock.note_auth(&headers);
    mock.contents(q.git_ref.as_deref().unwrap_or("main"), "")
}

async fn get_contents(
    State(mock): State<Arc<MockGitHub>>,
    headers: HeaderMap,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Query(q): Query<RefQuery>,
) -> Response {
    mock.note_auth(&headers);
    mock.contents(q.git_ref.as_deref().unwrap_or("main"), path.trim_start_matches('/'))
}

async fn put_contents(
    State(mock): State<Arc<MockGitHub>>,
    headers: HeaderMap,
    Path((_owner, _repo, path)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Response {
    mock.note_auth(&headers);
    mock.put(path.trim_start_matches('/'), body)
}

async fn get_ref(
    State(mock): State<Arc<MockGitHub>>,
    Path((_owner, _repo, branch)): Path<(String, String, String)>,
) -> Response {
    let branch = branch.trim_start_matches('/').to_string();
    if mock.branches.lock().unwrap().contains(&branch) {
        Json(json!({"ref": format!("refs/heads/{branch}"), "object": {"sha": "base-sha", "type": "commit"}})).into_response()
    } else {
        (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response()
    }
}

async fn post_ref(State(mock): State<Arc<MockGitHub>>, Json(body): Json<Value>) -> Response {
    mock.create_ref(body)
}

async fn post_pull(State(mock): State<Arc<MockGitHub>>, Json(body): Json<Value>) -> Response {
    mock.create_pull(body)
}

async fn list_branches(State(mock): State<Arc<MockGitHub>>) -> Json<Value> {
    let branches: Vec<Value> = mock
        .branches
        .lock()
        .unwrap()
        .iter()
        .map(|b| json!({"name": b, "protected": b == "main", "commit": {"sha": "base-sha"}}))
        .collect();
    Json(Value::Array(branches))
}

async fn list_commits(Query(q): Query<CommitsQuery>) -> Response {
    if q.sha.as_deref() == Some("gone") {
        return (StatusCode::NOT_FOUND, Json(json!({"message": "Not Found"}))).into_response();
    }
    let commits: Vec<Value> = (0..3)
        .map(|i| {
            json!({
                "sha": format!("abcdef{i}123456789"),
                "commit": {
                    "message": format!("Commit number {i}\n\nLonger body text"),
                    "author": {"name": "Dev Person", "email": "dev@example.com", "date": format!("2026-01-0{}T10:00:00Z", i + 1)},
                },
            })
        })
        .take(q.per_page.unwrap_or(30))
        .collect();
    Json(Value::Array(commits)).into_response()
}

pub fn github_router(mock: Arc<MockGitHub>) -> Router {
    Router::new()
        .route("/repos/:owner/:repo/contents", get(root_contents))
        .route("/repos/:owner/:repo/contents/*path", get(get_contents).put(put_contents))
        .route("/repos/:owner/:repo/git/ref/heads/*branch", get(get_ref))
        .route("/repos/:owner/:repo/git/refs", post(post_ref))
        .route("/repos/:owner/:repo/pulls", post(post_pull))
        .route("/repos/:owner/:repo/branches", get(list_branches))
        .route("/repos/:owner/:repo/commits", get(list_commits))
        .with_state(mock)
}

pub fn github_settings(addr: SocketAddr) -> GitHubSettings {
    GitHubSettings {
        api_url: format!("http://{addr}"),
        ..GitHubSettings::default()
    }
}

pub async fn github_client() -> (GitHubClient, Arc<MockGitHub>) {
    let mock = MockGitHub::new();
    let addr = serve(github_router(mock.clone())).await;
    let client = GitHubClient::new(&github_settings(addr), Arc::new(StaticToken(TOKEN))).expect("client");
    (client, mock)
}

// ---- chat completions double ----

/// Replays canned `/chat/completions` bodies in order and records every request.
#[derive(Default)]
pub struct MockCompletions {
    responses: Mutex<VecDeque<Value>>,
    pub requests: Mutex<Vec<Value>>,
    pub auth_headers: Mutex<Vec<String>>,
}

impl MockCompletions {
    pub fn new(responses: Vec<Value>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        })
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

async fn completions(
    State(mock): State<Arc<MockCompletions>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    mock.requests.lock().unwrap().push(body);
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();
    mock.auth_headers.lock().unwrap().push(auth);

    match mock.responses.lock().unwrap().pop_front() {
        Some(body) => Json(body).into_response(),
        None => (StatusCode::INTERNAL_SERVER_ERROR, "script exhausted").into_response(),
    }
}

pub fn completions_router(mock: Arc<MockCompletions>) -> Router {
    Router::new()
        .route("/v1/chat/completions", post(completions))
        .with_state(mock)
}

pub fn text_completion(text: &str) -> Value {
    json!({
        "id": "chatcmpl-1",
        "model": "gpt-4",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": text}, "finish_reason": "stop"}]
    })
}

pub fn tool_completion(calls: &[(&str, &str, Value)]) -> Value {
    let tool_calls: Vec<Value> = calls
        .iter()
        .map(|(id, name, args)| json!({"id": id, "type": "function", "function": {"name": name, "arguments": args.to_string()}}))
        .collect();
    json!({
        "id": "chatcmpl-2",
        "model": "gpt-4",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": null, "tool_calls": tool_calls},
            "finish_reason": "tool_calls"
        }]
    })
}
