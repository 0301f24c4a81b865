use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::llm::{ChatMessage, ChatProvider, LlmError, LlmResponse, ToolCall, ToolFunction};
use crate::repo_tools::remote::*;

#[derive(Debug, Clone, PartialEq)]
pub enum RepoCall {
    Read(String, String),
    List(String, String),
    Write(WriteFileRequest),
    PullRequest(String, String),
}

/// In-memory repository keyed by path, recording every call.
#[derive(Default)]
pub struct FakeRepo {
    files: Mutex<BTreeMap<String, String>>,
    calls: Mutex<Vec<RepoCall>>,
}

impl FakeRepo {
    pub fn with_file(path: &str, content: &str) -> Self {
        let repo = Self::default();
        repo.files.lock().unwrap().insert(path.to_string(), content.to_string());
        repo
    }

    pub fn calls(&self) -> Vec<RepoCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RepoCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteRepository for FakeRepo {
    async fn read_file(&self, path: &str, branch: &str) -> Result<RemoteFile, RepoError> {
        self.record(RepoCall::Read(path.into(), branch.into()));
        let files = self.files.lock().unwrap();
        let content = files
            .get(path)
            .ok_or_else(|| RepoError::NotFound(format!("File not found: {path}")))?;
        Ok(RemoteFile {
            path: path.into(),
            branch: branch.into(),
            content: content.clone(),
            sha: format!("sha-{}", content.len()),
            size: content.len() as u64,
        })
    }

    async fn list_directory(&self, path: &str, branch: &str) -> Result<Vec<DirectoryItem>, RepoError> {
        self.record(RepoCall::List(path.into(), branch.into()));
        let prefix = if path.is_empty() { String::new() } else { format!("{path}/") };
        let files = self.files.lock().unwrap();
        let mut items: BTreeMap<String, DirectoryItem> = BTreeMap::new();
        for file in files.keys().filter(|f| f.starts_with(&prefix)) {
            let rest = &file[prefix.len()..];
            let (name, kind) = match rest.split_once('/') {
                Some((dir, _)) => (dir, EntryKind::Dir),
                None => (rest, EntryKind::File),
            };
            items.entry(name.to_string()).or_insert(DirectoryItem {
                name: name.to_string(),
                path: format!("{prefix}{name}"),
                kind,
                size: None,
            });
        }
        if items.is_empty() {
            return Err(RepoError::NotFound(format!("Directory not found: {path}")));
        }
        Ok(items.into_values().collect())
    }

    async fn write_file(&self, request: &WriteFileRequest) -> Result<WriteResult, RepoError> {
        self.record(RepoCall::Write(request.clone()));
        let created = self
            .files
            .lock()
            .unwrap()
            .insert(request.path.clone(), request.content.clone())
            .is_none();
        Ok(WriteResult {
            path: request.path.clone(),
            sha: "new-sha".into(),
            branch: request.branch.clone(),
            commit_url: "https://github.test/commit/1".into(),
            created,
        })
    }

    async fn create_pull_request(
        &self,
        title: &str,
        _body: &str,
        head_branch: &str,
        _base_branch: &str,
    ) -> Result<PullRequest, RepoError> {
        self.record(RepoCall::PullRequest(title.into(), head_branch.into()));
        Ok(PullRequest {
            number: 7,
            url: "https://api.github.test/pulls/7".into(),
            html_url: "https://github.test/pull/7".into(),
            title: title.into(),
        })
    }
}

/// Provider double that replays canned responses and keeps every conversation it saw.
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<LlmResponse>>,
    fallback: Option<LlmResponse>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
    round_trips: AtomicUsize,
    tools: bool,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<LlmResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            fallback: None,
            seen: Mutex::new(Vec::new()),
            round_trips: AtomicUsize::new(0),
            tools: true,
        }
    }

    /// Answer every request with `response` forever.
    pub fn repeating(response: LlmResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::new(Vec::new())
        }
    }

    pub fn single_shot(response: LlmResponse) -> Self {
        Self {
            tools: false,
            ..Self::new(vec![response])
        }
    }

    pub fn round_trips(&self) -> usize {
        self.round_trips.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatProvider for ScriptedProvider {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn supports_tools(&self) -> bool {
        self.tools
    }

    async fn complete(
        &self,
        conversation: &[ChatMessage],
        _tools: Option<&[Value]>,
    ) -> Result<LlmResponse, LlmError> {
        self.round_trips.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push(conversation.to_vec());
        let next = self.responses.lock().unwrap().pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| LlmError::InvalidResponse("script exhausted".into()))
    }
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.into(),
        call_type: "function".into(),
        function: ToolFunction {
            name: name.into(),
            arguments: arguments.to_string(),
        },
    }
}

pub fn tool_response(content: Option<&str>, calls: Vec<ToolCall>) -> LlmResponse {
    LlmResponse {
        content: content.map(str::to_string),
        tool_calls: Some(calls),
    }
}
