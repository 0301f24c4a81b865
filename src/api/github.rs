use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::{ApiError, ApiJson, ApiQuery};
use crate::repo_tools::remote::*;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ReadFileBody {
    pub path: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

#[derive(Debug, Deserialize)]
pub struct ListDirectoryBody {
    #[serde(default)]
    pub path: String,
    #[serde(default = "default_branch")]
    pub branch: String,
}

#[derive(Debug, Serialize)]
pub struct DirectoryListing {
    pub path: String,
    pub items: Vec<DirectoryItem>,
}

#[derive(Debug, Deserialize)]
pub struct PullRequestBody {
    pub title: String,
    pub body: String,
    pub head_branch: String,
    #[serde(default = "default_branch")]
    pub base_branch: String,
}

#[derive(Debug, Deserialize)]
pub struct RecentCommitsQuery {
    #[serde(default = "default_branch")]
    pub branch: String,
    #[serde(default = "default_commit_limit")]
    pub limit: u32,
}

fn default_commit_limit() -> u32 {
    10
}

pub async fn read_file(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ReadFileBody>,
) -> Result<Json<RemoteFile>, ApiError> {
    let file = state.github.read_file(&body.path, &body.branch).await?;
    Ok(Json(file))
}

pub async fn list_directory(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<ListDirectoryBody>,
) -> Result<Json<DirectoryListing>, ApiError> {
    let items = state.github.list_directory(&body.path, &body.branch).await?;
    Ok(Json(DirectoryListing { path: body.path, items }))
}

pub async fn write_file(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<WriteFileRequest>,
) -> Result<Json<WriteResult>, ApiError> {
    let written = state.github.write_file(&body).await?;
    Ok(Json(written))
}

pub async fn create_pull_request(
    State(state): State<AppState>,
    ApiJson(body): ApiJson<PullRequestBody>,
) -> Result<Json<PullRequest>, ApiError> {
    let pr = state
        .github
        .create_pull_request(&body.title, &body.body, &body.head_branch, &body.base_branch)
        .await?;
    Ok(Json(pr))
}

pub async fn branches(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    let branches = state.github.list_branches().await?;
    Ok(Json(serde_json::json!({ "branches": branches })))
}

pub async fn recent_commits(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<RecentCommitsQuery>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let commits = state.github.recent_commits(&query.branch, query.limit).await?;
    Ok(Json(serde_json::json!({ "commits": commits })))
}
