use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::api::error::{ApiError, ApiJson, ApiQuery};
use crate::models::*;
use crate::store;
use crate::AppState;

const MAX_PER_PAGE: u32 = 100;
const RECENT_ANALYSES: u32 = 10;

#[derive(Debug, Deserialize)]
pub struct DataSourceQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
pub struct ControlBody {
    pub action: AgentAction,
}

fn not_found(kind: &str, id: &str) -> ApiError {
    ApiError::NotFound(format!("{kind} not found: {id}"))
}

// ---- data sources ----

pub async fn list_data_sources(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<DataSourceQuery>,
) -> Result<Json<Page<DataSource>>, ApiError> {
    let page = query.page.unwrap_or(1);
    let per_page = query.per_page.unwrap_or(20);
    if page == 0 {
        return Err(ApiError::Validation("page must be at least 1".into()));
    }
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(ApiError::Validation(format!("per_page must be between 1 and {MAX_PER_PAGE}")));
    }

    let status = query.status.filter(|s| !s.is_empty());
    let (data, total) = state
        .db
        .call(move |c| store::list_data_sources(c, page, per_page, status.as_deref()))
        .await?;
    Ok(Json(Page {
        data,
        pagination: Pagination { page, per_page, total },
    }))
}

pub async fn create_data_source(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewDataSource>,
) -> Result<(StatusCode, Json<DataSource>), ApiError> {
    let source = state.db.call(|c| store::create_data_source(c, input)).await?;
    tracing::info!(id = %source.id, kind = %source.kind, "data source created");
    Ok((StatusCode::CREATED, Json(source)))
}

pub async fn get_data_source(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DataSource>, ApiError> {
    let key = id.clone();
    state
        .db
        .call(move |c| store::get_data_source(c, &key))
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Data source", &id))
}

// ---- agents ----

pub async fn list_agents(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let agents = state.db.call(store::list_agents).await?;
    Ok(Json(json!({ "data": agents })))
}

pub async fn create_agent(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewAgent>,
) -> Result<(StatusCode, Json<Agent>), ApiError> {
    let agent = state.db.call(|c| store::create_agent(c, input)).await?;
    tracing::info!(id = %agent.id, "agent created");
    Ok((StatusCode::CREATED, Json(agent)))
}

pub async fn get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Agent>, ApiError> {
    let key = id.clone();
    state
        .db
        .call(move |c| store::get_agent(c, &key))
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Agent", &id))
}

pub async fn control_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(body): ApiJson<ControlBody>,
) -> Result<Json<Value>, ApiError> {
    let key = id.clone();
    let action = body.action;
    let agent = state
        .db
        .call(move |c| store::control_agent(c, &key, action))
        .await?
        .ok_or_else(|| not_found("Agent", &id))?;

    tracing::info!(id = %agent.id, action = body.action.as_str(), status = %agent.status, "agent control");
    Ok(Json(json!({
        "id": agent.id,
        "action": body.action,
        "status": agent.status,
        "message": format!("Agent {} command executed", body.action.as_str()),
    })))
}

// ---- taxonomies ----

pub async fn list_taxonomies(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let taxonomies = state.db.call(store::list_taxonomies).await?;
    Ok(Json(json!({ "data": taxonomies })))
}

pub async fn create_taxonomy(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewTaxonomy>,
) -> Result<(StatusCode, Json<Taxonomy>), ApiError> {
    if !input.hierarchy.is_object() {
        return Err(ApiError::Validation("hierarchy must be an object".into()));
    }
    let taxonomy = state.db.call(|c| store::create_taxonomy(c, input)).await?;
    Ok((StatusCode::CREATED, Json(taxonomy)))
}

pub async fn get_taxonomy(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Taxonomy>, ApiError> {
    let key = id.clone();
    state
        .db
        .call(move |c| store::get_taxonomy(c, &key))
        .await?
        .map(Json)
        .ok_or_else(|| not_found("Taxonomy", &id))
}

// ---- analytics ----

pub async fn dashboard(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let metrics = state.db.call(store::dashboard_metrics).await?;
    Ok(Json(json!({ "metrics": metrics })))
}

pub async fn recent(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let analyses = state.db.call(|c| store::recent_analyses(c, RECENT_ANALYSES)).await?;
    Ok(Json(json!({ "data": analyses })))
}

pub async fn create_analysis(
    State(state): State<AppState>,
    ApiJson(input): ApiJson<NewAnalysis>,
) -> Result<(StatusCode, Json<Analysis>), ApiError> {
    let analysis = state.db.call(|c| store::create_analysis(c, input)).await?;
    Ok((StatusCode::CREATED, Json(analysis)))
}
