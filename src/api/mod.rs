//! HTTP surface: health checks plus the versioned API under the configured prefix.

pub mod ai;
pub mod auth;
pub mod error;
pub mod github;
pub mod middleware;
pub mod resources;

use axum::extract::State;
use axum::http::{header, HeaderName, HeaderValue, Method};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::AppState;

pub use error::ApiError;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/ai/chat", post(ai::chat))
        .route("/github/read-file", post(github::read_file))
        .route("/github/list-directory", post(github::list_directory))
        .route("/github/write-file", post(github::write_file))
        .route("/github/create-pr", post(github::create_pull_request))
        .route("/github/branches", get(github::branches))
        .route("/github/recent-commits", get(github::recent_commits))
        .route(
            "/data-sources",
            get(resources::list_data_sources).post(resources::create_data_source),
        )
        .route("/data-sources/:id", get(resources::get_data_source))
        .route("/agents", get(resources::list_agents).post(resources::create_agent))
        .route("/agents/:id", get(resources::get_agent))
        .route("/agents/:id/control", post(resources::control_agent))
        .route(
            "/taxonomies",
            get(resources::list_taxonomies).post(resources::create_taxonomy),
        )
        .route("/taxonomies/:id", get(resources::get_taxonomy))
        .route("/analytics/dashboard", get(resources::dashboard))
        .route("/analytics/recent", get(resources::recent))
        .route("/analytics/analyses", post(resources::create_analysis))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me));

    let prefix = state.config.api_prefix.clone();
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/health", get(health))
        .route("/", get(root))
        .nest(&prefix, api)
        .fallback(not_found)
        .layer(axum::middleware::from_fn(middleware::request_logging))
        .layer(cors)
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "status": "healthy", "version": state.config.version }))
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "message": state.config.project_name,
        "version": state.config.version,
        "api": state.config.api_prefix,
    }))
}

async fn not_found() -> ApiError {
    ApiError::NotFound("No such route".into())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) if value != "*" => Some(value),
            _ => {
                tracing::warn!(origin = %origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(middleware::REQUEST_ID_HEADER),
        ])
        .allow_credentials(true)
}
