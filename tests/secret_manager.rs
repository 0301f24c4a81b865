mod common;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::json;

use afpi_gateway::secrets::{SecretError, SecretManagerSource, SecretSource};
use common::serve;

async fn access(Path((project, secret, version)): Path<(String, String, String)>, headers: HeaderMap) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        == Some("Bearer ya29.test");
    if !authorized {
        return (StatusCode::UNAUTHORIZED, "missing token").into_response();
    }
    if project != "afpi-production" || version != "latest:access" {
        return (StatusCode::NOT_FOUND, "no such secret").into_response();
    }
    if secret == "forbidden" {
        return (StatusCode::FORBIDDEN, "permission denied").into_response();
    }
    Json(json!({
        "name": format!("projects/{project}/secrets/{secret}/versions/1"),
        "payload": {"data": STANDARD.encode("ghp_from_store\n")}
    }))
    .into_response()
}

#[tokio::test]
async fn secret_manager_reads_and_decodes_payload() {
    std::env::set_var("GOOGLE_OAUTH_ACCESS_TOKEN", "ya29.test");
    let app = Router::new().route("/v1/projects/:project/secrets/:secret/versions/:version", get(access));
    let addr = serve(app).await;
    let base = format!("http://{addr}");

    let source = SecretManagerSource::new(&base, "projects/afpi-production/secrets/github-token/versions/latest").unwrap();
    assert_eq!(source.describe(), "secret-manager");
    assert_eq!(source.secret().await.unwrap(), "ghp_from_store");

    let denied = SecretManagerSource::new(&base, "projects/afpi-production/secrets/forbidden/versions/latest").unwrap();
    match denied.secret().await.unwrap_err() {
        SecretError::Store { resource, message } => {
            assert!(resource.ends_with("forbidden/versions/latest"));
            assert!(message.contains("403"));
        }
        other => panic!("unexpected {other:?}"),
    }
}
