use axum::extract::State;
use axum::Json;

use crate::api::error::{ApiError, ApiJson};
use crate::auth::{LoginRequest, LoginUser};
use crate::AppState;

pub async fn login(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<LoginUser>, ApiError> {
    // PBKDF2 runs on the blocking pool.
    let admin = state.admin.clone();
    let outcome = tokio::task::spawn_blocking(move || admin.verify_login(&request.email, &request.password))
        .await
        .map_err(|e| ApiError::Internal(format!("login task failed: {e}")))?;

    match outcome {
        Some(user) => {
            tracing::info!(email = %user.email, "login succeeded");
            Ok(Json(user))
        }
        None => {
            tracing::warn!("login rejected");
            Err(ApiError::Unauthorized("Invalid email or password".into()))
        }
    }
}

/// Sessions are not issued yet, so nobody is ever "current".
pub async fn me() -> ApiError {
    ApiError::Unauthorized("Not authenticated".into())
}
