use axum::{Extension, Json, extract::State};
use chrono::Utc;

use docshare_types::ApiResponse;
use docshare_types::api::{AuthHealthResponse, HealthResponse};

use crate::error::ApiResult;
use crate::middleware::AuthUser;
use crate::{AppState, blocking};

/// GET /api/health: liveness, user count and run mode. Not enveloped.
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let db_state = state.clone();
    let user_count = blocking(move || Ok(db_state.db.count_users()?)).await?;

    Ok(Json(HealthResponse {
        status: "ok",
        ts: Utc::now().timestamp(),
        user_count,
        mode: state.mode.clone(),
        version: env!("CARGO_PKG_VERSION"),
    }))
}

/// GET /api/auth/health: lets a client check that its API token works.
pub async fn auth_health(
    Extension(user): Extension<AuthUser>,
) -> Json<ApiResponse<AuthHealthResponse>> {
    Json(ApiResponse::success(AuthHealthResponse {
        status: "ok",
        user_id: user.user_id,
        ts: Utc::now().timestamp(),
    }))
}
