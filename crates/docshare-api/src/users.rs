use axum::{Extension, Json, extract::State};

use docshare_types::ApiResponse;
use docshare_types::api::UserProfile;

use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::{AppState, blocking};

/// GET /api/user/me: profile of the authenticated caller. Never includes the API token.
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<ApiResponse<UserProfile>>> {
    let row = blocking(move || Ok(state.db.get_user_by_id(&user.user_id)?))
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

    Ok(Json(ApiResponse::success(UserProfile {
        id: row.id,
        username: row.username,
        email: row.email,
        is_active: row.is_active,
        created_at: row.created_at,
    })))
}
