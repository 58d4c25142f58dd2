use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::warn;

use docshare_db::Database;
use docshare_types::ApiResponse;
use docshare_types::api::ShareView;

use crate::base_url::BaseUrl;
use crate::error::{ApiError, ApiResult};
use crate::references::{parse_references, rewrite_block_references};
use crate::{AppState, blocking};

#[derive(Debug, Deserialize)]
pub struct ViewQuery {
    pub password: Option<String>,
}

/// GET /api/s/{id}: public read of a share.
pub async fn get_share(
    State(state): State<AppState>,
    Path(share_id): Path<String>,
    base_url: BaseUrl,
    Query(query): Query<ViewQuery>,
) -> ApiResult<Json<ApiResponse<ShareView>>> {
    let view = blocking(move || {
        read_share(
            &state.db,
            &share_id,
            query.password.as_deref(),
            base_url.as_str(),
            docshare_db::now(),
        )
    })
    .await?;

    Ok(Json(ApiResponse::success(view)))
}

fn read_share(
    db: &Database,
    share_id: &str,
    password: Option<&str>,
    base_url: &str,
    now: DateTime<Utc>,
) -> ApiResult<ShareView> {
    let share = db
        .get_share(share_id)?
        .ok_or_else(|| ApiError::NotFound("Share not found".into()))?;

    if share.is_expired_at(now) {
        return Err(ApiError::Gone("Share has expired".into()));
    }

    if share.require_password {
        let password = password.unwrap_or_default();
        if password.is_empty() {
            return Err(ApiError::Unauthenticated("Password required".into()));
        }
        if !docshare_crypto::verify_password(password, &share.password_hash) {
            return Err(ApiError::Unauthenticated("Invalid password".into()));
        }
    }

    // Deleted between the read and the increment.
    let view_count = db
        .increment_view_count(&share.id)?
        .ok_or_else(|| ApiError::NotFound("Share not found".into()))?;

    let content = match parse_references(share.references.as_deref()) {
        Some(refs) => rewrite_block_references(&share.content, &refs, base_url, |block_id| {
            match db.find_active_share_by_doc(&share.user_id, block_id) {
                Ok(found) => found.map(|s| s.id),
                Err(e) => {
                    warn!("Block share lookup for {} failed: {}", block_id, e);
                    None
                }
            }
        }),
        None => share.content,
    };

    Ok(ShareView {
        id: share.id,
        doc_title: share.doc_title,
        content,
        require_password: share.require_password,
        expire_at: share.expire_at,
        view_count,
        created_at: share.created_at,
    })
}
