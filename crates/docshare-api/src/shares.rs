//! Owner-facing share management: create-or-reuse, list, delete.

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, Query, State, rejection::JsonRejection},
};
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::{info, warn};

use docshare_db::Database;
use docshare_db::models::ShareRow;
use docshare_types::ApiResponse;
use docshare_types::api::{
    BatchDeleteRequest, BatchDeleteResponse, CreateShareRequest, CreateShareResponse,
    ShareListItem, ShareListResponse,
};

use crate::base_url::BaseUrl;
use crate::error::{ApiError, ApiResult};
use crate::middleware::AuthUser;
use crate::{AppState, blocking};

pub const MIN_EXPIRE_DAYS: i64 = 1;
pub const MAX_EXPIRE_DAYS: i64 = 365;
pub const MIN_PASSWORD_CHARS: usize = 4;
pub const MAX_TITLE_CHARS: usize = 255;

const DEFAULT_PAGE: u32 = 1;
const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

/// What to do with `password_hash` when saving a share.
#[derive(Debug, PartialEq, Eq)]
enum PasswordPlan {
    /// No password required; store an empty hash.
    Clear,
    /// Hash this (trimmed) plaintext.
    Hash(String),
    /// Keep the hash already on the reused row.
    KeepExisting,
}

/// POST /api/share/create: create a share, or refresh the caller's live
/// share of the same document.
pub async fn create_share(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    base_url: BaseUrl,
    payload: Result<Json<CreateShareRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<CreateShareResponse>>> {
    let Json(req) = payload?;
    validate_create(&req)?;

    let (share, reused) = blocking(move || save_share(&state.db, &user.user_id, req, docshare_db::now())).await?;

    Ok(Json(ApiResponse::success(CreateShareResponse {
        share_url: base_url.share_url(&share.id),
        share_id: share.id,
        doc_id: share.doc_id,
        doc_title: share.doc_title,
        require_password: share.require_password,
        expire_at: share.expire_at,
        is_public: share.is_public,
        created_at: share.created_at,
        updated_at: share.updated_at,
        reused,
    })))
}

fn validate_create(req: &CreateShareRequest) -> ApiResult<()> {
    if req.doc_id.trim().is_empty() {
        return Err(ApiError::BadRequest("Invalid request: docId is required".into()));
    }
    if req.doc_title.trim().is_empty() {
        return Err(ApiError::BadRequest("Invalid request: docTitle is required".into()));
    }
    if req.doc_title.chars().count() > MAX_TITLE_CHARS {
        return Err(ApiError::BadRequest(format!(
            "Invalid request: docTitle must be at most {} characters",
            MAX_TITLE_CHARS
        )));
    }
    if req.content.is_empty() {
        return Err(ApiError::BadRequest("Invalid request: content is required".into()));
    }
    if !(MIN_EXPIRE_DAYS..=MAX_EXPIRE_DAYS).contains(&req.expire_days) {
        return Err(ApiError::BadRequest(format!(
            "Invalid request: expireDays must be between {} and {}",
            MIN_EXPIRE_DAYS, MAX_EXPIRE_DAYS
        )));
    }
    Ok(())
}

/// Decide the password hash for a create. `existing` is the reusable row, if any.
fn plan_password(
    require_password: bool,
    password: &str,
    existing: Option<&ShareRow>,
) -> ApiResult<PasswordPlan> {
    if !require_password {
        return Ok(PasswordPlan::Clear);
    }

    let password = password.trim();
    if !password.is_empty() {
        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ApiError::BadRequest(format!(
                "Password must be at least {} characters",
                MIN_PASSWORD_CHARS
            )));
        }
        return Ok(PasswordPlan::Hash(password.to_string()));
    }

    match existing {
        Some(share) if !share.password_hash.is_empty() => Ok(PasswordPlan::KeepExisting),
        _ => Err(ApiError::BadRequest(
            "Password must be provided for new share".into(),
        )),
    }
}

/// Create-or-reuse. Returns the saved row and whether an existing row was reused.
///
/// Not transactional: two concurrent creates for the same document may both
/// insert. Later reads pick the most recent row.
fn save_share(
    db: &Database,
    user_id: &str,
    req: CreateShareRequest,
    now: DateTime<Utc>,
) -> ApiResult<(ShareRow, bool)> {
    let existing = db
        .find_active_share_by_doc(user_id, &req.doc_id)?
        .filter(|share| share.expire_at > now);

    let plan = plan_password(req.require_password, &req.password, existing.as_ref())?;

    let references = match req.references.as_deref() {
        Some(refs) if !refs.is_empty() => Some(
            serde_json::to_string(refs)
                .map_err(|e| ApiError::BadRequest(format!("Invalid request: {}", e)))?,
        ),
        _ => None,
    };
    let parent_share_id = req
        .parent_share_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty());
    let expire_at = now + Duration::days(req.expire_days);

    let reused = existing.is_some();
    let mut share = match existing {
        Some(share) => share,
        None => ShareRow {
            id: docshare_crypto::share_id()?,
            user_id: user_id.to_string(),
            doc_id: req.doc_id,
            doc_title: String::new(),
            content: String::new(),
            references: None,
            parent_share_id: None,
            require_password: false,
            password_hash: String::new(),
            expire_at,
            is_public: true,
            view_count: 0,
            created_at: now,
            updated_at: now,
        },
    };

    share.doc_title = req.doc_title;
    share.content = req.content;
    share.references = references;
    share.parent_share_id = parent_share_id;
    share.require_password = req.require_password;
    share.is_public = req.is_public;
    share.expire_at = expire_at;
    share.updated_at = now;

    match plan {
        PasswordPlan::Clear => share.password_hash.clear(),
        PasswordPlan::Hash(password) => {
            share.password_hash = docshare_crypto::hash_password(&password)?;
        }
        PasswordPlan::KeepExisting => {}
    }

    if reused {
        db.update_share(&share)?;
        info!("Share {} refreshed for doc {}", share.id, share.doc_id);
    } else {
        db.insert_share(&share)?;
        info!("Share {} created for doc {}", share.id, share.doc_id);
    }

    Ok((share, reused))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub size: Option<String>,
}

/// Page number, 1-based. Missing, unparsable or non-positive values give 1.
fn parse_page(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v.min(u32::MAX as i64) as u32)
        .unwrap_or(DEFAULT_PAGE)
}

/// Page size. Missing, unparsable or non-positive values give 10; capped at 100.
fn parse_size(raw: Option<&str>) -> u32 {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v > 0)
        .map(|v| v.min(MAX_PAGE_SIZE as i64) as u32)
        .unwrap_or(DEFAULT_PAGE_SIZE)
}

/// GET /api/share/list: the caller's shares, newest first. Expired rows included.
pub async fn list_shares(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    base_url: BaseUrl,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<ApiResponse<ShareListResponse>>> {
    let page = parse_page(query.page.as_deref());
    let size = parse_size(query.size.as_deref());
    let offset = (page as i64 - 1) * size as i64;

    let (total, rows) = blocking(move || {
        let total = state.db.count_shares(&user.user_id)?;
        let rows = state.db.list_shares(&user.user_id, size as i64, offset)?;
        Ok((total, rows))
    })
    .await?;

    let items = rows
        .into_iter()
        .map(|row| ShareListItem {
            share_url: base_url.share_url(&row.id),
            id: row.id,
            doc_id: row.doc_id,
            doc_title: row.doc_title,
            require_password: row.require_password,
            expire_at: row.expire_at,
            is_public: row.is_public,
            view_count: row.view_count,
            created_at: row.created_at,
        })
        .collect();

    Ok(Json(ApiResponse::success(ShareListResponse {
        items,
        page,
        size,
        total,
    })))
}

/// DELETE /api/share/{id}: soft-delete one of the caller's shares.
pub async fn delete_share(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(share_id): Path<String>,
) -> ApiResult<Json<ApiResponse<()>>> {
    let deleted =
        blocking(move || Ok(state.db.delete_share(&share_id, &user.user_id, docshare_db::now())?)).await?;

    if !deleted {
        return Err(ApiError::NotFound("Share not found or unauthorized".into()));
    }
    Ok(Json(ApiResponse::ok()))
}

/// DELETE /api/share/batch: delete the listed shares, or all of the caller's
/// shares when no ids are given. Per-id failures never abort the batch.
pub async fn delete_shares_batch(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    body: Bytes,
) -> ApiResult<Json<ApiResponse<BatchDeleteResponse>>> {
    let req = parse_batch_body(&body)?;
    let share_ids = req.share_ids.unwrap_or_default();

    let response = blocking(move || {
        let now = docshare_db::now();
        if share_ids.is_empty() {
            let count = state.db.delete_shares_by_user(&user.user_id, now)?;
            info!("Deleted all {} shares of user {}", count, user.user_id);
            return Ok(BatchDeleteResponse {
                deleted_all_count: Some(count),
                ..Default::default()
            });
        }
        Ok(delete_each(&state.db, &user.user_id, &share_ids, now))
    })
    .await?;

    Ok(Json(ApiResponse::success(response)))
}

/// An empty body means "no ids supplied".
fn parse_batch_body(body: &[u8]) -> ApiResult<BatchDeleteRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(BatchDeleteRequest::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid request: {}", e)))
}

fn delete_each(
    db: &Database,
    user_id: &str,
    share_ids: &[String],
    now: DateTime<Utc>,
) -> BatchDeleteResponse {
    let mut response = BatchDeleteResponse::default();

    for raw in share_ids {
        let share_id = raw.trim();
        if share_id.is_empty() {
            continue;
        }
        match db.delete_share(share_id, user_id, now) {
            Ok(true) => response.deleted.push(share_id.to_string()),
            Ok(false) => response.not_found.push(share_id.to_string()),
            Err(e) => {
                warn!("Batch delete of share {} failed: {}", share_id, e);
                response.failed.insert(share_id.to_string(), e.to_string());
            }
        }
    }

    response
}
