use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::BlockReference;

// -- Envelope --

/// Every JSON response except `/api/health` is wrapped in this envelope.
/// `code` is 0 on success and non-zero on error.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub msg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            code: 0,
            msg: "success".to_string(),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn ok() -> Self {
        Self {
            code: 0,
            msg: "success".to_string(),
            data: None,
        }
    }

    pub fn error(code: i32, msg: impl Into<String>) -> Self {
        Self {
            code,
            msg: msg.into(),
            data: None,
        }
    }
}

// -- Health --

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: &'static str,
    pub ts: i64,
    pub user_count: i64,
    pub mode: String,
    pub version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthHealthResponse {
    pub status: &'static str,
    pub user_id: String,
    pub ts: i64,
}

// -- Bootstrap / users --

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BootstrapRequest {
    pub username: String,
    pub email: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BootstrapResponse {
    pub user_id: String,
    pub api_token: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

// -- Shares --

/// Body of `POST /api/share/create`. Missing fields deserialize to their
/// defaults so that validation can answer with a readable message.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreateShareRequest {
    pub doc_id: String,
    pub doc_title: String,
    pub content: String,
    pub require_password: bool,
    pub password: String,
    pub expire_days: i64,
    pub is_public: bool,
    pub references: Option<Vec<BlockReference>>,
    pub parent_share_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateShareResponse {
    pub share_id: String,
    pub share_url: String,
    pub doc_id: String,
    pub doc_title: String,
    pub require_password: bool,
    pub expire_at: DateTime<Utc>,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reused: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareListItem {
    pub id: String,
    pub doc_id: String,
    pub doc_title: String,
    pub require_password: bool,
    pub expire_at: DateTime<Utc>,
    pub is_public: bool,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub share_url: String,
}

#[derive(Debug, Serialize)]
pub struct ShareListResponse {
    pub items: Vec<ShareListItem>,
    pub page: u32,
    pub size: u32,
    pub total: i64,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BatchDeleteRequest {
    pub share_ids: Option<Vec<String>>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchDeleteResponse {
    pub deleted: Vec<String>,
    pub not_found: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub failed: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted_all_count: Option<usize>,
}

/// Public projection of a share returned by `GET /api/s/{id}`.
/// Never carries the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareView {
    pub id: String,
    pub doc_title: String,
    pub content: String,
    pub require_password: bool,
    pub expire_at: DateTime<Utc>,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
}
