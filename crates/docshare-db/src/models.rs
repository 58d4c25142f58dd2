/// Database row types, mapped directly from SQLite rows.
/// Distinct from docshare-types wire models to keep the DB layer independent.
use chrono::{DateTime, Utc};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: String,
    pub username: String,
    pub email: String,
    pub api_token: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ShareRow {
    pub id: String,
    pub user_id: String,
    pub doc_id: String,
    pub doc_title: String,
    pub content: String,
    /// Serialized JSON list of block references, as sent by the client.
    pub references: Option<String>,
    pub parent_share_id: Option<String>,
    pub require_password: bool,
    /// Empty iff `require_password` is false.
    pub password_hash: String,
    pub expire_at: DateTime<Utc>,
    pub is_public: bool,
    pub view_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShareRow {
    /// Expired strictly after `expire_at`; a read at exactly `expire_at` still succeeds.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expire_at
    }
}

#[derive(Debug, Clone)]
pub struct BootstrapTokenRow {
    pub id: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BootstrapTokenRow {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}
