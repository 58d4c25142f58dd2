use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, types::Type};

use crate::models::{BootstrapTokenRow, ShareRow, UserRow};
use crate::{Database, DbError, Result, format_ts, parse_ts};

const USER_COLUMNS: &str =
    "id, username, email, api_token, is_active, created_at, updated_at";

const SHARE_COLUMNS: &str = "id, user_id, doc_id, doc_title, content, block_refs, parent_share_id, \
     require_password, password_hash, expire_at, is_public, view_count, created_at, updated_at";

const BOOTSTRAP_COLUMNS: &str = "id, token, expires_at, used, created_at, updated_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &UserRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, username, email, api_token, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    user.id,
                    user.username,
                    user.email,
                    user.api_token,
                    user.is_active,
                    format_ts(user.created_at),
                    format_ts(user.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Number of users that have not been soft-deleted.
    pub fn count_users(&self) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM users WHERE deleted_at IS NULL",
                [],
                |row| row.get(0),
            )?;
            Ok(n)
        })
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1 AND deleted_at IS NULL"),
                [id],
                map_user,
            )
            .optional()
        })
    }

    /// Resolve an API token to a live, active user.
    pub fn get_active_user_by_token(&self, token: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE api_token = ?1 AND is_active = 1 AND deleted_at IS NULL"
                ),
                [token],
                map_user,
            )
            .optional()
        })
    }

    pub fn soft_delete_user(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET deleted_at = ?1, updated_at = ?1 WHERE id = ?2 AND deleted_at IS NULL",
                rusqlite::params![format_ts(now), id],
            )?;
            Ok(changed > 0)
        })
    }

    // -- Shares --

    pub fn insert_share(&self, share: &ShareRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO shares ({SHARE_COLUMNS})
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
                ),
                rusqlite::params![
                    share.id,
                    share.user_id,
                    share.doc_id,
                    share.doc_title,
                    share.content,
                    share.references,
                    share.parent_share_id,
                    share.require_password,
                    share.password_hash,
                    format_ts(share.expire_at),
                    share.is_public,
                    share.view_count,
                    format_ts(share.created_at),
                    format_ts(share.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// Save every owner-mutable column of an existing share.
    /// `view_count` and `created_at` are left alone.
    pub fn update_share(&self, share: &ShareRow) -> Result<()> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE shares SET
                    doc_title = ?1, content = ?2, block_refs = ?3, parent_share_id = ?4,
                    require_password = ?5, password_hash = ?6, expire_at = ?7,
                    is_public = ?8, updated_at = ?9
                 WHERE id = ?10 AND deleted_at IS NULL",
                rusqlite::params![
                    share.doc_title,
                    share.content,
                    share.references,
                    share.parent_share_id,
                    share.require_password,
                    share.password_hash,
                    format_ts(share.expire_at),
                    share.is_public,
                    format_ts(share.updated_at),
                    share.id,
                ],
            )?;
            if changed == 0 {
                return Err(DbError::NotFound(format!("share {}", share.id)));
            }
            Ok(())
        })
    }

    pub fn get_share(&self, id: &str) -> Result<Option<ShareRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {SHARE_COLUMNS} FROM shares WHERE id = ?1 AND deleted_at IS NULL"),
                [id],
                map_share,
            )
            .optional()
        })
    }

    /// Most recently created live share for a (user, doc) pair.
    /// No expiry filter: callers decide what an expired row means.
    pub fn find_active_share_by_doc(&self, user_id: &str, doc_id: &str) -> Result<Option<ShareRow>> {
        self.with_conn(|conn| query_latest_share_for_doc(conn, user_id, doc_id))
    }

    pub fn list_shares(&self, user_id: &str, limit: i64, offset: i64) -> Result<Vec<ShareRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SHARE_COLUMNS} FROM shares
                 WHERE user_id = ?1 AND deleted_at IS NULL
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2 OFFSET ?3"
            ))?;

            let rows = stmt
                .query_map(rusqlite::params![user_id, limit, offset], map_share)?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }

    pub fn count_shares(&self, user_id: &str) -> Result<i64> {
        self.with_conn(|conn| {
            let n = conn.query_row(
                "SELECT COUNT(*) FROM shares WHERE user_id = ?1 AND deleted_at IS NULL",
                [user_id],
                |row| row.get(0),
            )?;
            Ok(n)
        })
    }

    /// Ownership-scoped soft delete. Returns false when no live row matched.
    pub fn delete_share(&self, id: &str, user_id: &str, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE shares SET deleted_at = ?1
                 WHERE id = ?2 AND user_id = ?3 AND deleted_at IS NULL",
                rusqlite::params![format_ts(now), id, user_id],
            )?;
            Ok(changed > 0)
        })
    }

    /// Soft-delete every live share owned by `user_id`, returning how many were hit.
    pub fn delete_shares_by_user(&self, user_id: &str, now: DateTime<Utc>) -> Result<usize> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE shares SET deleted_at = ?1 WHERE user_id = ?2 AND deleted_at IS NULL",
                rusqlite::params![format_ts(now), user_id],
            )?;
            Ok(changed)
        })
    }

    /// Bump `view_count` alone and return the stored value after the update.
    pub fn increment_view_count(&self, id: &str) -> Result<Option<i64>> {
        self.with_conn(|conn| {
            conn.query_row(
                "UPDATE shares SET view_count = view_count + 1
                 WHERE id = ?1 AND deleted_at IS NULL
                 RETURNING view_count",
                [id],
                |row| row.get(0),
            )
            .optional()
        })
    }

    // -- Bootstrap tokens --

    pub fn insert_bootstrap_token(&self, token: &BootstrapTokenRow) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                &format!("INSERT INTO bootstrap_tokens ({BOOTSTRAP_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6)"),
                rusqlite::params![
                    token.id,
                    token.token,
                    format_ts(token.expires_at),
                    token.used,
                    format_ts(token.created_at),
                    format_ts(token.updated_at),
                ],
            )?;
            Ok(())
        })
    }

    /// An unused token that is still valid at `now`, if any.
    pub fn find_live_bootstrap_token(&self, now: DateTime<Utc>) -> Result<Option<BootstrapTokenRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!(
                    "SELECT {BOOTSTRAP_COLUMNS} FROM bootstrap_tokens
                     WHERE used = 0 AND expires_at > ?1
                     ORDER BY expires_at DESC
                     LIMIT 1"
                ),
                [format_ts(now)],
                map_bootstrap_token,
            )
            .optional()
        })
    }

    /// Look up an unused token by value, expired or not.
    pub fn find_unused_bootstrap_token(&self, token: &str) -> Result<Option<BootstrapTokenRow>> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {BOOTSTRAP_COLUMNS} FROM bootstrap_tokens WHERE token = ?1 AND used = 0"),
                [token],
                map_bootstrap_token,
            )
            .optional()
        })
    }

    /// Flip `used` to true. The flag never goes back.
    pub fn mark_bootstrap_token_used(&self, id: &str, now: DateTime<Utc>) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE bootstrap_tokens SET used = 1, updated_at = ?1 WHERE id = ?2 AND used = 0",
                rusqlite::params![format_ts(now), id],
            )?;
            Ok(changed > 0)
        })
    }
}

fn query_latest_share_for_doc(
    conn: &Connection,
    user_id: &str,
    doc_id: &str,
) -> Result<Option<ShareRow>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {SHARE_COLUMNS} FROM shares
         WHERE user_id = ?1 AND doc_id = ?2 AND deleted_at IS NULL
         ORDER BY created_at DESC, rowid DESC
         LIMIT 1"
    ))?;

    stmt.query_row([user_id, doc_id], map_share).optional()
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        api_token: row.get(3)?,
        is_active: row.get(4)?,
        created_at: get_ts(row, 5)?,
        updated_at: get_ts(row, 6)?,
    })
}

fn map_share(row: &Row<'_>) -> rusqlite::Result<ShareRow> {
    Ok(ShareRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        doc_id: row.get(2)?,
        doc_title: row.get(3)?,
        content: row.get(4)?,
        references: row.get(5)?,
        parent_share_id: row.get(6)?,
        require_password: row.get(7)?,
        password_hash: row.get(8)?,
        expire_at: get_ts(row, 9)?,
        is_public: row.get(10)?,
        view_count: row.get(11)?,
        created_at: get_ts(row, 12)?,
        updated_at: get_ts(row, 13)?,
    })
}

fn map_bootstrap_token(row: &Row<'_>) -> rusqlite::Result<BootstrapTokenRow> {
    Ok(BootstrapTokenRow {
        id: row.get(0)?,
        token: row.get(1)?,
        expires_at: get_ts(row, 2)?,
        used: row.get(3)?,
        created_at: get_ts(row, 4)?,
        updated_at: get_ts(row, 5)?,
    })
}

fn get_ts(row: &Row<'_>, idx: usize) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(idx)?;
    parse_ts(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp '{}'", raw).into(),
        )
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
