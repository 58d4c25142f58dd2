use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          TEXT PRIMARY KEY,
                username    TEXT NOT NULL,
                email       TEXT NOT NULL,
                api_token   TEXT NOT NULL,
                is_active   INTEGER NOT NULL DEFAULT 1,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL,
                deleted_at  TEXT
            );

            -- Uniqueness only binds live rows
            CREATE UNIQUE INDEX idx_users_username ON users(username) WHERE deleted_at IS NULL;
            CREATE UNIQUE INDEX idx_users_email ON users(email) WHERE deleted_at IS NULL;
            CREATE UNIQUE INDEX idx_users_api_token ON users(api_token) WHERE deleted_at IS NULL;

            CREATE TABLE shares (
                id                TEXT PRIMARY KEY,
                user_id           TEXT NOT NULL REFERENCES users(id),
                doc_id            TEXT NOT NULL,
                doc_title         TEXT NOT NULL,
                content           TEXT NOT NULL,
                block_refs        TEXT,
                parent_share_id   TEXT,
                require_password  INTEGER NOT NULL DEFAULT 0,
                password_hash     TEXT NOT NULL DEFAULT '',
                expire_at         TEXT NOT NULL,
                is_public         INTEGER NOT NULL DEFAULT 1,
                view_count        INTEGER NOT NULL DEFAULT 0,
                created_at        TEXT NOT NULL,
                updated_at        TEXT NOT NULL,
                deleted_at        TEXT
            );

            CREATE INDEX idx_shares_user_doc ON shares(user_id, doc_id);
            CREATE INDEX idx_shares_expire_at ON shares(expire_at);
            CREATE INDEX idx_shares_deleted_at ON shares(deleted_at);

            CREATE TABLE bootstrap_tokens (
                id          TEXT PRIMARY KEY,
                token       TEXT NOT NULL UNIQUE,
                expires_at  TEXT NOT NULL,
                used        INTEGER NOT NULL DEFAULT 0,
                created_at  TEXT NOT NULL,
                updated_at  TEXT NOT NULL
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}
