//! One-shot provisioning of the first user.
//!
//! While the user table is empty the server keeps a single live bootstrap
//! token and writes it to `<DATA_DIR>/bootstrap_token.txt`. Presenting that
//! token in `X-Bootstrap-Token` to `POST /api/bootstrap` creates the first
//! user and burns the token.

use std::fs::{self, DirBuilder, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::HeaderMap,
};
use chrono::Duration;
use tracing::info;

use docshare_db::Database;
use docshare_db::models::{BootstrapTokenRow, UserRow};
use docshare_types::ApiResponse;
use docshare_types::api::{BootstrapRequest, BootstrapResponse};

use crate::error::{ApiError, ApiResult};
use crate::{AppState, blocking};

pub const BOOTSTRAP_TOKEN_FILE: &str = "bootstrap_token.txt";
pub const BOOTSTRAP_HEADER: &str = "x-bootstrap-token";

/// Lifetime of a freshly minted bootstrap token.
pub const BOOTSTRAP_TOKEN_TTL_MINUTES: i64 = 15;

/// Result of [`ensure_bootstrap_token`].
#[derive(Debug)]
pub enum BootstrapStatus {
    /// Users already exist; bootstrap is closed.
    UsersExist,
    /// A live unused token was already on record and is kept.
    Existing(BootstrapTokenRow),
    /// A new token was created and written to `path`.
    Minted { token: BootstrapTokenRow, path: PathBuf },
}

/// Make sure a live bootstrap token exists while there are no users.
/// Called once at start-up.
pub fn ensure_bootstrap_token(db: &Database, data_dir: &Path) -> anyhow::Result<BootstrapStatus> {
    if db.count_users()? > 0 {
        return Ok(BootstrapStatus::UsersExist);
    }

    let now = docshare_db::now();
    if let Some(existing) = db.find_live_bootstrap_token(now)? {
        return Ok(BootstrapStatus::Existing(existing));
    }

    let token = BootstrapTokenRow {
        id: docshare_crypto::hex_token(docshare_crypto::ids::ID_BYTES)?,
        token: docshare_crypto::hex_token(docshare_crypto::ids::TOKEN_BYTES)?,
        expires_at: now + Duration::minutes(BOOTSTRAP_TOKEN_TTL_MINUTES),
        used: false,
        created_at: now,
        updated_at: now,
    };
    db.insert_bootstrap_token(&token)?;

    let path = write_token_file(data_dir, &token.token)?;
    info!(
        "Bootstrap token generated. Expires in {}m. File: {}",
        BOOTSTRAP_TOKEN_TTL_MINUTES,
        path.display()
    );
    Ok(BootstrapStatus::Minted { token, path })
}

/// Create `dir` (and parents) with mode 0755.
pub fn create_data_dir(dir: &Path) -> std::io::Result<()> {
    let mut builder = DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o755);
    }
    builder.create(dir)
}

/// Write `token` plus a newline to the bootstrap file, readable by the owner only.
fn write_token_file(data_dir: &Path, token: &str) -> std::io::Result<PathBuf> {
    create_data_dir(data_dir)?;
    let path = data_dir.join(BOOTSTRAP_TOKEN_FILE);

    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(&path)?;
    file.write_all(format!("{}\n", token).as_bytes())?;

    // `mode` only applies when the file is created
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o600))?;
    }

    Ok(path)
}

/// POST /api/bootstrap: create the first user.
pub async fn bootstrap(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<BootstrapRequest>, JsonRejection>,
) -> ApiResult<Json<ApiResponse<BootstrapResponse>>> {
    let presented = headers
        .get(BOOTSTRAP_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string);
    // Body problems are reported only after the token checks pass.
    let payload = payload.map(|Json(req)| req).map_err(ApiError::from);

    let response = blocking(move || consume_bootstrap(&state.db, presented, payload)).await?;
    Ok(Json(ApiResponse::success(response)))
}

fn consume_bootstrap(
    db: &Database,
    presented: Option<String>,
    payload: ApiResult<BootstrapRequest>,
) -> ApiResult<BootstrapResponse> {
    if db.count_users()? > 0 {
        return Err(ApiError::BadRequest(
            "Bootstrap not allowed: users already exist".into(),
        ));
    }

    let presented = presented.ok_or_else(|| {
        ApiError::Unauthenticated("X-Bootstrap-Token header required".into())
    })?;

    let token = db
        .find_unused_bootstrap_token(&presented)?
        .ok_or_else(|| ApiError::Unauthenticated("Invalid bootstrap token".into()))?;

    let now = docshare_db::now();
    if token.is_expired_at(now) {
        return Err(ApiError::Unauthenticated("Bootstrap token expired".into()));
    }

    let req = payload?;
    let username = req.username.trim();
    let email = req.email.trim();
    if username.is_empty() || email.is_empty() {
        return Err(ApiError::BadRequest(
            "Invalid request: username and email are required".into(),
        ));
    }

    let user = UserRow {
        id: docshare_crypto::user_id()?,
        username: username.to_string(),
        email: email.to_string(),
        api_token: docshare_crypto::api_token()?,
        is_active: true,
        created_at: now,
        updated_at: now,
    };
    db.create_user(&user)?;
    db.mark_bootstrap_token_used(&token.id, now)?;

    info!("Bootstrap completed: created user {} ({})", user.id, user.username);
    Ok(BootstrapResponse {
        user_id: user.id,
        api_token: user.api_token,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(username: &str, email: &str) -> ApiResult<BootstrapRequest> {
        Ok(BootstrapRequest {
            username: username.to_string(),
            email: email.to_string(),
        })
    }

    fn minted(db: &Database, dir: &Path) -> BootstrapTokenRow {
        match ensure_bootstrap_token(db, dir).unwrap() {
            BootstrapStatus::Minted { token, .. } => token,
            other => panic!("expected a new token, got {other:?}"),
        }
    }

    #[test]
    fn mints_once_and_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let data_dir = dir.path().join("data");
        let db = Database::open_in_memory().unwrap();

        let token = minted(&db, &data_dir);
        assert_eq!(token.token.len(), 64);
        assert_eq!(token.id.len(), 32);

        let written = fs::read_to_string(data_dir.join(BOOTSTRAP_TOKEN_FILE)).unwrap();
        assert_eq!(written, format!("{}\n", token.token));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(data_dir.join(BOOTSTRAP_TOKEN_FILE))
                .unwrap()
                .permissions()
                .mode();
            assert_eq!(mode & 0o777, 0o600);
        }

        match ensure_bootstrap_token(&db, &data_dir).unwrap() {
            BootstrapStatus::Existing(existing) => assert_eq!(existing.id, token.id),
            other => panic!("expected the existing token, got {other:?}"),
        }
    }

    #[test]
    fn consume_creates_user_and_burns_token() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let token = minted(&db, dir.path());

        let resp = consume_bootstrap(&db, Some(token.token.clone()), request("alice", "a@x")).unwrap();
        assert!(resp.user_id.starts_with("user_"));
        assert_eq!(resp.api_token.len(), 64);
        assert!(db.find_unused_bootstrap_token(&token.token).unwrap().is_none());

        let again = consume_bootstrap(&db, Some(token.token), request("bob", "b@x")).unwrap_err();
        assert!(matches!(again, ApiError::BadRequest(_)));

        assert!(matches!(
            ensure_bootstrap_token(&db, dir.path()).unwrap(),
            BootstrapStatus::UsersExist
        ));
    }

    #[test]
    fn consume_rejects_missing_wrong_and_expired_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let token = minted(&db, dir.path());

        let missing = consume_bootstrap(&db, None, request("a", "a@x")).unwrap_err();
        assert!(matches!(missing, ApiError::Unauthenticated(_)));

        let wrong = consume_bootstrap(&db, Some("nope".into()), request("a", "a@x")).unwrap_err();
        assert!(matches!(wrong, ApiError::Unauthenticated(_)));

        db.with_conn(|conn| {
            conn.execute(
                "UPDATE bootstrap_tokens SET expires_at = ?1 WHERE id = ?2",
                (docshare_db::format_ts(docshare_db::now() - Duration::seconds(1)), &token.id),
            )?;
            Ok(())
        })
        .unwrap();
        let expired = consume_bootstrap(&db, Some(token.token), request("a", "a@x")).unwrap_err();
        assert_eq!(expired.to_string(), "Bootstrap token expired");
        assert_eq!(db.count_users().unwrap(), 0);
    }

    #[test]
    fn consume_validates_body_after_token() {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_in_memory().unwrap();
        let token = minted(&db, dir.path());

        let err = consume_bootstrap(&db, Some(token.token.clone()), request(" ", "a@x")).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
        // The token survives a rejected body.
        assert!(db.find_unused_bootstrap_token(&token.token).unwrap().is_some());
    }
}
