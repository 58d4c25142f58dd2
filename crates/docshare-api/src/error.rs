//! API error type and its JSON envelope rendering.

use axum::Json;
use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use docshare_crypto::CryptoError;
use docshare_db::DbError;
use docshare_types::ApiResponse;
use tracing::error;

/// Business code carried in the body of every error response.
pub const ERROR_CODE: i32 = 1;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Gone(String),

    #[error("{0}")]
    Storage(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Gone(_) => StatusCode::GONE,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e {
            DbError::NotFound(msg) => Self::NotFound(msg),
            DbError::Conflict(msg) => Self::Conflict(msg),
            DbError::Storage(msg) => Self::Storage(msg),
        }
    }
}

impl From<CryptoError> for ApiError {
    fn from(e: CryptoError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::BadRequest(format!("Invalid request: {}", rejection.body_text()))
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(e: tokio::task::JoinError) -> Self {
        error!("spawn_blocking join error: {}", e);
        Self::Storage("internal task failed".to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("request failed: {}", self);
        }
        (status, Json(ApiResponse::error(ERROR_CODE, self.to_string()))).into_response()
    }
}

/// Result type for API handlers.
pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ApiError::BadRequest(String::new()).status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Unauthenticated(String::new()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(ApiError::NotFound(String::new()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::Gone(String::new()).status_code(), StatusCode::GONE);
        assert_eq!(ApiError::Storage(String::new()).status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn db_conflict_maps_to_conflict() {
        let err: ApiError = DbError::Conflict("dup".into()).into();
        assert_eq!(err.status_code(), StatusCode::CONFLICT);
    }
}
