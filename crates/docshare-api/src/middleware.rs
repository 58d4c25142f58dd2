use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::debug;

use crate::error::ApiError;
use crate::{AppState, blocking};

const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOWED_HEADERS: &str =
    "Content-Type, Content-Length, Authorization, X-Base-URL, X-Bootstrap-Token";

/// Identity of the caller, attached to the request by [`require_auth`].
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: String,
    pub username: String,
}

/// Resolve `Authorization: Bearer <token>` to an active user.
/// Any failure rejects the request before the handler runs.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::Unauthenticated("Authorization header required".into()))?;

    let token = parse_bearer(auth_header).ok_or_else(|| {
        ApiError::Unauthenticated("Invalid authorization header format".into())
    })?;

    let token = token.to_string();
    let user = blocking(move || Ok(state.db.get_active_user_by_token(&token)?))
        .await?
        .ok_or_else(|| {
            debug!("Rejected request with unknown or inactive token");
            ApiError::Unauthenticated("Invalid or inactive token".into())
        })?;

    req.extensions_mut().insert(AuthUser {
        user_id: user.id,
        username: user.username,
    });
    Ok(next.run(req).await)
}

/// Split `Bearer <token>`; the scheme is matched exactly.
fn parse_bearer(value: &str) -> Option<&str> {
    match value.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() => Some(token),
        _ => None,
    }
}

/// Mirror the caller's origin and answer every preflight with 204.
pub async fn cors(req: Request, next: Next) -> Response {
    let origin = req.headers().get(header::ORIGIN).cloned();

    let mut response = if req.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(req).await
    };

    apply_cors_headers(response.headers_mut(), origin);
    response
}

fn apply_cors_headers(headers: &mut HeaderMap, origin: Option<HeaderValue>) {
    match origin {
        Some(origin) => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, origin);
            headers.insert(header::VARY, HeaderValue::from_static("Origin"));
        }
        None => {
            headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
        }
    }
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOWED_HEADERS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOWED_METHODS),
    );
}
