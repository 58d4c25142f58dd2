//! Embedded single-page front-end and the catch-all route that serves it.

use std::borrow::Cow;
use std::path::Path;

use axum::Json;
use axum::http::{StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use rust_embed::RustEmbed;

use docshare_types::ApiResponse;

const CACHE_IMMUTABLE: &str = "public, max-age=31536000, immutable";
const CACHE_NONE: &str = "no-cache";
const HTML_MIME: &str = "text/html; charset=utf-8";
const INDEX: &str = "index.html";

#[derive(RustEmbed)]
#[folder = "dist"]
struct Assets;

/// Fallback for every path no route matched.
pub async fn spa_fallback(uri: Uri) -> Response {
    let path = uri.path();

    if path == "/api" || path.starts_with("/api/") {
        return (
            StatusCode::NOT_FOUND,
            Json(ApiResponse::error(404, "not found")),
        )
            .into_response();
    }
    if path.contains("..") {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error(400, "invalid path")),
        )
            .into_response();
    }

    let asset = path.trim_start_matches('/');
    if Path::new(asset).extension().is_some() {
        if let Some(file) = Assets::get(asset) {
            return asset_response(asset, file.data);
        }
    }

    index()
}

fn asset_response(path: &str, data: Cow<'static, [u8]>) -> Response {
    if path.ends_with(".html") {
        return html(data);
    }

    let mime = match mime_guess::from_path(path).first() {
        Some(mime) => mime.to_string(),
        None => sniff(&data).to_string(),
    };

    (
        [
            (header::CONTENT_TYPE, mime),
            (header::CACHE_CONTROL, CACHE_IMMUTABLE.to_string()),
        ],
        data,
    )
        .into_response()
}

fn index() -> Response {
    match Assets::get(INDEX) {
        Some(file) => html(file.data),
        None => (StatusCode::NOT_FOUND, "front-end not bundled").into_response(),
    }
}

fn html(data: Cow<'static, [u8]>) -> Response {
    (
        [
            (header::CONTENT_TYPE, HTML_MIME),
            (header::CACHE_CONTROL, CACHE_NONE),
        ],
        data,
    )
        .into_response()
}

/// Content-type for files whose extension `mime_guess` does not know.
fn sniff(data: &[u8]) -> &'static str {
    if std::str::from_utf8(data).is_ok() {
        "text/plain; charset=utf-8"
    } else {
        "application/octet-stream"
    }
}
