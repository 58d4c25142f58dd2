//! Externally visible base URL used when embedding share links in responses.

use std::convert::Infallible;

use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};

/// Scheme + host of the service as the client sees it, without a trailing `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseUrl(pub String);

impl BaseUrl {
    /// Public link for a share id.
    pub fn share_url(&self, share_id: &str) -> String {
        format!("{}/s/{}", self.0, share_id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolution order: `X-Base-URL`, then proxy headers, then the request itself.
    pub fn from_parts(parts: &Parts) -> Self {
        Self::resolve(
            &parts.headers,
            parts.uri.scheme_str() == Some("https"),
            parts.uri.authority().map(|a| a.as_str()),
        )
    }

    fn resolve(headers: &HeaderMap, tls: bool, authority: Option<&str>) -> Self {
        if let Some(base) = header_str(headers, "x-base-url") {
            return Self(base.trim_end_matches('/').to_string());
        }

        let proto = header_str(headers, "x-forwarded-proto")
            .unwrap_or(if tls { "https" } else { "http" });
        let host = header_str(headers, "x-forwarded-host")
            .or_else(|| header_str(headers, header::HOST.as_str()))
            .or(authority)
            .unwrap_or_default();

        Self(format!("{}://{}", proto, host.trim_end_matches('/')))
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}

impl<S> FromRequestParts<S> for BaseUrl
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self::from_parts(parts))
    }
}
