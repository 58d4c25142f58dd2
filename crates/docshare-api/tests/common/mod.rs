//! Shared helpers for the HTTP-level tests.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use docshare_api::bootstrap::{BOOTSTRAP_HEADER, BootstrapStatus, ensure_bootstrap_token};
use docshare_api::{AppState, AppStateInner, router};
use docshare_db::Database;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

pub const HOST: &str = "localhost:8080";
pub const BASE_URL: &str = "http://localhost:8080";

/// A router backed by a throwaway data directory.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    pub data_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    pub fn new() -> Self {
        let data_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db = Database::open(&data_dir.path().join("docshare.db")).expect("Failed to open database");
        let state: AppState = Arc::new(AppStateInner {
            db,
            mode: "test".to_string(),
        });
        let router = router(state.clone());

        Self {
            router,
            state,
            data_dir,
        }
    }

    /// Mint a bootstrap token the way start-up does and return its value.
    pub fn mint_bootstrap_token(&self) -> String {
        match ensure_bootstrap_token(&self.state.db, self.data_dir.path()).expect("mint failed") {
            BootstrapStatus::Minted { token, .. } | BootstrapStatus::Existing(token) => token.token,
            BootstrapStatus::UsersExist => panic!("users already exist"),
        }
    }

    /// Bootstrap a user and return its API token.
    pub async fn bootstrap_user(&self) -> String {
        let token = self.mint_bootstrap_token();
        let (status, body) = self
            .send(
                Request::builder()
                    .method("POST")
                    .uri("/api/bootstrap")
                    .header(BOOTSTRAP_HEADER, token)
                    .header("Content-Type", "application/json")
                    .body(Body::from(
                        json!({"username": "alice", "email": "alice@example.com"}).to_string(),
                    ))
                    .unwrap(),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "bootstrap failed: {body}");
        body["data"]["apiToken"].as_str().unwrap().to_string()
    }

    pub async fn json_request(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        auth_token: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri).header("Host", HOST);

        if let Some(token) = auth_token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }

        let body = match body {
            Some(v) => {
                builder = builder.header("Content-Type", "application/json");
                Body::from(serde_json::to_vec(&v).unwrap())
            }
            None => Body::empty(),
        };

        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let json: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    /// Create a share and return the `data` object of the response.
    pub async fn create_share(&self, token: &str, body: Value) -> Value {
        let (status, resp) = self
            .json_request("POST", "/api/share/create", Some(body), Some(token))
            .await;
        assert_eq!(status, StatusCode::OK, "create failed: {resp}");
        resp["data"].clone()
    }
}

/// Minimal valid create body.
#[allow(dead_code)]
pub fn share_body(doc_id: &str) -> Value {
    json!({
        "docId": doc_id,
        "docTitle": "T",
        "content": "C",
        "expireDays": 7,
        "isPublic": true,
    })
}
