pub mod base_url;
pub mod bootstrap;
pub mod error;
pub mod health;
pub mod middleware;
pub mod references;
pub mod routes;
pub mod shares;
pub mod spa;
pub mod users;
pub mod view;

use std::sync::Arc;

use docshare_db::Database;

pub use error::{ApiError, ApiResult};
pub use routes::router;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    /// Reported verbatim by `/api/health`.
    pub mode: String,
}

/// Run blocking store or hashing work off the async runtime.
pub(crate) async fn blocking<F, T>(f: F) -> ApiResult<T>
where
    F: FnOnce() -> ApiResult<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
