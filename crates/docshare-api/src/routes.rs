use axum::{
    Router, middleware,
    routing::{delete, get, post},
};
use tower_http::trace::TraceLayer;

use crate::middleware::{cors, require_auth};
use crate::{AppState, bootstrap, health, shares, spa, users, view};

/// Full application router: public API, token-protected API and the SPA fallback.
pub fn router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/health", get(health::health))
        .route("/api/bootstrap", post(bootstrap::bootstrap))
        .route("/api/s/{id}", get(view::get_share));

    let protected_routes = Router::new()
        .route("/api/auth/health", get(health::auth_health))
        .route("/api/share/create", post(shares::create_share))
        .route("/api/share/list", get(shares::list_shares))
        .route("/api/share/batch", delete(shares::delete_shares_batch))
        .route("/api/share/{id}", delete(shares::delete_share))
        .route("/api/user/me", get(users::me))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .fallback(spa::spa_fallback)
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(cors))
        .with_state(state)
}
