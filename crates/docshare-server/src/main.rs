use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use docshare_api::bootstrap::{self, BootstrapStatus};
use docshare_api::{AppState, AppStateInner};
use docshare_server::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "docshare=debug,docshare_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    bootstrap::create_data_dir(&config.data_dir).with_context(|| {
        format!("cannot create data directory {}", config.data_dir.display())
    })?;

    let db = docshare_db::Database::open(&config.db_path())?;

    match bootstrap::ensure_bootstrap_token(&db, &config.data_dir) {
        Ok(BootstrapStatus::UsersExist) => {}
        Ok(BootstrapStatus::Existing(token)) => info!(
            "Bootstrap token still valid until {}. File: {}",
            token.expires_at,
            config.data_dir.join(bootstrap::BOOTSTRAP_TOKEN_FILE).display()
        ),
        Ok(BootstrapStatus::Minted { .. }) => {}
        Err(e) => warn!("Failed to prepare bootstrap token: {:#}", e),
    }

    let state: AppState = Arc::new(AppStateInner {
        db,
        mode: config.mode.clone(),
    });
    let app = docshare_api::router(state);

    let addr = config.listen_addr()?;
    info!("docshare {} listening on {} (mode {})", env!("CARGO_PKG_VERSION"), addr, config.mode);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
