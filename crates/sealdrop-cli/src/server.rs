//! Server startup and lifecycle

use crate::{routes, AppState, ServerConfig};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Run the gateway server
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let api_version = config.api_version.clone();
    let state = Arc::new(AppState::new(config));
    let app = routes::create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Sealdrop gateway listening on http://{addr} (api {api_version})");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Run the server with graceful shutdown
pub async fn run_server_with_shutdown(
    config: ServerConfig,
    shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let addr = config.bind_addr();
    let state = Arc::new(AppState::new(config));
    let app = routes::create_router(state);

    let listener = TcpListener::bind(&addr).await?;
    info!("Sealdrop gateway listening on http://{addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("gateway shutdown complete");
    Ok(())
}
