//! HTTP server bootstrap. Mirrors the teacher's `api::server::start_api_server`
//! (bind, serve, graceful shutdown on ctrl-c), rebased onto [`AppState`]
//! instead of `Arc<XdsState>`.

use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::errors::{Result, TvmError};

use super::routes::{build_router, AppState};

pub async fn start_api_server(config: &ServerConfig, state: AppState) -> Result<()> {
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| TvmError::config(format!("invalid API bind address: {e}")))?;

    let router: Router = build_router(state);

    info!(address = %addr, "starting HTTP API server");

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| TvmError::Io { source: e, context: format!("failed to bind API server to {addr}") })?;

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "shutdown signal listener failed");
            }
        })
        .await
        .map_err(|e| TvmError::Io { source: e, context: "API server error".to_string() })?;

    info!("API server shutdown completed");
    Ok(())
}
