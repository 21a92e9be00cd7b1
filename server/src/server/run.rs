//! Router construction and the serve loop.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use axum::routing::{delete, get, post};
use axum::Router;

use super::{http, ws, AppState};

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/health", get(http::health))
        .route("/stats", get(http::stats))
        .route("/games", get(http::games))
        .route("/admin/games", post(http::create_game))
        .route("/admin/games/:id", delete(http::delete_game))
        .route("/admin/games/:id/stats", get(http::game_stats))
        .with_state(state)
}

/// Bind and serve until ctrl-c, then cancel every pool so sessions unwind.
pub async fn run_server(addr: SocketAddr, state: AppState) -> Result<()> {
    let app = build_router(state.clone());
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    tracing::info!(%addr, "felt server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving")?;

    state.manager.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
