//! HTTP surface. Paths and payloads follow the routes the web client calls.

mod budgets;
mod error;
mod expenses;
mod reports;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::application::LedgerService;

pub use error::{ApiError, ApiResult};

pub struct AppState {
    pub ledger: LedgerService,
}

pub fn app_router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(budgets::router())
        .merge(expenses::router())
        .merge(reports::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve the API until Ctrl-C.
pub async fn serve(ledger: LedgerService, addr: SocketAddr) -> anyhow::Result<()> {
    let router = app_router(Arc::new(AppState { ledger }));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(err) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %err, "failed to listen for shutdown signal");
            }
            tracing::info!("shutting down");
        })
        .await
        .context("Server error")?;
    Ok(())
}
