//! REST server startup

use anyhow::{Context, Result};
use axum::serve;
use std::net::SocketAddr;
use std::path::Path;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::server::{routing::create_router, state::AppState};

/// Load the artifact bundle from `artifact_dir`, then serve on `addr`.
///
/// A bundle that cannot be loaded is returned as an error before the
/// listener is bound, so no request is ever served without a model.
#[cfg(not(tarpaulin_include))] // Skip coverage - server lifecycle
pub async fn start_server(addr: SocketAddr, artifact_dir: &Path) -> Result<()> {
  let state = AppState::load(artifact_dir)
    .with_context(|| format!("Failed to load artifact bundle from {}", artifact_dir.display()))?;

  info!(%addr, artifact_dir = %artifact_dir.display(), "Starting price prediction server");

  let app = create_router(state).layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()));

  let listener = TcpListener::bind(addr).await.with_context(|| format!("Failed to bind {addr}"))?;
  info!(%addr, "Server listening");

  serve(listener, app).with_graceful_shutdown(shutdown_signal()).await.context("Server error")?;

  info!("Server shutdown gracefully");
  Ok(())
}

#[cfg(not(tarpaulin_include))]
async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    warn!(error = %e, "Failed to listen for shutdown signal");
    std::future::pending::<()>().await;
  }
}
