//! Status endpoint
//!
//! Routes:
//! - `GET /health` answers `ok` while the process is alive
//! - `GET /status` returns the [`AgentHealth`] snapshot as JSON
//!
//! Only started when a status address is configured.

use crate::health::{AgentHealth, HealthTracker};
use axum::{extract::State, routing::get, Json, Router};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

pub fn build_router(health: HealthTracker) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/status", get(get_status))
        .with_state(health)
}

async fn get_status(State(health): State<HealthTracker>) -> Json<AgentHealth> {
    Json(health.snapshot())
}

/// Bind `addr` and serve in the background until `shutdown` flips to true
///
/// Binding errors are returned so they stay startup-fatal. The handle
/// resolves once the server has drained after shutdown.
pub async fn spawn_status_server(
    addr: SocketAddr,
    health: HealthTracker,
    mut shutdown: watch::Receiver<bool>,
) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!("Status endpoint listening on http://{local}");

    let app = build_router(health);
    let handle = tokio::spawn(async move {
        let stop = async move {
            while !*shutdown.borrow() {
                if shutdown.changed().await.is_err() {
                    break;
                }
            }
        };
        if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(stop).await {
            error!("Status endpoint failed: {}", e);
        }
    });

    Ok((local, handle))
}
