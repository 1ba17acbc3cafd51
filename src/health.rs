// src/health.rs
//! Liveness endpoint. Runs independently of cycle execution and stops on the
//! same cancellation token as the scheduler, with a bounded grace period.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, routing::get, Router};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::metrics::Metrics;

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_GRACE: Duration = Duration::from_secs(5);

/// `GET /health`, plus `/metrics` when a recorder is installed.
pub fn router(metrics: Option<&Metrics>) -> Router {
    let mut app = Router::new().route("/health", get(health));
    if let Some(m) = metrics {
        app = app.merge(m.router());
    }
    app.layer(TraceLayer::new_for_http())
}

async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

pub struct LivenessServer {
    addr: SocketAddr,
    handle: JoinHandle<anyhow::Result<()>>,
}

impl LivenessServer {
    /// Bind `0.0.0.0:port` and serve until `cancel` fires.
    pub async fn start(port: u16, app: Router, cancel: CancellationToken) -> std::io::Result<Self> {
        Self::start_on(SocketAddr::from(([0, 0, 0, 0], port)), app, cancel).await
    }

    pub async fn start_on(
        addr: SocketAddr,
        app: Router,
        cancel: CancellationToken,
    ) -> std::io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;
        info!(%addr, "starting health check server");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { cancel.cancelled_owned().await })
                .await
                .context("health check server")
        });
        Ok(Self { addr, handle })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to wind down after cancellation, at most `grace`.
    /// Returns `true` if it stopped gracefully.
    pub async fn shutdown(self, grace: Duration) -> bool {
        let mut handle = self.handle;
        match tokio::time::timeout(grace, &mut handle).await {
            Ok(Ok(Ok(()))) => {
                info!("health server shut down gracefully");
                true
            }
            Ok(Ok(Err(e))) => {
                warn!(error = %format!("{e:#}"), "error shutting down health server");
                false
            }
            Ok(Err(join_err)) => {
                warn!(error = %join_err, "health server task failed");
                false
            }
            Err(_) => {
                warn!(grace_secs = grace.as_secs_f64(), "health server did not stop in time, aborting");
                handle.abort();
                false
            }
        }
    }
}
