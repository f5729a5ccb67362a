//! HTTP surface: routing, shared state, server bring-up.

use std::sync::Arc;
use std::time::Instant;

use axum::routing::get;
use axum::Router;
use color_eyre::Result;
use tokio::sync::Semaphore;
use tracing::{error, info};

use crate::capture::SensorInfo;
use crate::pipeline::{FrameTransport, PipelineStats};
use crate::ServerConfig;

pub mod handlers;

pub use handlers::{POP_TIMEOUT, STREAM_BOUNDARY};

/// Shared application context
#[derive(Clone)]
pub struct AppContext {
    pub transport: FrameTransport,
    pub stats: Arc<PipelineStats>,
    pub sensor: Arc<SensorInfo>,
    /// Consumer connection budget. A stream holds one permit for its
    /// entire life, so saturated slots starve new consumers; accepted
    /// behavior, mirrored from the original listener's socket cap.
    pub slots: Arc<Semaphore>,
    pub started: Instant,
}

impl AppContext {
    pub fn new(
        transport: FrameTransport,
        stats: Arc<PipelineStats>,
        sensor: SensorInfo,
        max_connections: usize,
    ) -> Self {
        Self {
            transport,
            stats,
            sensor: Arc::new(sensor),
            slots: Arc::new(Semaphore::new(max_connections)),
            started: Instant::now(),
        }
    }
}

/// Create the router with all routes.
pub fn create_router(ctx: AppContext) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/capture", get(handlers::capture))
        .route("/stream", get(handlers::stream))
        .route("/status", get(handlers::status))
        .route("/hardware", get(handlers::hardware))
        .with_state(ctx)
}

/// Bind and serve until ctrl-c.
pub async fn serve(config: &ServerConfig, ctx: AppContext) -> Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "web server listening");

    axum::serve(listener, create_router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to install ctrl-c handler: {e}");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
