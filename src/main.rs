//! Obscura: bounded camera frame pipeline with HTTP still-capture and
//! MJPEG live-stream endpoints.

use std::sync::Arc;
use std::time::Duration;

use color_eyre::Result;
use tracing::info;

use obscura::capture::{FramePool, FrameSensor};
use obscura::pipeline::{run_producer, FrameTransport, PipelineStats};
use obscura::server::{self, AppContext};
use obscura::Config;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "obscura=debug".into()))
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Obscura launching...");

    // Load configuration
    let config = Config::load(std::env::args().nth(1).as_deref())?;
    obscura::CONFIG.store(Arc::new(config.clone()));

    // Frame buffer pool over the configured sensor
    let sensor = build_sensor(&config)?;
    let buffer_capacity = (config.capture.width * config.capture.height * 3) as usize;
    let pool = FramePool::new(sensor, config.capture.buffer_count, buffer_capacity);
    let sensor_info = pool.sensor_info();
    info!("Using sensor: {} ({})", sensor_info.model, sensor_info.device);

    // Bounded transport between the producer and the HTTP consumers
    let transport = FrameTransport::new(config.pipeline.queue_depth);
    let stats = Arc::new(PipelineStats::default());

    // Spawn capture task
    let _producer_handle = tokio::spawn(run_producer(
        pool,
        transport.clone(),
        Duration::from_millis(config.capture.interval_ms),
        stats.clone(),
    ));

    let ctx = AppContext::new(transport, stats, sensor_info, config.server.max_connections);
    server::serve(&config.server, ctx).await?;

    info!("Obscura shutting down");
    Ok(())
}

#[cfg(feature = "v4l2")]
fn build_sensor(config: &Config) -> Result<Box<dyn FrameSensor>> {
    use obscura::capture::v4l2::V4l2Sensor;

    let mut sensor = V4l2Sensor::new(&config.capture)?;
    sensor.start_stream()?;
    Ok(Box::new(sensor))
}

#[cfg(not(feature = "v4l2"))]
fn build_sensor(config: &Config) -> Result<Box<dyn FrameSensor>> {
    use obscura::capture::SyntheticSensor;

    info!("v4l2 feature disabled, using synthetic sensor");
    Ok(Box::new(SyntheticSensor::new(
        config.capture.width,
        config.capture.height,
    )))
}
