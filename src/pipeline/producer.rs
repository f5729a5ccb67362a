//! Capture producer loop.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info};

use super::transport::FrameTransport;
use super::PipelineStats;
use crate::capture::FramePool;

/// Drive the capture side of the pipeline: one frame per interval,
/// pushed onto the transport.
///
/// Pool exhaustion and sensor failures skip the cycle without pushing
/// anything, so no handle can leak on the capture side. A full
/// transport stalls the push until a consumer drains a slot; stalled
/// capture is the backpressure policy, frames are never dropped here.
pub async fn run_producer(
    mut pool: FramePool,
    transport: FrameTransport,
    interval: Duration,
    stats: Arc<PipelineStats>,
) {
    info!(
        interval_ms = interval.as_millis() as u64,
        "frame producer started"
    );

    loop {
        match pool.capture_frame() {
            Some(frame) => {
                debug!(
                    seq = frame.meta().sequence,
                    len = frame.len(),
                    "captured frame"
                );
                if transport.push(Some(frame)).await.is_err() {
                    error!("frame transport closed, producer exiting");
                    break;
                }
                stats.frames_captured.fetch_add(1, Ordering::Relaxed);
            }
            None => {
                stats.cycles_skipped.fetch_add(1, Ordering::Relaxed);
                debug!("no frame buffer available, skipping cycle");
            }
        }

        tokio::time::sleep(interval).await;
    }
}
