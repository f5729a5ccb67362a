pub mod producer;
pub mod transport;

pub use producer::run_producer;
pub use transport::{FrameSlot, FrameTransport};

use std::sync::atomic::AtomicU64;

/// Counters shared between the producer and the HTTP handlers,
/// surfaced on `/status`.
#[derive(Debug, Default)]
pub struct PipelineStats {
    pub frames_captured: AtomicU64,
    pub cycles_skipped: AtomicU64,
    pub frames_served: AtomicU64,
    pub streams_opened: AtomicU64,
}
