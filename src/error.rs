//! Error types for the frame pipeline.

/// Failure modes of the frame pipeline.
///
/// Producer-side problems (pool exhaustion, sensor hiccups) are
/// absorbed where they happen and never become one of these; consumers
/// only ever see the transport-level variants, and none of them is
/// fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum CameraError {
    /// No frame arrived on the transport within the deadline.
    #[error("timed out waiting for a frame")]
    FrameTimeout,

    /// Every producer handle for the transport is gone.
    #[error("frame transport closed")]
    TransportClosed,

    /// The sensor failed while grabbing an encoded frame.
    #[error("sensor I/O error: {0}")]
    Sensor(#[from] std::io::Error),
}

/// Convenience alias for `Result<T, CameraError>`.
pub type Result<T> = std::result::Result<T, CameraError>;
