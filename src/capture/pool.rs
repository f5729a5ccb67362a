//! Fixed-size frame buffer pool.
//!
//! The pool owns every capture buffer in the system. Handles checked
//! out via [`FramePool::capture_frame`] carry their buffer with them
//! through the transport and back; dropping the handle returns the
//! buffer here. When all buffers are out, capture reports exhaustion
//! instead of allocating more.

use std::sync::Arc;

use bytes::BytesMut;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::warn;

use super::frame::{FrameHandle, FrameMetadata, PixelFormat};
use crate::error::Result;

/// A device the pool pulls encoded frames from.
///
/// Implementations fill the pooled buffer with one sensor-encoded
/// frame per call; they do not retain the buffer.
pub trait FrameSensor: Send {
    /// Static identity and geometry, reported on `/hardware`.
    fn info(&self) -> SensorInfo;

    /// Fill `buf` with the next encoded frame and describe it.
    /// The returned metadata's `sequence` is overwritten by the pool.
    fn grab(&mut self, buf: &mut BytesMut) -> Result<FrameMetadata>;
}

/// Description of the sensor behind the pool.
#[derive(Debug, Clone, Serialize)]
pub struct SensorInfo {
    pub model: String,
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// Takes buffers back from dropped handles.
pub(crate) struct Recycler {
    free: Mutex<Vec<BytesMut>>,
}

impl Recycler {
    pub(crate) fn reclaim(&self, mut buf: BytesMut) {
        buf.clear();
        self.free.lock().push(buf);
    }
}

/// Fixed-size pool of reusable capture buffers over a [`FrameSensor`].
pub struct FramePool {
    sensor: Box<dyn FrameSensor>,
    recycler: Arc<Recycler>,
    sequence: u64,
}

impl FramePool {
    pub fn new(sensor: Box<dyn FrameSensor>, buffer_count: usize, buffer_capacity: usize) -> Self {
        let free = (0..buffer_count)
            .map(|_| BytesMut::with_capacity(buffer_capacity))
            .collect();
        Self {
            sensor,
            recycler: Arc::new(Recycler {
                free: Mutex::new(free),
            }),
            sequence: 0,
        }
    }

    pub fn sensor_info(&self) -> SensorInfo {
        self.sensor.info()
    }

    /// Pull one frame from the sensor into a pooled buffer.
    ///
    /// Returns `None` when every buffer is checked out or the sensor
    /// fails; both are non-fatal and the producer skips the cycle.
    pub fn capture_frame(&mut self) -> Option<FrameHandle> {
        let mut buf = self.recycler.free.lock().pop()?;
        buf.clear();
        match self.sensor.grab(&mut buf) {
            Ok(mut meta) => {
                self.sequence += 1;
                meta.sequence = self.sequence;
                Some(FrameHandle::new(buf, meta, Arc::clone(&self.recycler)))
            }
            Err(e) => {
                warn!("sensor grab failed: {e}");
                self.recycler.reclaim(buf);
                None
            }
        }
    }

    /// Number of buffers currently free for capture.
    pub fn available(&self) -> usize {
        self.recycler.free.lock().len()
    }
}
