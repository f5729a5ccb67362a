use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use serde::{Deserialize, Serialize};

use super::pool::Recycler;

/// Pixel formats the sensor can deliver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    Mjpeg,
    Yuyv4,
    Rgb24,
}

impl PixelFormat {
    /// MIME type of the sensor-native encoding.
    pub fn mime(self) -> &'static str {
        match self {
            PixelFormat::Mjpeg => "image/jpeg",
            PixelFormat::Yuyv4 | PixelFormat::Rgb24 => "application/octet-stream",
        }
    }
}

/// Frame metadata
#[derive(Debug, Clone, Copy)]
pub struct FrameMetadata {
    pub sequence: u64,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
}

/// An owned reference to one captured frame.
///
/// The backing buffer belongs to the [`FramePool`](super::FramePool)
/// that produced the handle and goes back to its free list when the
/// handle drops. That makes the release contract structural: exactly
/// one live owner at any time (producer, transport slot, then one
/// consumer) and exactly one release per handle, on every exit path.
pub struct FrameHandle {
    data: BytesMut,
    meta: FrameMetadata,
    timestamp: Instant,
    recycler: Arc<Recycler>,
}

impl FrameHandle {
    pub(crate) fn new(data: BytesMut, meta: FrameMetadata, recycler: Arc<Recycler>) -> Self {
        Self {
            data,
            meta,
            timestamp: Instant::now(),
            recycler,
        }
    }

    /// Raw encoded payload.
    pub fn payload(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn meta(&self) -> &FrameMetadata {
        &self.meta
    }

    /// Capture timestamp for latency tracking
    pub fn timestamp(&self) -> Instant {
        self.timestamp
    }

    /// Copy the payload out for handoff to an HTTP response body.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.data)
    }
}

impl Drop for FrameHandle {
    fn drop(&mut self) {
        self.recycler.reclaim(std::mem::take(&mut self.data));
    }
}

impl fmt::Debug for FrameHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameHandle")
            .field("meta", &self.meta)
            .field("len", &self.data.len())
            .finish()
    }
}
