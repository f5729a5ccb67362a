//! Built-in test-pattern sensor.
//!
//! Emits SOI/EOI marker-framed MJPEG payloads without touching any
//! hardware, so the full pipeline runs on machines with no camera.
//! The payload body is deterministic filler, not a decodable image;
//! bytes 2..10 carry the big-endian frame counter so consumers can
//! tell frames apart.

use bytes::BytesMut;

use super::frame::{FrameMetadata, PixelFormat};
use super::pool::{FrameSensor, SensorInfo};
use crate::error::Result;

pub struct SyntheticSensor {
    width: u32,
    height: u32,
    payload_len: usize,
    counter: u64,
}

impl SyntheticSensor {
    pub fn new(width: u32, height: u32) -> Self {
        Self::with_payload_len(width, height, 4096)
    }

    /// Small payloads keep pipeline tests cheap.
    pub fn with_payload_len(width: u32, height: u32, payload_len: usize) -> Self {
        Self {
            width,
            height,
            payload_len,
            counter: 0,
        }
    }
}

impl FrameSensor for SyntheticSensor {
    fn info(&self) -> SensorInfo {
        SensorInfo {
            model: "synthetic test pattern".into(),
            device: "none".into(),
            width: self.width,
            height: self.height,
            format: PixelFormat::Mjpeg,
        }
    }

    fn grab(&mut self, buf: &mut BytesMut) -> Result<FrameMetadata> {
        self.counter += 1;
        buf.extend_from_slice(&[0xFF, 0xD8]);
        buf.extend_from_slice(&self.counter.to_be_bytes());

        let mut word = self.counter ^ 0x9E37_79B9_7F4A_7C15;
        while buf.len() + 10 <= self.payload_len {
            word = word
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            buf.extend_from_slice(&word.to_be_bytes());
        }
        // Pad so every frame is exactly payload_len bytes.
        let body_end = self.payload_len.saturating_sub(2).max(buf.len());
        buf.resize(body_end, 0);
        buf.extend_from_slice(&[0xFF, 0xD9]);

        Ok(FrameMetadata {
            sequence: 0,
            width: self.width,
            height: self.height,
            format: PixelFormat::Mjpeg,
        })
    }
}
