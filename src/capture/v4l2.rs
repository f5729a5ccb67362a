//! V4L2 sensor with memory-mapped capture buffers

use std::io;

use bytes::BytesMut;
use color_eyre::{eyre::eyre, Result};
use tracing::info;
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use super::frame::{FrameMetadata, PixelFormat};
use super::pool::{FrameSensor, SensorInfo};
use crate::error::CameraError;
use crate::CaptureConfig;

/// Real camera hardware behind the frame pool.
pub struct V4l2Sensor {
    device: Box<Device>,
    stream: Option<MmapStream<'static>>,
    config: CaptureConfig,
    card: String,
}

impl V4l2Sensor {
    pub fn new(config: &CaptureConfig) -> Result<Self> {
        let mut config = config.clone();
        if config.device.is_empty() {
            let (path, format) = auto_detect_device()?;
            config.device = path;
            config.format = format;
        }
        info!("Initializing V4L2 capture: {}", config.device);

        let device = Device::with_path(&config.device)?;

        let caps = device.query_caps()?;
        info!("Device: {} ({})", caps.card, caps.driver);

        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(eyre!("Device doesn't support video capture"));
        }

        let mut fmt = device.format()?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = match config.format {
            PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
            PixelFormat::Yuyv4 => FourCC::new(b"YUYV"),
            _ => return Err(eyre!("Unsupported pixel format")),
        };
        device.set_format(&fmt)?;

        let card = caps.card.clone();
        Ok(Self {
            device: Box::new(device),
            stream: None,
            config,
            card,
        })
    }

    /// Start streaming with memory-mapped buffers
    pub fn start_stream(&mut self) -> Result<()> {
        let stream = MmapStream::with_buffers(
            &self.device,
            Type::VideoCapture,
            self.config.buffer_count as u32,
        )?;
        self.stream = Some(stream);
        info!(
            "Capture stream started with {} buffers",
            self.config.buffer_count
        );
        Ok(())
    }
}

impl FrameSensor for V4l2Sensor {
    fn info(&self) -> SensorInfo {
        SensorInfo {
            model: self.card.clone(),
            device: self.config.device.clone(),
            width: self.config.width,
            height: self.config.height,
            format: self.config.format,
        }
    }

    fn grab(&mut self, buf: &mut BytesMut) -> crate::error::Result<FrameMetadata> {
        let stream = self.stream.as_mut().ok_or_else(|| {
            CameraError::Sensor(io::Error::new(
                io::ErrorKind::NotConnected,
                "capture stream not started",
            ))
        })?;

        let (data, _meta) = stream.next()?;
        buf.extend_from_slice(data);

        Ok(FrameMetadata {
            sequence: 0,
            width: self.config.width,
            height: self.config.height,
            format: self.config.format,
        })
    }
}

/// Auto-detect best capture device
pub fn auto_detect_device() -> Result<(String, PixelFormat)> {
    use std::path::Path;

    info!("Auto-detecting capture devices...");

    for i in 0..10 {
        let path = format!("/dev/video{}", i);
        if !Path::new(&path).exists() {
            continue;
        }

        if let Ok(dev) = Device::with_path(&path) {
            if let Ok(caps) = dev.query_caps() {
                if caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
                    // Prefer devices with MJPEG support
                    if let Ok(formats) = dev.enum_formats() {
                        for fmt in formats {
                            if fmt.fourcc == FourCC::new(b"MJPG") {
                                info!("Found MJPEG device: {} - {}", path, caps.card);
                                return Ok((path, PixelFormat::Mjpeg));
                            } else if fmt.fourcc == FourCC::new(b"YUYV") {
                                info!("Found YUYV device: {} - {}", path, caps.card);
                                return Ok((path, PixelFormat::Yuyv4));
                            }
                        }
                    }
                }
            }
        }
    }

    Err(eyre!("No suitable capture device found"))
}
