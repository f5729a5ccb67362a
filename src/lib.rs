pub mod capture;
pub mod error;
pub mod pipeline;
pub mod server;

use arc_swap::ArcSwap;
use capture::frame::PixelFormat;
use serde::{Deserialize, Serialize};

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// System configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub server: ServerConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Device path for hardware sensors; empty means auto-detect.
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    /// How many frame buffers the pool pre-allocates. All of them
    /// checked out at once means capture cycles are skipped.
    pub buffer_count: usize,
    /// Fixed delay between capture cycles.
    pub interval_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Concurrent consumer budget; a live stream holds one slot for
    /// its entire duration.
    pub max_connections: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Frame queue capacity between the producer and consumers.
    pub queue_depth: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig::default(),
            server: ServerConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".into(),
            width: 800,
            height: 600,
            format: PixelFormat::Mjpeg,
            buffer_count: 4,
            interval_ms: 100,
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            max_connections: 2,
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self { queue_depth: 2 }
    }
}

impl Config {
    /// Load configuration from an optional TOML file plus `OBSCURA_*`
    /// environment overrides, falling back to defaults.
    pub fn load(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let builder = match path {
            Some(p) => config::Config::builder().add_source(config::File::with_name(p)),
            None => config::Config::builder()
                .add_source(config::File::with_name("obscura").required(false)),
        };
        builder
            .add_source(config::Environment::with_prefix("OBSCURA").separator("__"))
            .build()?
            .try_deserialize()
    }
}
