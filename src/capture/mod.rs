pub mod frame;
pub mod pool;
pub mod synthetic;
#[cfg(feature = "v4l2")]
pub mod v4l2;

pub use frame::{FrameHandle, FrameMetadata, PixelFormat};
pub use pool::{FramePool, FrameSensor, SensorInfo};
pub use synthetic::SyntheticSensor;
