pub mod capture;
pub mod convert;
pub mod device;
pub mod level;
pub mod resample;

pub use capture::{CaptureHandle, CaptureSource, CaptureStatus};
pub use device::DeviceManager;
pub use level::LevelBus;
pub use resample::TARGET_SAMPLE_RATE;
