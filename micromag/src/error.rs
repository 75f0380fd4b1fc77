//! Error types for micromag

use thiserror::Error;

use crate::partition::Layout;

/// Result type alias using micromag's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for micromag operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("{len} elements are not evenly divisible over {devices} devices")]
    Indivisible { len: usize, devices: usize },

    #[error("Partition layout mismatch: expected {expected}, got {got}")]
    LayoutMismatch { expected: Layout, got: Layout },

    #[error("Fields live on different device sets")]
    BackendMismatch,

    #[error("Invalid device ID: {id} ({available} devices available)")]
    BadDeviceId { id: usize, available: usize },

    #[error("No devices selected")]
    NoDevices,

    #[error("Invalid number of components: {0}")]
    InvalidComponents(usize),

    #[error("Host buffer length mismatch: expected {expected}, got {got}")]
    HostLength { expected: usize, got: usize },

    #[error("Device {device} failed: {message}")]
    Device { device: usize, message: String },

    #[error("CUDA error: {0}")]
    Cuda(String),

    #[error("NVRTC error: {0}")]
    Nvrtc(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Wrap a failure observed on one device's stream.
    pub fn device(device: usize, message: impl Into<String>) -> Self {
        Self::Device {
            device,
            message: message.into(),
        }
    }
}

#[cfg(feature = "cuda")]
impl From<cudarc::driver::DriverError> for Error {
    fn from(e: cudarc::driver::DriverError) -> Self {
        Self::Cuda(e.to_string())
    }
}

#[cfg(feature = "cuda")]
impl From<cudarc::nvrtc::CompileError> for Error {
    fn from(e: cudarc::nvrtc::CompileError) -> Self {
        Self::Nvrtc(e.to_string())
    }
}
