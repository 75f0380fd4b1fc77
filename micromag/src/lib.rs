//! Micromag: multi-device kernel layer for micromagnetic simulation
//!
//! This crate provides partitioned fields, the per-device kernel traits
//! and the dispatcher that fans each operation out over all devices.
//! Backend implementations live in `micromag-cpu` and, behind the `cuda`
//! feature, in [`cuda`].

#![allow(clippy::missing_errors_doc)]

pub mod backend;
pub mod config;
pub mod device;
pub mod error;
pub mod export;
pub mod field;
pub mod kernels;
pub mod ops;
pub mod partition;

#[cfg(feature = "cuda")]
pub mod cuda;

#[cfg(test)]
mod test_util;

pub use backend::{ArithOps, Backend, NormalizeOps, TorqueOps};
pub use config::DeviceConfig;
pub use device::DeviceList;
pub use error::{Error, Result};
pub use export::{DataFormat, FieldExporter, FieldHeader, HostField};
pub use field::Field;
pub use partition::{Layout, Partitioner, Storage};
