//! CPU backend for micromag.
//!
//! Every logical device is a host worker thread with its own job queue,
//! standing in for a GPU and its stream. Kernels are the host reference
//! implementations from [`micromag::kernels`]. Launches return as soon as
//! the job is queued, so the backend exercises the same asynchronous
//! multi-device code paths as a GPU backend.
//!
//! This backend is intended for debugging, testing, and running on
//! machines without a GPU.

#![allow(clippy::missing_errors_doc, clippy::missing_panics_doc)]

mod buffer;
mod ops;
mod stream;

use std::sync::Arc;
use std::thread;

use micromag::backend::Backend;
use micromag::{DeviceConfig, DeviceList, Error, Result};

pub use buffer::CpuBuffer;

use stream::Stream;

/// Host-thread backend: one worker thread per logical device.
pub struct CpuBackend {
    devices: DeviceList,
    streams: Vec<Stream>,
}

impl CpuBackend {
    /// Spawn one stream per entry of `devices`.
    pub fn new(devices: &DeviceList) -> Result<Arc<Self>> {
        if devices.has_duplicates() {
            log::debug!("device list reuses a physical id, streams still run independently");
        }
        let streams = (0..devices.len())
            .map(Stream::spawn)
            .collect::<Result<Vec<_>>>()?;
        log::info!("CPU backend ready with {} stream(s)", streams.len());
        Ok(Arc::new(Self {
            devices: devices.clone(),
            streams,
        }))
    }

    /// Backend with `count` logical devices.
    pub fn with_devices(count: usize) -> Result<Arc<Self>> {
        Self::new(&DeviceList::all(count)?)
    }

    /// Select devices according to `config`, treating each available
    /// hardware thread as one device.
    pub fn from_config(config: &DeviceConfig) -> Result<Arc<Self>> {
        let available = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
        Self::new(&config.select(available)?)
    }

    #[must_use]
    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    /// Queue an arbitrary job on `device`'s stream.
    ///
    /// The job runs after all work already queued on that device. If it
    /// panics, the next [`synchronize`](Backend::synchronize) of that
    /// device reports the panic.
    pub fn enqueue(&self, device: usize, job: impl FnOnce() + Send + 'static) -> Result<()> {
        self.stream(device)?.enqueue(Box::new(job))
    }

    fn stream(&self, device: usize) -> Result<&Stream> {
        self.streams.get(device).ok_or(Error::BadDeviceId {
            id: device,
            available: self.streams.len(),
        })
    }
}

impl Backend for CpuBackend {
    type Buffer = CpuBuffer;

    fn device_count(&self) -> usize {
        self.streams.len()
    }

    fn alloc_zeros(&self, device: usize, len: usize) -> Result<CpuBuffer> {
        self.stream(device)?;
        Ok(CpuBuffer::zeros(len))
    }

    fn upload(&self, device: usize, dst: &mut CpuBuffer, data: &[f32]) -> Result<()> {
        self.stream(device)?.wait()?;
        if dst.len() != data.len() {
            return Err(Error::HostLength {
                expected: dst.len(),
                got: data.len(),
            });
        }
        dst.write_from(data);
        Ok(())
    }

    fn download(&self, device: usize, src: &CpuBuffer) -> Result<Vec<f32>> {
        self.stream(device)?.wait_clean()?;
        Ok(src.to_vec())
    }

    fn fill_zero_async(&self, device: usize, buf: &mut CpuBuffer) -> Result<()> {
        let buf = buf.share();
        self.enqueue(device, move || buf.write().fill(0.0))
    }

    fn copy_async(&self, device: usize, dst: &mut CpuBuffer, src: &CpuBuffer) -> Result<()> {
        let (dst, src) = (dst.share(), src.share());
        self.enqueue(device, move || {
            dst.write().copy_from_slice(&src.read_recursive());
        })
    }

    fn synchronize(&self, device: usize) -> Result<()> {
        self.stream(device)?.synchronize()
    }
}
