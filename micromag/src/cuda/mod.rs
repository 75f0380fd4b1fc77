//! CUDA backend implementation
//!
//! Each logical device gets its own `CudaDevice` handle created with a
//! non-default stream, so listing one physical GPU twice still yields two
//! independent streams. Kernels are compiled with NVRTC once per device
//! when the backend is created.

#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::manual_div_ceil
)]

mod kernels;

use std::sync::Arc;

use cudarc::driver::{CudaDevice, CudaFunction, CudaSlice, LaunchAsync, LaunchConfig};

use crate::backend::{ArithOps, Backend, NormalizeOps, TorqueOps};
use crate::config::DeviceConfig;
use crate::device::DeviceList;
use crate::{Error, Result};

const BLOCK_SIZE: usize = 256;

/// One device partition in GPU memory.
///
/// Zero-length partitions still hold a one-element allocation; `len` is
/// the logical length.
pub struct CudaBuffer {
    slice: CudaSlice<f32>,
    len: usize,
}

impl CudaBuffer {
    /// Logical number of floats.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Multi-GPU backend: one `CudaDevice` (context + stream) per logical
/// device.
pub struct CudaBackend {
    devices: DeviceList,
    streams: Vec<Arc<CudaDevice>>,
}

impl CudaBackend {
    /// Number of GPUs visible to the driver.
    ///
    /// # Errors
    /// Returns an error if the driver cannot be queried.
    pub fn available() -> Result<usize> {
        let count = CudaDevice::count()?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Open every device in `devices` and compile the kernels on each.
    ///
    /// # Errors
    /// Returns an error if a device cannot be opened or compilation fails.
    pub fn new(devices: &DeviceList) -> Result<Arc<Self>> {
        if devices.has_duplicates() {
            log::info!("device list reuses a physical GPU, partitions will share it");
        }
        let ptx = cudarc::nvrtc::safe::compile_ptx(kernels::SOURCE)?;
        let mut streams = Vec::with_capacity(devices.len());
        for (index, &ordinal) in devices.ids().iter().enumerate() {
            let device = CudaDevice::new_with_stream(ordinal)?;
            if !device.has_func(kernels::MODULE, kernels::NAMES[0]) {
                device.load_ptx(ptx.clone(), kernels::MODULE, kernels::NAMES)?;
            }
            log::debug!("loaded kernels for logical device {index} (GPU {ordinal})");
            streams.push(device);
        }
        log::info!("CUDA backend ready on {} stream(s)", streams.len());
        Ok(Arc::new(Self {
            devices: devices.clone(),
            streams,
        }))
    }

    /// Select devices according to `config` and open them.
    ///
    /// # Errors
    /// Returns an error if the selection is invalid or a device fails.
    pub fn from_config(config: &DeviceConfig) -> Result<Arc<Self>> {
        let devices = config.select(Self::available()?)?;
        Self::new(&devices)
    }

    #[must_use]
    pub fn devices(&self) -> &DeviceList {
        &self.devices
    }

    fn stream(&self, device: usize) -> Result<&Arc<CudaDevice>> {
        self.streams.get(device).ok_or(Error::BadDeviceId {
            id: device,
            available: self.streams.len(),
        })
    }

    /// Wait for `device`'s stream, reporting a fault against that device.
    fn wait(&self, device: usize) -> Result<&Arc<CudaDevice>> {
        let stream = self.stream(device)?;
        stream
            .synchronize()
            .map_err(|e| Error::device(device, e.to_string()))?;
        Ok(stream)
    }

    fn func(&self, device: usize, name: &str) -> Result<CudaFunction> {
        self.stream(device)?
            .get_func(kernels::MODULE, name)
            .ok_or_else(|| Error::device(device, format!("kernel {name} not loaded")))
    }
}

fn launch_config(n: usize) -> LaunchConfig {
    let grid_size = (n + BLOCK_SIZE - 1) / BLOCK_SIZE;
    LaunchConfig {
        grid_dim: (grid_size as u32, 1, 1),
        block_dim: (BLOCK_SIZE as u32, 1, 1),
        shared_mem_bytes: 0,
    }
}

fn check_len(device: usize, buf: &CudaBuffer, needed: usize) -> Result<()> {
    if buf.len < needed {
        return Err(Error::device(
            device,
            format!("buffer of {} floats, kernel needs {needed}", buf.len),
        ));
    }
    Ok(())
}

impl Backend for CudaBackend {
    type Buffer = CudaBuffer;

    fn device_count(&self) -> usize {
        self.streams.len()
    }

    fn alloc_zeros(&self, device: usize, len: usize) -> Result<CudaBuffer> {
        let slice = self.stream(device)?.alloc_zeros::<f32>(len.max(1))?;
        Ok(CudaBuffer { slice, len })
    }

    fn upload(&self, device: usize, dst: &mut CudaBuffer, data: &[f32]) -> Result<()> {
        if data.len() != dst.len {
            return Err(Error::HostLength {
                expected: dst.len,
                got: data.len(),
            });
        }
        if data.is_empty() {
            return Ok(());
        }
        let stream = self.wait(device)?;
        stream.htod_sync_copy_into(data, &mut dst.slice)?;
        Ok(())
    }

    fn download(&self, device: usize, src: &CudaBuffer) -> Result<Vec<f32>> {
        let stream = self.wait(device)?;
        let mut host = stream.dtoh_sync_copy(&src.slice)?;
        host.truncate(src.len);
        Ok(host)
    }

    fn fill_zero_async(&self, device: usize, buf: &mut CudaBuffer) -> Result<()> {
        self.stream(device)?.memset_zeros(&mut buf.slice)?;
        Ok(())
    }

    fn copy_async(&self, device: usize, dst: &mut CudaBuffer, src: &CudaBuffer) -> Result<()> {
        if dst.len != src.len {
            return Err(Error::device(device, "copy between partitions of different size"));
        }
        self.stream(device)?.dtod_copy(&src.slice, &mut dst.slice)?;
        Ok(())
    }

    fn synchronize(&self, device: usize) -> Result<()> {
        self.wait(device).map(|_| ())
    }
}

impl ArithOps for CudaBackend {
    fn add_async(
        &self,
        device: usize,
        dst: &mut CudaBuffer,
        a: &CudaBuffer,
        b: &CudaBuffer,
        n: usize,
    ) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        check_len(device, dst, n)?;
        check_len(device, a, n)?;
        check_len(device, b, n)?;
        let func = self.func(device, "add_f32")?;
        unsafe {
            func.launch(
                launch_config(n),
                (&mut dst.slice, &a.slice, &b.slice, n as i32),
            )?;
        }
        Ok(())
    }

    fn madd1_async(
        &self,
        device: usize,
        a: &mut CudaBuffer,
        b: &CudaBuffer,
        mul_b: f32,
        n: usize,
    ) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        check_len(device, a, n)?;
        check_len(device, b, n)?;
        let func = self.func(device, "madd1_f32")?;
        unsafe {
            func.launch(launch_config(n), (&mut a.slice, &b.slice, mul_b, n as i32))?;
        }
        Ok(())
    }

    fn madd2_async(
        &self,
        device: usize,
        a: &mut CudaBuffer,
        b: &CudaBuffer,
        mul_b: f32,
        c: &CudaBuffer,
        mul_c: f32,
        n: usize,
    ) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        check_len(device, a, n)?;
        check_len(device, b, n)?;
        check_len(device, c, n)?;
        let func = self.func(device, "madd2_f32")?;
        unsafe {
            func.launch(
                launch_config(n),
                (&mut a.slice, &b.slice, mul_b, &c.slice, mul_c, n as i32),
            )?;
        }
        Ok(())
    }

    fn madd_async(
        &self,
        device: usize,
        dst: &mut CudaBuffer,
        a: &CudaBuffer,
        b: &CudaBuffer,
        mul_b: f32,
        n: usize,
    ) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        check_len(device, dst, n)?;
        check_len(device, a, n)?;
        check_len(device, b, n)?;
        let func = self.func(device, "madd_f32")?;
        unsafe {
            func.launch(
                launch_config(n),
                (&mut dst.slice, &a.slice, &b.slice, mul_b, n as i32),
            )?;
        }
        Ok(())
    }

    fn cmadd_async(
        &self,
        device: usize,
        dst: &mut CudaBuffer,
        src: &CudaBuffer,
        re: f32,
        im: f32,
        n_complex: usize,
    ) -> Result<()> {
        if n_complex == 0 {
            return Ok(());
        }
        check_len(device, dst, 2 * n_complex)?;
        check_len(device, src, n_complex)?;
        let func = self.func(device, "cmadd_f32")?;
        unsafe {
            func.launch(
                launch_config(n_complex),
                (&mut dst.slice, &src.slice, re, im, n_complex as i32),
            )?;
        }
        Ok(())
    }

    fn scale_async(&self, device: usize, a: &mut CudaBuffer, scale: f32, n: usize) -> Result<()> {
        if n == 0 {
            return Ok(());
        }
        check_len(device, a, n)?;
        let func = self.func(device, "scale_f32")?;
        unsafe {
            func.launch(launch_config(n), (&mut a.slice, scale, n as i32))?;
        }
        Ok(())
    }
}

impl TorqueOps for CudaBackend {
    fn torque_async(
        &self,
        device: usize,
        t: &mut CudaBuffer,
        m: &CudaBuffer,
        h: &CudaBuffer,
        alpha: f32,
        npart: usize,
    ) -> Result<()> {
        if npart == 0 {
            return Ok(());
        }
        check_len(device, t, 3 * npart)?;
        check_len(device, m, 3 * npart)?;
        check_len(device, h, 3 * npart)?;
        let func = self.func(device, "torque_f32")?;
        unsafe {
            func.launch(
                launch_config(npart),
                (&mut t.slice, &m.slice, &h.slice, alpha, npart as i32),
            )?;
        }
        Ok(())
    }
}

impl NormalizeOps for CudaBackend {
    fn normalize_async(&self, device: usize, m: &mut CudaBuffer, npart: usize) -> Result<()> {
        if npart == 0 {
            return Ok(());
        }
        check_len(device, m, 3 * npart)?;
        let func = self.func(device, "normalize_f32")?;
        unsafe {
            func.launch(launch_config(npart), (&mut m.slice, npart as i32))?;
        }
        Ok(())
    }

    fn normalize_map_async(
        &self,
        device: usize,
        m: &mut CudaBuffer,
        norm: &CudaBuffer,
        npart: usize,
    ) -> Result<()> {
        if npart == 0 {
            return Ok(());
        }
        check_len(device, m, 3 * npart)?;
        check_len(device, norm, npart)?;
        let func = self.func(device, "normalize_map_f32")?;
        unsafe {
            func.launch(
                launch_config(npart),
                (&mut m.slice, &norm.slice, npart as i32),
            )?;
        }
        Ok(())
    }
}
