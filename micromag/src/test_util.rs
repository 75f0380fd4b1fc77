//! Host backend that runs every launch inline, for unit tests.

use std::sync::{Arc, Mutex};

use crate::backend::{ArithOps, Backend, NormalizeOps, TorqueOps};
use crate::kernels;
use crate::Result;

/// Executes each `*_async` call immediately and records the device it
/// targeted.
pub(crate) struct SyncBackend {
    devices: usize,
    launches: Mutex<Vec<usize>>,
}

impl SyncBackend {
    pub(crate) fn new(devices: usize) -> Arc<Self> {
        Arc::new(Self {
            devices,
            launches: Mutex::new(Vec::new()),
        })
    }

    /// Devices targeted by kernel launches, in issue order.
    pub(crate) fn launches(&self) -> Vec<usize> {
        self.launches.lock().unwrap().clone()
    }

    fn record(&self, device: usize) {
        assert!(device < self.devices, "device {device} out of range");
        self.launches.lock().unwrap().push(device);
    }
}

impl Backend for SyncBackend {
    type Buffer = Vec<f32>;

    fn device_count(&self) -> usize {
        self.devices
    }

    fn alloc_zeros(&self, _device: usize, len: usize) -> Result<Vec<f32>> {
        Ok(vec![0.0; len])
    }

    fn upload(&self, _device: usize, dst: &mut Vec<f32>, data: &[f32]) -> Result<()> {
        dst.copy_from_slice(data);
        Ok(())
    }

    fn download(&self, _device: usize, src: &Vec<f32>) -> Result<Vec<f32>> {
        Ok(src.clone())
    }

    fn fill_zero_async(&self, _device: usize, buf: &mut Vec<f32>) -> Result<()> {
        buf.fill(0.0);
        Ok(())
    }

    fn copy_async(&self, _device: usize, dst: &mut Vec<f32>, src: &Vec<f32>) -> Result<()> {
        dst.copy_from_slice(src);
        Ok(())
    }

    fn synchronize(&self, _device: usize) -> Result<()> {
        Ok(())
    }
}

impl ArithOps for SyncBackend {
    fn add_async(
        &self,
        device: usize,
        dst: &mut Vec<f32>,
        a: &Vec<f32>,
        b: &Vec<f32>,
        n: usize,
    ) -> Result<()> {
        self.record(device);
        kernels::add(&mut dst[..n], &a[..n], &b[..n]);
        Ok(())
    }

    fn madd1_async(
        &self,
        device: usize,
        a: &mut Vec<f32>,
        b: &Vec<f32>,
        mul_b: f32,
        n: usize,
    ) -> Result<()> {
        self.record(device);
        kernels::madd1(&mut a[..n], &b[..n], mul_b);
        Ok(())
    }

    fn madd2_async(
        &self,
        device: usize,
        a: &mut Vec<f32>,
        b: &Vec<f32>,
        mul_b: f32,
        c: &Vec<f32>,
        mul_c: f32,
        n: usize,
    ) -> Result<()> {
        self.record(device);
        kernels::madd2(&mut a[..n], &b[..n], mul_b, &c[..n], mul_c);
        Ok(())
    }

    fn madd_async(
        &self,
        device: usize,
        dst: &mut Vec<f32>,
        a: &Vec<f32>,
        b: &Vec<f32>,
        mul_b: f32,
        n: usize,
    ) -> Result<()> {
        self.record(device);
        kernels::madd(&mut dst[..n], &a[..n], &b[..n], mul_b);
        Ok(())
    }

    fn cmadd_async(
        &self,
        device: usize,
        dst: &mut Vec<f32>,
        src: &Vec<f32>,
        re: f32,
        im: f32,
        n_complex: usize,
    ) -> Result<()> {
        self.record(device);
        kernels::cmadd(&mut dst[..2 * n_complex], &src[..n_complex], re, im);
        Ok(())
    }

    fn scale_async(&self, device: usize, a: &mut Vec<f32>, scale: f32, n: usize) -> Result<()> {
        self.record(device);
        kernels::scale(&mut a[..n], scale);
        Ok(())
    }
}

impl TorqueOps for SyncBackend {
    fn torque_async(
        &self,
        device: usize,
        t: &mut Vec<f32>,
        m: &Vec<f32>,
        h: &Vec<f32>,
        alpha: f32,
        npart: usize,
    ) -> Result<()> {
        self.record(device);
        let n = 3 * npart;
        kernels::torque(&mut t[..n], &m[..n], &h[..n], alpha);
        Ok(())
    }
}

impl NormalizeOps for SyncBackend {
    fn normalize_async(&self, device: usize, m: &mut Vec<f32>, npart: usize) -> Result<()> {
        self.record(device);
        kernels::normalize(&mut m[..3 * npart]);
        Ok(())
    }

    fn normalize_map_async(
        &self,
        device: usize,
        m: &mut Vec<f32>,
        norm: &Vec<f32>,
        npart: usize,
    ) -> Result<()> {
        self.record(device);
        kernels::normalize_map(&mut m[..3 * npart], &norm[..npart]);
        Ok(())
    }
}
