//! ArithOps implementation for CpuBackend.

use micromag::backend::ArithOps;
use micromag::{kernels, Result};

use crate::{CpuBackend, CpuBuffer};

impl ArithOps for CpuBackend {
    fn add_async(
        &self,
        device: usize,
        dst: &mut CpuBuffer,
        a: &CpuBuffer,
        b: &CpuBuffer,
        n: usize,
    ) -> Result<()> {
        let (dst, a, b) = (dst.share(), a.share(), b.share());
        self.enqueue(device, move || {
            let mut dst = dst.write();
            let (a, b) = (a.read_recursive(), b.read_recursive());
            kernels::add(&mut dst[..n], &a[..n], &b[..n]);
        })
    }

    fn madd1_async(
        &self,
        device: usize,
        a: &mut CpuBuffer,
        b: &CpuBuffer,
        mul_b: f32,
        n: usize,
    ) -> Result<()> {
        let (a, b) = (a.share(), b.share());
        self.enqueue(device, move || {
            let mut a = a.write();
            let b = b.read_recursive();
            kernels::madd1(&mut a[..n], &b[..n], mul_b);
        })
    }

    fn madd2_async(
        &self,
        device: usize,
        a: &mut CpuBuffer,
        b: &CpuBuffer,
        mul_b: f32,
        c: &CpuBuffer,
        mul_c: f32,
        n: usize,
    ) -> Result<()> {
        let (a, b, c) = (a.share(), b.share(), c.share());
        self.enqueue(device, move || {
            let mut a = a.write();
            let (b, c) = (b.read_recursive(), c.read_recursive());
            kernels::madd2(&mut a[..n], &b[..n], mul_b, &c[..n], mul_c);
        })
    }

    fn madd_async(
        &self,
        device: usize,
        dst: &mut CpuBuffer,
        a: &CpuBuffer,
        b: &CpuBuffer,
        mul_b: f32,
        n: usize,
    ) -> Result<()> {
        let (dst, a, b) = (dst.share(), a.share(), b.share());
        self.enqueue(device, move || {
            let mut dst = dst.write();
            let (a, b) = (a.read_recursive(), b.read_recursive());
            kernels::madd(&mut dst[..n], &a[..n], &b[..n], mul_b);
        })
    }

    fn cmadd_async(
        &self,
        device: usize,
        dst: &mut CpuBuffer,
        src: &CpuBuffer,
        re: f32,
        im: f32,
        n_complex: usize,
    ) -> Result<()> {
        let (dst, src) = (dst.share(), src.share());
        self.enqueue(device, move || {
            let mut dst = dst.write();
            let src = src.read_recursive();
            kernels::cmadd(&mut dst[..2 * n_complex], &src[..n_complex], re, im);
        })
    }

    fn scale_async(&self, device: usize, a: &mut CpuBuffer, scale: f32, n: usize) -> Result<()> {
        let a = a.share();
        self.enqueue(device, move || {
            kernels::scale(&mut a.write()[..n], scale);
        })
    }
}
