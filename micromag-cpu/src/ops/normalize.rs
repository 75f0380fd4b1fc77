//! NormalizeOps implementation for CpuBackend.

use micromag::backend::NormalizeOps;
use micromag::{kernels, Result};

use crate::{CpuBackend, CpuBuffer};

impl NormalizeOps for CpuBackend {
    fn normalize_async(&self, device: usize, m: &mut CpuBuffer, npart: usize) -> Result<()> {
        let m = m.share();
        self.enqueue(device, move || {
            kernels::normalize(&mut m.write()[..3 * npart]);
        })
    }

    fn normalize_map_async(
        &self,
        device: usize,
        m: &mut CpuBuffer,
        norm: &CpuBuffer,
        npart: usize,
    ) -> Result<()> {
        let (m, norm) = (m.share(), norm.share());
        self.enqueue(device, move || {
            let mut m = m.write();
            let norm = norm.read_recursive();
            kernels::normalize_map(&mut m[..3 * npart], &norm[..npart]);
        })
    }
}
