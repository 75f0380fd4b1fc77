//! TorqueOps implementation for CpuBackend.

use micromag::backend::TorqueOps;
use micromag::{kernels, Result};

use crate::{CpuBackend, CpuBuffer};

impl TorqueOps for CpuBackend {
    fn torque_async(
        &self,
        device: usize,
        t: &mut CpuBuffer,
        m: &CpuBuffer,
        h: &CpuBuffer,
        alpha: f32,
        npart: usize,
    ) -> Result<()> {
        let (t, m, h) = (t.share(), m.share(), h.share());
        let n = 3 * npart;
        self.enqueue(device, move || {
            let mut t = t.write();
            let (m, h) = (m.read_recursive(), h.read_recursive());
            kernels::torque(&mut t[..n], &m[..n], &h[..n], alpha);
        })
    }
}
