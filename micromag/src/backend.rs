//! Backend trait and op trait definitions for multi-device execution.
//!
//! A backend owns a set of devices and one stream per device (the stream
//! table). Fields are generic over `B: Backend` and the dispatcher in
//! [`ops`](crate::ops) uses op traits like `ArithOps` to issue per-device
//! work.
//!
//! # Design notes
//!
//! - **Every `*_async` method only enqueues.** It targets exactly one
//!   device, receives that device's buffers plus the per-device count,
//!   and returns as soon as the work is queued on the device's stream.
//!   Work on one stream runs in issue order; different streams are
//!   unordered.
//! - **Faults surface at synchronization.** A kernel failing while it
//!   runs is reported by the next `synchronize` on its device. An `Err`
//!   from an `*_async` call means the work could not even be queued.
//! - **Op traits extend `Backend`** and use `Self::Buffer` from the
//!   supertrait, so a field type only needs the ops it actually calls.

use crate::Result;

// ---- Core backend trait ----

/// A set of devices with one ordered execution stream each.
pub trait Backend: Send + Sync + 'static {
    /// Storage for one device partition.
    type Buffer: Send + Sync;

    /// Number of logical devices (`nDevice()`).
    fn device_count(&self) -> usize;

    /// Allocate `len` zero-initialised floats on `device`.
    fn alloc_zeros(&self, device: usize, len: usize) -> Result<Self::Buffer>;

    /// Copy host data into `dst`, after all work already queued on
    /// `device`. Returns once the copy is complete.
    fn upload(&self, device: usize, dst: &mut Self::Buffer, data: &[f32]) -> Result<()>;

    /// Copy `src` back to the host, after all work already queued on
    /// `device`.
    ///
    /// Fails with the device's pending fault, if any, instead of returning
    /// a partition whose queued kernels did not run.
    fn download(&self, device: usize, src: &Self::Buffer) -> Result<Vec<f32>>;

    /// Queue `buf[i] = 0`.
    fn fill_zero_async(&self, device: usize, buf: &mut Self::Buffer) -> Result<()>;

    /// Queue a same-device copy `dst[i] = src[i]`.
    fn copy_async(&self, device: usize, dst: &mut Self::Buffer, src: &Self::Buffer)
        -> Result<()>;

    /// Block until all work queued on `device` has finished.
    ///
    /// Returns the first fault recorded on the device's stream since the
    /// previous synchronization.
    fn synchronize(&self, device: usize) -> Result<()>;

    /// Barrier over every device.
    ///
    /// Waits for all devices even if one of them reports a fault, then
    /// returns the first fault (lowest device index).
    fn synchronize_all(&self) -> Result<()> {
        let mut first = Ok(());
        for device in 0..self.device_count() {
            if let Err(e) = self.synchronize(device) {
                if first.is_ok() {
                    first = Err(e);
                } else {
                    log::warn!("additional fault during synchronization: {e}");
                }
            }
        }
        first
    }
}

// ---- Op traits ----

/// Elementwise linear combinations.
///
/// `n` is the number of floats per device partition.
pub trait ArithOps: Backend {
    /// `dst[i] = a[i] + b[i]`
    fn add_async(
        &self,
        device: usize,
        dst: &mut Self::Buffer,
        a: &Self::Buffer,
        b: &Self::Buffer,
        n: usize,
    ) -> Result<()>;

    /// `a[i] += mul_b * b[i]`
    fn madd1_async(
        &self,
        device: usize,
        a: &mut Self::Buffer,
        b: &Self::Buffer,
        mul_b: f32,
        n: usize,
    ) -> Result<()>;

    /// `a[i] += mul_b * b[i] + mul_c * c[i]` in one pass.
    #[allow(clippy::too_many_arguments)]
    fn madd2_async(
        &self,
        device: usize,
        a: &mut Self::Buffer,
        b: &Self::Buffer,
        mul_b: f32,
        c: &Self::Buffer,
        mul_c: f32,
        n: usize,
    ) -> Result<()>;

    /// `dst[i] = a[i] + mul_b * b[i]`
    fn madd_async(
        &self,
        device: usize,
        dst: &mut Self::Buffer,
        a: &Self::Buffer,
        b: &Self::Buffer,
        mul_b: f32,
        n: usize,
    ) -> Result<()>;

    /// `dst[i] += (re + i*im) * src[i]`, `dst` interleaved complex.
    ///
    /// `n_complex` counts complex numbers: `dst` holds `2 * n_complex`
    /// floats and `src` holds `n_complex`.
    #[allow(clippy::too_many_arguments)]
    fn cmadd_async(
        &self,
        device: usize,
        dst: &mut Self::Buffer,
        src: &Self::Buffer,
        re: f32,
        im: f32,
        n_complex: usize,
    ) -> Result<()>;

    /// `a[i] *= scale`
    fn scale_async(&self, device: usize, a: &mut Self::Buffer, scale: f32, n: usize)
        -> Result<()>;
}

/// Per-cell magnetization torque.
///
/// `npart` is the number of cells per device; buffers hold planar
/// 3-vectors (`3 * npart` floats).
pub trait TorqueOps: Backend {
    /// `t = -1/(1+alpha^2) * (m x h + alpha * m x (m x h))`
    #[allow(clippy::too_many_arguments)]
    fn torque_async(
        &self,
        device: usize,
        t: &mut Self::Buffer,
        m: &Self::Buffer,
        h: &Self::Buffer,
        alpha: f32,
        npart: usize,
    ) -> Result<()>;
}

/// Unit-length enforcement for magnetization partitions.
///
/// `npart` is the number of cells per device.
pub trait NormalizeOps: Backend {
    /// Rescale each 3-vector to unit length; zero vectors stay zero.
    fn normalize_async(&self, device: usize, m: &mut Self::Buffer, npart: usize) -> Result<()>;

    /// Rescale each 3-vector to length `norm[i]`; zero vectors stay zero.
    fn normalize_map_async(
        &self,
        device: usize,
        m: &mut Self::Buffer,
        norm: &Self::Buffer,
        npart: usize,
    ) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::Error;

    /// Records which devices were synchronized and fails on some of them.
    struct FakeBackend {
        devices: usize,
        failing: Vec<usize>,
        synced: Mutex<Vec<usize>>,
    }

    impl Backend for FakeBackend {
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

        fn synchronize(&self, device: usize) -> Result<()> {
            self.synced.lock().unwrap().push(device);
            if self.failing.contains(&device) {
                Err(Error::device(device, "fake fault"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_synchronize_all_visits_every_device() {
        let backend = FakeBackend {
            devices: 4,
            failing: vec![1, 2],
            synced: Mutex::new(Vec::new()),
        };
        let err = backend.synchronize_all().unwrap_err();
        assert!(matches!(err, Error::Device { device: 1, .. }));
        assert_eq!(*backend.synced.lock().unwrap(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_synchronize_all_ok() {
        let backend = FakeBackend {
            devices: 2,
            failing: vec![],
            synced: Mutex::new(Vec::new()),
        };
        assert!(backend.synchronize_all().is_ok());
    }
}
