//! Host-memory device partitions.

use std::sync::Arc;

use parking_lot::RwLock;

/// One device partition, shared between its owner field and the jobs
/// queued on the device's stream.
///
/// Jobs take the write lock on their destination and read locks on their
/// inputs, so a queued kernel never observes a half-written operand.
pub struct CpuBuffer {
    data: Arc<RwLock<Vec<f32>>>,
}

impl CpuBuffer {
    pub(crate) fn zeros(len: usize) -> Self {
        Self {
            data: Arc::new(RwLock::new(vec![0.0; len])),
        }
    }

    /// Handle for a queued job.
    pub(crate) fn share(&self) -> Arc<RwLock<Vec<f32>>> {
        Arc::clone(&self.data)
    }

    /// Number of floats.
    ///
    /// Blocks while a queued job is writing this buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub(crate) fn write_from(&self, src: &[f32]) {
        self.data.write().copy_from_slice(src);
    }

    pub(crate) fn to_vec(&self) -> Vec<f32> {
        self.data.read().clone()
    }
}
