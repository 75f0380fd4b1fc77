//! Distributed arrays: one logical field, one buffer per device.

use std::sync::Arc;

use crate::backend::Backend;
use crate::export::HostField;
use crate::partition::{Layout, Partitioner, Storage};
use crate::{Error, Result};

/// A logical field partitioned over every device of a backend.
///
/// The field owns one buffer per device; partition `d` always lives on
/// device `d`. The layout (device count, cells per device, components,
/// storage) is fixed at creation, so two fields with equal layouts are
/// element-aligned partition by partition.
///
/// Vector fields use planar storage inside each partition:
///
/// ```text
/// device 0: x0 x1  y0 y1  z0 z1
/// device 1: x2 x3  y2 y3  z2 z3
/// ```
pub struct Field<B: Backend> {
    backend: Arc<B>,
    layout: Layout,
    parts: Vec<B::Buffer>,
}

impl<B: Backend> Field<B> {
    /// Allocate a zeroed field of `cells` cells with `components` floats
    /// each, in planar storage.
    ///
    /// # Errors
    /// Returns [`Error::Indivisible`] if `cells` does not divide evenly
    /// over the backend's devices, or an allocation error.
    pub fn new(backend: &Arc<B>, components: usize, cells: usize) -> Result<Self> {
        Self::with_storage(backend, components, cells, Storage::Planar)
    }

    /// Allocate a zeroed scalar field.
    ///
    /// # Errors
    /// See [`new`](Self::new).
    pub fn scalar(backend: &Arc<B>, cells: usize) -> Result<Self> {
        Self::new(backend, 1, cells)
    }

    /// Allocate a zeroed 3-vector field.
    ///
    /// # Errors
    /// See [`new`](Self::new).
    pub fn vector(backend: &Arc<B>, cells: usize) -> Result<Self> {
        Self::new(backend, 3, cells)
    }

    /// Allocate a zeroed field of `n_complex` interleaved complex numbers.
    ///
    /// # Errors
    /// See [`new`](Self::new).
    pub fn complex(backend: &Arc<B>, n_complex: usize) -> Result<Self> {
        Self::with_storage(backend, 2, n_complex, Storage::Interleaved)
    }

    /// Allocate a field and fill it from component-major host data.
    ///
    /// # Errors
    /// Returns [`Error::HostLength`] if `data` does not hold
    /// `components * cells` floats, plus the errors of [`new`](Self::new).
    pub fn from_host(backend: &Arc<B>, components: usize, data: &[f32]) -> Result<Self> {
        if components == 0 {
            return Err(Error::InvalidComponents(components));
        }
        if data.len() % components != 0 {
            return Err(Error::HostLength {
                expected: data.len() - data.len() % components,
                got: data.len(),
            });
        }
        let mut field = Self::new(backend, components, data.len() / components)?;
        field.copy_from_host(data)?;
        Ok(field)
    }

    fn with_storage(
        backend: &Arc<B>,
        components: usize,
        cells: usize,
        storage: Storage,
    ) -> Result<Self> {
        let layout = Partitioner::new(backend.device_count()).layout(cells, components, storage)?;
        let parts = (0..layout.devices())
            .map(|device| backend.alloc_zeros(device, layout.len_per_device()))
            .collect::<Result<Vec<_>>>()?;
        log::debug!("allocated field {layout}");
        Ok(Self {
            backend: Arc::clone(backend),
            layout,
            parts,
        })
    }

    #[must_use]
    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub fn backend(&self) -> &Arc<B> {
        &self.backend
    }

    /// Number of cells in the logical field.
    #[must_use]
    pub fn len(&self) -> usize {
        self.layout.cells()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layout.cells() == 0
    }

    #[must_use]
    pub fn components(&self) -> usize {
        self.layout.components()
    }

    /// Partition resident on `device`.
    #[must_use]
    pub fn part(&self, device: usize) -> &B::Buffer {
        &self.parts[device]
    }

    /// Mutable partition resident on `device`.
    pub fn part_mut(&mut self, device: usize) -> &mut B::Buffer {
        &mut self.parts[device]
    }

    /// All partitions in device order.
    #[must_use]
    pub fn parts(&self) -> &[B::Buffer] {
        &self.parts
    }

    /// The backend together with mutable partitions, for dispatching
    /// kernels that write this field.
    pub(crate) fn split_mut(&mut self) -> (&B, &mut [B::Buffer]) {
        (&self.backend, &mut self.parts)
    }

    /// True if `other` lives on the same backend instance.
    #[must_use]
    pub fn same_backend(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.backend, &other.backend)
    }

    /// Queue a zero fill of every partition.
    ///
    /// # Errors
    /// Returns an error if the work cannot be queued.
    pub fn zero(&mut self) -> Result<()> {
        let (backend, parts) = self.split_mut();
        for (device, part) in parts.iter_mut().enumerate() {
            backend.fill_zero_async(device, part)?;
        }
        Ok(())
    }

    /// Queue a partition-wise copy of `src` into `self`.
    ///
    /// # Errors
    /// Returns [`Error::LayoutMismatch`] or [`Error::BackendMismatch`] if
    /// the fields are not aligned.
    pub fn copy_from(&mut self, src: &Self) -> Result<()> {
        if !self.same_backend(src) {
            return Err(Error::BackendMismatch);
        }
        self.layout.check_aligned(&src.layout)?;
        let (backend, parts) = self.split_mut();
        for (device, part) in parts.iter_mut().enumerate() {
            backend.copy_async(device, part, src.part(device))?;
        }
        Ok(())
    }

    /// Scatter component-major host data into the partitions.
    ///
    /// # Errors
    /// Returns [`Error::HostLength`] if `data` has the wrong length, or a
    /// device error from the upload.
    pub fn copy_from_host(&mut self, data: &[f32]) -> Result<()> {
        if data.len() != self.layout.len() {
            return Err(Error::HostLength {
                expected: self.layout.len(),
                got: data.len(),
            });
        }
        let layout = self.layout;
        let (backend, parts) = self.split_mut();
        let mut result = Ok(());
        layout.scatter(data, |device, chunk| {
            if result.is_ok() {
                result = backend.upload(device, &mut parts[device], &chunk);
            }
        });
        result
    }

    /// Wait for this field's devices, then gather all partitions into
    /// component-major host data.
    ///
    /// # Errors
    /// Returns the first device fault observed while waiting.
    pub fn to_host(&self) -> Result<Vec<f32>> {
        let parts = self
            .parts
            .iter()
            .enumerate()
            .map(|(device, part)| self.backend.download(device, part))
            .collect::<Result<Vec<_>>>()?;
        Ok(self.layout.gather(&parts))
    }

    /// Synchronized, assembled copy of the field for hand-off to an
    /// exporter.
    ///
    /// # Errors
    /// Returns the first device fault observed while waiting.
    pub fn snapshot(&self) -> Result<HostField> {
        self.synchronize()?;
        let data = self.to_host()?;
        Ok(HostField::new(
            self.layout.components(),
            self.layout.storage(),
            data,
        ))
    }

    /// Barrier over every device holding a partition of this field.
    ///
    /// # Errors
    /// Returns the first device fault.
    pub fn synchronize(&self) -> Result<()> {
        self.backend.synchronize_all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::SyncBackend;

    #[test]
    fn test_vector_layout() {
        let backend = SyncBackend::new(2);
        let m = Field::vector(&backend, 8).unwrap();
        assert_eq!(m.len(), 8);
        assert_eq!(m.components(), 3);
        assert_eq!(m.layout().cells_per_device(), 4);
        assert_eq!(m.parts().len(), 2);
        assert_eq!(m.part(1).len(), 12);
    }

    #[test]
    fn test_indivisible_field() {
        let backend = SyncBackend::new(3);
        let err = Field::scalar(&backend, 8).err().unwrap();
        assert!(matches!(err, Error::Indivisible { len: 8, devices: 3 }));
    }

    #[test]
    fn test_host_round_trip_vector() {
        let backend = SyncBackend::new(2);
        let data: Vec<f32> = (0..12).map(|x| x as f32).collect();
        let m = Field::from_host(&backend, 3, &data).unwrap();
        // device 0 owns cells 0,1: x 0 1, y 4 5, z 8 9
        assert_eq!(m.part(0), &vec![0.0, 1.0, 4.0, 5.0, 8.0, 9.0]);
        assert_eq!(m.to_host().unwrap(), data);
    }

    #[test]
    fn test_copy_from_host_length() {
        let backend = SyncBackend::new(2);
        let mut f = Field::scalar(&backend, 4).unwrap();
        let err = f.copy_from_host(&[1.0; 3]).unwrap_err();
        assert!(matches!(
            err,
            Error::HostLength {
                expected: 4,
                got: 3
            }
        ));
    }

    #[test]
    fn test_from_host_ragged() {
        let backend = SyncBackend::new(1);
        let err = Field::from_host(&backend, 3, &[1.0; 7]).err().unwrap();
        assert!(matches!(err, Error::HostLength { got: 7, .. }));
    }

    #[test]
    fn test_zero_and_copy() {
        let backend = SyncBackend::new(2);
        let src = Field::from_host(&backend, 1, &[1.0, 2.0, 3.0, 4.0]).unwrap();
        let mut dst = Field::scalar(&backend, 4).unwrap();
        dst.copy_from(&src).unwrap();
        assert_eq!(dst.to_host().unwrap(), vec![1.0, 2.0, 3.0, 4.0]);
        dst.zero().unwrap();
        assert_eq!(dst.to_host().unwrap(), vec![0.0; 4]);
    }

    #[test]
    fn test_copy_from_mismatch() {
        let backend = SyncBackend::new(2);
        let src = Field::scalar(&backend, 4).unwrap();
        let mut dst = Field::vector(&backend, 4).unwrap();
        assert!(matches!(
            dst.copy_from(&src),
            Err(Error::LayoutMismatch { .. })
        ));

        let other = SyncBackend::new(2);
        let foreign = Field::vector(&other, 4).unwrap();
        assert!(matches!(
            dst.copy_from(&foreign),
            Err(Error::BackendMismatch)
        ));
    }

    #[test]
    fn test_complex_layout() {
        let backend = SyncBackend::new(2);
        let c = Field::complex(&backend, 4).unwrap();
        assert_eq!(c.layout().storage(), Storage::Interleaved);
        assert_eq!(c.part(0).len(), 4);
    }

    #[test]
    fn test_snapshot() {
        let backend = SyncBackend::new(2);
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let m = Field::from_host(&backend, 3, &data).unwrap();
        let snap = m.snapshot().unwrap();
        assert_eq!(snap.cells(), 2);
        assert_eq!(snap.vector(1), Some([2.0, 4.0, 6.0]));
    }
}
