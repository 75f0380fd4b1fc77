//! Partitioning of logical fields over devices
//!
//! A logical field of `N` cells is split into `nDevice()` contiguous
//! partitions of `Npart = N / nDevice()` cells. The split happens once,
//! when the field is created; kernels only ever see `Npart`.

use std::fmt;
use std::ops::Range;

use crate::{Error, Result};

/// Splits element counts evenly over a fixed number of devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Partitioner {
    devices: usize,
}

impl Partitioner {
    /// Create a partitioner for `devices` devices.
    ///
    /// # Panics
    /// Panics if `devices` is zero.
    #[must_use]
    pub fn new(devices: usize) -> Self {
        assert!(devices > 0, "partitioner needs at least one device");
        Self { devices }
    }

    /// Number of devices (`nDevice()`).
    #[must_use]
    pub fn devices(&self) -> usize {
        self.devices
    }

    /// Compute the per-device count for `len` elements.
    ///
    /// # Errors
    /// Returns [`Error::Indivisible`] if `len` is not a multiple of the
    /// device count.
    pub fn split(&self, len: usize) -> Result<usize> {
        if len % self.devices != 0 {
            return Err(Error::Indivisible {
                len,
                devices: self.devices,
            });
        }
        Ok(len / self.devices)
    }

    /// Build the layout of a field with `cells` cells of `components`
    /// floats each.
    ///
    /// # Errors
    /// Returns an error if `cells` does not divide evenly or `components`
    /// is zero.
    pub fn layout(&self, cells: usize, components: usize, storage: Storage) -> Result<Layout> {
        if components == 0 {
            return Err(Error::InvalidComponents(components));
        }
        let cells_per_device = self.split(cells)?;
        Ok(Layout::new(
            self.devices,
            cells_per_device,
            components,
            storage,
        ))
    }
}

/// How the components of one cell are stored inside a device partition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Storage {
    /// One contiguous block per component: `x0..xN, y0..yN, z0..zN`.
    Planar,
    /// Components of a cell stored next to each other (complex
    /// `re, im` pairs).
    Interleaved,
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Planar => write!(f, "planar"),
            Self::Interleaved => write!(f, "interleaved"),
        }
    }
}

/// Partition layout of one field: the part every kernel call relies on
/// being identical between the fields it combines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Layout {
    devices: usize,
    cells_per_device: usize,
    components: usize,
    storage: Storage,
}

impl Layout {
    #[must_use]
    pub fn new(devices: usize, cells_per_device: usize, components: usize, storage: Storage) -> Self {
        Self {
            devices,
            cells_per_device,
            components,
            storage,
        }
    }

    /// Number of device partitions.
    #[must_use]
    pub fn devices(&self) -> usize {
        self.devices
    }

    /// Cells per device (`Npart`).
    #[must_use]
    pub fn cells_per_device(&self) -> usize {
        self.cells_per_device
    }

    #[must_use]
    pub fn components(&self) -> usize {
        self.components
    }

    #[must_use]
    pub fn storage(&self) -> Storage {
        self.storage
    }

    /// Total number of cells in the logical field.
    #[must_use]
    pub fn cells(&self) -> usize {
        self.devices * self.cells_per_device
    }

    /// Floats held by each device partition.
    #[must_use]
    pub fn len_per_device(&self) -> usize {
        self.components * self.cells_per_device
    }

    /// Total floats in the logical field.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices * self.len_per_device()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Global cell range owned by `device`.
    ///
    /// # Panics
    /// Panics if `device` is out of range.
    #[must_use]
    pub fn range(&self, device: usize) -> Range<usize> {
        assert!(device < self.devices, "device {device} out of range");
        let start = device * self.cells_per_device;
        start..start + self.cells_per_device
    }

    /// Same layout with a different component count, e.g. the scalar
    /// companion of a vector field.
    #[must_use]
    pub fn with_components(&self, components: usize, storage: Storage) -> Self {
        Self {
            components,
            storage,
            ..*self
        }
    }

    /// Check that `other` is element-aligned with `self`.
    ///
    /// # Errors
    /// Returns [`Error::LayoutMismatch`] if the layouts differ.
    pub fn check_aligned(&self, other: &Layout) -> Result<()> {
        if self == other {
            Ok(())
        } else {
            Err(Error::LayoutMismatch {
                expected: *self,
                got: *other,
            })
        }
    }

    /// Scatter component-major host data into per-device partitions.
    ///
    /// `host` holds all cells of component 0, then all of component 1, and
    /// so on (interleaved fields: pairs in cell order). Calls
    /// `sink(device, partition)` once per device in index order.
    pub(crate) fn scatter(&self, host: &[f32], mut sink: impl FnMut(usize, Vec<f32>)) {
        debug_assert_eq!(host.len(), self.len());
        let npart = self.cells_per_device;
        for device in 0..self.devices {
            let part = match self.storage {
                Storage::Interleaved => {
                    let width = self.len_per_device();
                    host[device * width..(device + 1) * width].to_vec()
                }
                Storage::Planar => {
                    let cells = self.cells();
                    let mut part = Vec::with_capacity(self.len_per_device());
                    for c in 0..self.components {
                        let start = c * cells + device * npart;
                        part.extend_from_slice(&host[start..start + npart]);
                    }
                    part
                }
            };
            sink(device, part);
        }
    }

    /// Inverse of [`scatter`](Self::scatter): assemble per-device
    /// partitions into component-major host data.
    pub(crate) fn gather(&self, parts: &[Vec<f32>]) -> Vec<f32> {
        debug_assert_eq!(parts.len(), self.devices);
        match self.storage {
            Storage::Interleaved => parts.concat(),
            Storage::Planar => {
                let npart = self.cells_per_device;
                let mut host = Vec::with_capacity(self.len());
                for c in 0..self.components {
                    for part in parts {
                        host.extend_from_slice(&part[c * npart..(c + 1) * npart]);
                    }
                }
                host
            }
        }
    }
}

impl fmt::Display for Layout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}x{}x{} ({})",
            self.devices, self.cells_per_device, self.components, self.storage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split() {
        let p = Partitioner::new(4);
        assert_eq!(p.split(128).unwrap(), 32);
        assert_eq!(p.split(0).unwrap(), 0);
    }

    #[test]
    fn test_split_indivisible() {
        let p = Partitioner::new(3);
        let err = p.split(128).unwrap_err();
        assert!(matches!(
            err,
            Error::Indivisible {
                len: 128,
                devices: 3
            }
        ));
    }

    #[test]
    #[should_panic(expected = "at least one device")]
    fn test_zero_devices() {
        let _ = Partitioner::new(0);
    }

    #[test]
    fn test_layout_sizes() {
        let layout = Partitioner::new(2).layout(8, 3, Storage::Planar).unwrap();
        assert_eq!(layout.cells_per_device(), 4);
        assert_eq!(layout.len_per_device(), 12);
        assert_eq!(layout.len(), 24);
        assert_eq!(layout.cells(), 8);
        assert_eq!(layout.range(1), 4..8);
    }

    #[test]
    fn test_layout_zero_components() {
        let err = Partitioner::new(2).layout(8, 0, Storage::Planar).unwrap_err();
        assert!(matches!(err, Error::InvalidComponents(0)));
    }

    #[test]
    fn test_check_aligned() {
        let a = Layout::new(2, 4, 3, Storage::Planar);
        assert!(a.check_aligned(&a).is_ok());
        let b = a.with_components(1, Storage::Planar);
        assert!(matches!(
            a.check_aligned(&b),
            Err(Error::LayoutMismatch { .. })
        ));
    }

    #[test]
    fn test_scatter_planar_vector() {
        // 4 cells, 3 components, 2 devices
        let layout = Layout::new(2, 2, 3, Storage::Planar);
        let host: Vec<f32> = (0..12).map(|x| x as f32).collect();
        let mut parts = Vec::new();
        layout.scatter(&host, |_, p| parts.push(p));
        // x: 0 1 | 2 3, y: 4 5 | 6 7, z: 8 9 | 10 11
        assert_eq!(parts[0], vec![0.0, 1.0, 4.0, 5.0, 8.0, 9.0]);
        assert_eq!(parts[1], vec![2.0, 3.0, 6.0, 7.0, 10.0, 11.0]);
        assert_eq!(layout.gather(&parts), host);
    }

    #[test]
    fn test_scatter_interleaved() {
        let layout = Layout::new(2, 2, 2, Storage::Interleaved);
        let host: Vec<f32> = (0..8).map(|x| x as f32).collect();
        let mut parts = Vec::new();
        layout.scatter(&host, |_, p| parts.push(p));
        assert_eq!(parts[0], vec![0.0, 1.0, 2.0, 3.0]);
        assert_eq!(parts[1], vec![4.0, 5.0, 6.0, 7.0]);
        assert_eq!(layout.gather(&parts), host);
    }

    #[test]
    fn test_display() {
        let layout = Layout::new(2, 4, 2, Storage::Interleaved);
        assert_eq!(layout.to_string(), "2x4x2 (interleaved)");
    }
}
