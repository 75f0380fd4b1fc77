//! Hand-off of synchronized fields to snapshot writers.
//!
//! The kernel layer does not encode any file format. It produces a
//! [`HostField`] (see [`Field::snapshot`](crate::Field::snapshot)), which
//! is only ever built after every device holding the field has been
//! synchronized, and passes it to a [`FieldExporter`] together with a
//! header and a data-format descriptor.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::partition::Storage;
use crate::Result;

/// Encoding of the data section of a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
pub enum DataFormat {
    /// Human readable text
    Text,
    /// Little-endian 4-byte floats
    #[default]
    Binary4,
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "Text"),
            Self::Binary4 => write!(f, "Binary 4"),
        }
    }
}

/// Descriptive header of a snapshot.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct FieldHeader {
    /// Quantity name, e.g. `"m"`
    pub title: String,
    /// Grid size in cells (x, y, z)
    pub grid_size: [usize; 3],
    /// Cell size in metres (x, y, z)
    pub cell_size: [f64; 3],
    /// Unit of the stored values
    #[serde(default)]
    pub value_unit: String,
    /// Simulation time of the snapshot, in seconds
    #[serde(default)]
    pub time: f64,
}

/// A fully assembled field in host memory, in component-major order.
#[derive(Debug, Clone, PartialEq)]
pub struct HostField {
    components: usize,
    storage: Storage,
    data: Vec<f32>,
}

impl HostField {
    /// # Panics
    /// Panics if `data` is not a whole number of cells.
    #[must_use]
    pub fn new(components: usize, storage: Storage, data: Vec<f32>) -> Self {
        assert!(components > 0, "host field needs at least one component");
        assert_eq!(data.len() % components, 0, "ragged host field");
        Self {
            components,
            storage,
            data,
        }
    }

    #[must_use]
    pub fn components(&self) -> usize {
        self.components
    }

    #[must_use]
    pub fn storage(&self) -> Storage {
        self.storage
    }

    /// Number of cells.
    #[must_use]
    pub fn cells(&self) -> usize {
        self.data.len() / self.components
    }

    /// Raw data.
    #[must_use]
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// All cells of component `c` (planar fields only).
    #[must_use]
    pub fn component(&self, c: usize) -> Option<&[f32]> {
        if self.storage != Storage::Planar || c >= self.components {
            return None;
        }
        let n = self.cells();
        Some(&self.data[c * n..(c + 1) * n])
    }

    /// The 3-vector at `cell` (planar 3-component fields only).
    #[must_use]
    pub fn vector(&self, cell: usize) -> Option<[f32; 3]> {
        if self.storage != Storage::Planar || self.components != 3 || cell >= self.cells() {
            return None;
        }
        let n = self.cells();
        Some([
            self.data[cell],
            self.data[cell + n],
            self.data[cell + 2 * n],
        ])
    }

    #[must_use]
    pub fn into_data(self) -> Vec<f32> {
        self.data
    }
}

/// Consumer of synchronized field snapshots, e.g. an OVF/OMF writer.
pub trait FieldExporter {
    /// Persist one snapshot.
    ///
    /// # Errors
    /// Implementation defined; typically I/O failures.
    fn export(&mut self, header: &FieldHeader, format: DataFormat, field: &HostField)
        -> Result<()>;
}
