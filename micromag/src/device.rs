//! Device selection for multi-device operation.

use crate::partition::Partitioner;
use crate::{Error, Result};

/// Ordered list of physical device ids, one per logical device.
///
/// Logical device `i` (the index used by fields and kernels) runs on
/// physical device `ids()[i]`. The same physical id may appear more than
/// once, which places two partitions on one device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceList {
    ids: Vec<usize>,
}

impl DeviceList {
    /// Use the given physical devices.
    ///
    /// # Errors
    /// Returns [`Error::NoDevices`] for an empty list and
    /// [`Error::BadDeviceId`] for ids outside `0..available`.
    pub fn new(ids: &[usize], available: usize) -> Result<Self> {
        if ids.is_empty() {
            return Err(Error::NoDevices);
        }
        if let Some(&id) = ids.iter().find(|&&id| id >= available) {
            return Err(Error::BadDeviceId { id, available });
        }
        log::info!("using {} device(s): {ids:?}", ids.len());
        Ok(Self { ids: ids.to_vec() })
    }

    /// Use every available device.
    ///
    /// # Errors
    /// Returns [`Error::NoDevices`] if `available` is zero.
    pub fn all(available: usize) -> Result<Self> {
        let ids: Vec<usize> = (0..available).collect();
        Self::new(&ids, available)
    }

    /// Like [`all`](Self::all), but if only one device exists it is listed
    /// twice so that multi-device code paths get exercised.
    ///
    /// # Errors
    /// Returns [`Error::NoDevices`] if `available` is zero.
    pub fn debug(available: usize) -> Result<Self> {
        let mut ids: Vec<usize> = (0..available).collect();
        if available == 1 {
            log::warn!("single device available, using device 0 twice");
            ids.push(0);
        }
        Self::new(&ids, available)
    }

    /// Number of logical devices (`nDevice()`).
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Physical device ids in logical order.
    #[must_use]
    pub fn ids(&self) -> &[usize] {
        &self.ids
    }

    /// Physical id of logical device `index`.
    #[must_use]
    pub fn physical(&self, index: usize) -> usize {
        self.ids[index]
    }

    /// True if any physical device backs more than one logical device.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.ids
            .iter()
            .enumerate()
            .any(|(i, id)| self.ids[..i].contains(id))
    }

    /// Partitioner over these devices.
    #[must_use]
    pub fn partitioner(&self) -> Partitioner {
        Partitioner::new(self.len())
    }
}
