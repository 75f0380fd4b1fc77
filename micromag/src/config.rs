//! Device configuration
//!
//! Read from a JSON file or from the `MICROMAG_DEVICES` /
//! `MICROMAG_DEBUG_DEVICES` environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::device::DeviceList;
use crate::{Error, Result};

/// Environment variable holding a comma separated device id list.
pub const DEVICES_ENV: &str = "MICROMAG_DEVICES";

/// Environment variable enabling the debug device list.
pub const DEBUG_DEVICES_ENV: &str = "MICROMAG_DEBUG_DEVICES";

/// Which devices to run on, and the defaults handed to the torque kernel.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DeviceConfig {
    /// Physical device ids to use (all available devices if absent)
    #[serde(default)]
    pub devices: Option<Vec<usize>>,

    /// List a single available device twice
    #[serde(default)]
    pub debug_duplicate: bool,

    /// Gilbert damping constant
    #[serde(default = "default_alpha")]
    pub alpha: f32,
}

fn default_alpha() -> f32 {
    0.02
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            devices: None,
            debug_duplicate: false,
            alpha: default_alpha(),
        }
    }
}

impl DeviceConfig {
    /// Load configuration from a JSON file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string
    ///
    /// # Errors
    /// Returns an error if the JSON is malformed
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        Ok(config)
    }

    /// Build configuration from the process environment.
    ///
    /// # Errors
    /// Returns [`Error::Config`] if a variable is set but malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var(DEVICES_ENV).ok().as_deref(),
            std::env::var(DEBUG_DEVICES_ENV).ok().as_deref(),
        )
    }

    fn from_vars(devices: Option<&str>, debug: Option<&str>) -> Result<Self> {
        let mut config = Self::default();
        if let Some(list) = devices {
            config.devices = Some(parse_device_list(list)?);
        }
        if let Some(flag) = debug {
            config.debug_duplicate = match flag.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => true,
                "0" | "false" | "no" | "" => false,
                other => {
                    return Err(Error::Config(format!(
                        "{DEBUG_DEVICES_ENV}: expected a boolean, got {other:?}"
                    )))
                }
            };
        }
        Ok(config)
    }

    /// Resolve the configured devices against the `available` count.
    ///
    /// # Errors
    /// Returns an error if an id is out of range or nothing is selected.
    pub fn select(&self, available: usize) -> Result<DeviceList> {
        match &self.devices {
            Some(ids) => DeviceList::new(ids, available),
            None if self.debug_duplicate => DeviceList::debug(available),
            None => DeviceList::all(available),
        }
    }
}

fn parse_device_list(list: &str) -> Result<Vec<usize>> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<usize>()
                .map_err(|e| Error::Config(format!("{DEVICES_ENV}: bad device id {s:?}: {e}")))
        })
        .collect()
}
