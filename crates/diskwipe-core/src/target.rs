//! Description of the device an erase run is aimed at

use serde::{Deserialize, Serialize};

/// Identifier used when a device reports no serial number
pub const UNKNOWN_IDENTIFIER: &str = "UNKNOWN-SERIAL";

/// The disk or volume being erased
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceTarget {
    /// Stable key for progress tracking (normally the serial number)
    pub identifier: String,

    /// Bytes to erase; zero when the capacity is unknown
    pub total_size: u64,

    /// Media description used by the wipe policy, e.g. `Removable Media`
    pub media_class: String,
}

impl DeviceTarget {
    /// Create a target, falling back to [`UNKNOWN_IDENTIFIER`] for a blank serial
    pub fn new(serial: Option<&str>, total_size: u64, media_class: impl Into<String>) -> Self {
        let identifier = serial
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_IDENTIFIER)
            .to_string();

        Self {
            identifier,
            total_size,
            media_class: media_class.into(),
        }
    }

    /// Whether there is anything to write at all
    pub fn is_empty(&self) -> bool {
        self.total_size == 0
    }
}
