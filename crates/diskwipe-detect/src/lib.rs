//! # diskwipe Detect
//!
//! Disk and volume enumeration for the erase front end.
//!
//! Every entry carries what the erase engine and the wipe policy need: a
//! stable identity (the serial number), the byte length, and the media type
//! string the policy matches against. System disks are flagged from their
//! mount points so the front end can refuse them.
//!
//! Linux reads `/sys/block`, `/proc/mounts` and the udev database. Windows
//! queries CIM classes through PowerShell and parses their CSV output.

#![warn(missing_docs)]
#![warn(clippy::all)]

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

mod wmi;

/// Disk detection errors
#[derive(Error, Debug)]
pub enum DetectError {
    /// Failed to enumerate disks
    #[error("Failed to enumerate disks: {0}")]
    EnumerationFailed(String),

    /// No disk or volume with the requested path
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Platform not supported
    #[error("Platform not supported")]
    UnsupportedPlatform,

    /// Command execution failed
    #[error("Command failed: {0}")]
    CommandFailed(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for disk detection operations
pub type Result<T> = std::result::Result<T, DetectError>;

/// Whether an entry is a whole disk or a single volume on it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiskKind {
    /// Whole physical disk
    #[default]
    Physical,
    /// Partition or logical volume
    Volume,
}

impl fmt::Display for DiskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiskKind::Physical => write!(f, "disk"),
            DiskKind::Volume => write!(f, "volume"),
        }
    }
}

/// Normalized media class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum MediaClass {
    /// Removable media (USB sticks, memory cards)
    Removable,
    /// Floppy disk
    Floppy,
    /// Fixed disk attached externally
    External,
    /// Internal fixed disk
    Fixed,
    /// The system could not tell
    #[default]
    Unknown,
}

impl MediaClass {
    /// Media type string in the form Windows reports it
    ///
    /// The wipe policy matches on these strings, so they must keep the words
    /// "removable", "floppy" and "unknown" where they apply.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaClass::Removable => "Removable Media",
            MediaClass::Floppy => "Floppy disk",
            MediaClass::External => "External hard disk media",
            MediaClass::Fixed => "Fixed hard disk media",
            MediaClass::Unknown => "Format is unknown",
        }
    }

    /// Classify a media type string reported by the system
    #[must_use]
    pub fn from_media_type(media_type: &str) -> Self {
        let lower = media_type.to_lowercase();
        if lower.is_empty() || lower.contains("unknown") {
            MediaClass::Unknown
        } else if lower.contains("removable") {
            MediaClass::Removable
        } else if lower.contains("floppy") {
            MediaClass::Floppy
        } else if lower.contains("external") {
            MediaClass::External
        } else if lower.contains("fixed") || lower.contains("local") {
            MediaClass::Fixed
        } else {
            MediaClass::Unknown
        }
    }
}

impl fmt::Display for MediaClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A detected disk or volume
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Disk {
    /// Path to open for raw access (e.g., `/dev/sdb`, `\\.\PhysicalDrive1`)
    pub path: String,

    /// Whole disk or volume
    pub kind: DiskKind,

    /// Model or volume label
    pub model: String,

    /// Serial number or other stable identity, if the system reports one
    pub serial: Option<String>,

    /// Size in bytes; zero for empty card readers and drives without media
    pub size: u64,

    /// Logical sector size in bytes
    pub sector_size: u32,

    /// Normalized media class
    pub media: MediaClass,

    /// Media type string as reported by the system
    pub media_type: String,

    /// Mount points on this disk or volume
    pub mount_points: Vec<String>,

    /// Whether this appears to hold the running system
    pub is_system: bool,

    /// Why this disk was marked as system
    pub system_reason: Option<String>,
}

impl Disk {
    /// Create a new disk entry with the given path
    pub fn new(path: impl Into<String>, kind: DiskKind) -> Self {
        Self {
            path: path.into(),
            kind,
            sector_size: 512,
            ..Default::default()
        }
    }

    /// Builder: set the model
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Builder: set the serial number
    #[must_use]
    pub fn with_serial(mut self, serial: Option<String>) -> Self {
        self.serial = serial;
        self
    }

    /// Builder: set the size
    #[must_use]
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    /// Builder: set the media class, using its canonical media type string
    #[must_use]
    pub fn with_media(mut self, media: MediaClass) -> Self {
        self.media = media;
        self.media_type = media.as_str().to_string();
        self
    }

    /// Builder: add a mount point, flagging the disk if it is a system one
    #[must_use]
    pub fn with_mount_point(mut self, mount_point: impl Into<String>) -> Self {
        let mount_point = mount_point.into();
        if !self.is_system && is_system_mount_point(&mount_point) {
            self.is_system = true;
            self.system_reason = Some(format!("Contains system mount point: {mount_point}"));
        }
        self.mount_points.push(mount_point);
        self
    }

    /// Whether the medium reports any capacity
    #[must_use]
    pub fn has_media(&self) -> bool {
        self.size > 0
    }

    /// Get a display string for the disk
    #[must_use]
    pub fn display_name(&self) -> String {
        if self.model.is_empty() {
            self.path.clone()
        } else {
            self.model.clone()
        }
    }
}

/// System mount points that indicate a system disk
pub const SYSTEM_MOUNT_POINTS: &[&str] = &[
    "/",
    "/boot",
    "/boot/efi",
    "/home",
    "/usr",
    "/var",
    "/etc",
    "[SWAP]",
    "C:",
    "C:\\",
    "C:\\Windows",
];

/// Check if a mount point indicates a system disk
#[must_use]
pub fn is_system_mount_point(mount_point: &str) -> bool {
    let normalized = mount_point.trim();

    SYSTEM_MOUNT_POINTS.iter().any(|&sys| {
        normalized == sys
            || normalized.eq_ignore_ascii_case(sys)
            || normalized.starts_with(&format!("{sys}\\"))
    })
}

cfg_if::cfg_if! {
    if #[cfg(target_os = "linux")] {
        mod linux;
        pub use linux::{list_disks, list_volumes};
    } else if #[cfg(target_os = "windows")] {
        mod windows;
        pub use windows::{list_disks, list_volumes};
    } else {
        /// List physical disks (unsupported platform)
        pub fn list_disks() -> Result<Vec<Disk>> {
            Err(DetectError::UnsupportedPlatform)
        }

        /// List volumes (unsupported platform)
        pub fn list_volumes() -> Result<Vec<Disk>> {
            Err(DetectError::UnsupportedPlatform)
        }
    }
}

/// List disks or volumes
///
/// # Errors
///
/// Returns an error if enumeration fails.
pub fn list(kind: DiskKind) -> Result<Vec<Disk>> {
    let mut disks = match kind {
        DiskKind::Physical => list_disks()?,
        DiskKind::Volume => list_volumes()?,
    };
    disks.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(disks)
}

/// Find a disk or volume by path
///
/// Paths compare case-insensitively, as Windows device paths do.
///
/// # Errors
///
/// Returns [`DetectError::DeviceNotFound`] when nothing matches, or an
/// enumeration error.
pub fn find_disk(path: &str, kind: DiskKind) -> Result<Disk> {
    select_disk(list(kind)?, path)
}

fn select_disk(disks: Vec<Disk>, path: &str) -> Result<Disk> {
    let wanted = path.trim();
    disks
        .into_iter()
        .find(|d| d.path.eq_ignore_ascii_case(wanted))
        .ok_or_else(|| DetectError::DeviceNotFound(wanted.to_string()))
}

// ============================================================================
// UNIT TESTS
// ============================================================================
