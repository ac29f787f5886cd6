//! # diskwipe Platform
//!
//! Platform-specific raw device access for the erase engine.
//!
//! This crate opens a disk or volume path for read/write access and hands it
//! back as a seekable stream together with its byte length. On Linux block
//! devices are opened exclusively; on Windows the handle shares read, write
//! and delete access so the volume stays usable by the system while it is
//! overwritten.
//!
//! ## Safety
//!
//! Writing to a handle returned here destroys data. Callers are expected to
//! resolve and vet the device with `diskwipe-detect` and the wipe policy
//! before opening it.

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::io::{Read, Seek, Write};
use thiserror::Error;

/// Platform-specific errors
#[derive(Error, Debug)]
pub enum PlatformError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Device access denied (need elevated privileges)
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Device is busy or locked
    #[error("Device busy: {0}")]
    DeviceBusy(String),

    /// Device not found
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    /// Operation not supported on this platform
    #[error("Not supported: {0}")]
    NotSupported(String),
}

/// Result type for platform operations
pub type Result<T> = std::result::Result<T, PlatformError>;

/// Sector size assumed when the device cannot report one
pub const DEFAULT_SECTOR_SIZE: u32 = 512;

/// Options for opening a device
#[derive(Debug, Clone)]
pub struct OpenOptions {
    /// Open for reading
    pub read: bool,

    /// Open for writing
    pub write: bool,

    /// Refuse to open a block device another process holds open
    ///
    /// Honored on Linux; other platforms share access.
    pub exclusive: bool,
}

impl Default for OpenOptions {
    fn default() -> Self {
        Self {
            read: true,
            write: true,
            exclusive: true,
        }
    }
}

impl OpenOptions {
    /// Create new options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set read access
    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// Set write access
    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    /// Set exclusive access
    pub fn exclusive(mut self, exclusive: bool) -> Self {
        self.exclusive = exclusive;
        self
    }
}

/// Information about an open device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Device path as opened
    pub path: String,

    /// Total size in bytes
    pub size: u64,

    /// Logical sector size
    pub sector_size: u32,

    /// Whether the path is a block device rather than a regular file
    pub is_block_device: bool,
}

/// Seekable raw device stream
pub trait RawDevice: Read + Write + Seek + Send {
    /// Get information about the device
    fn info(&self) -> &DeviceInfo;

    /// Get the device size in bytes
    fn size(&self) -> u64 {
        self.info().size
    }

    /// Push all written data to the medium
    fn sync(&self) -> Result<()>;
}

/// Platform operations interface
pub trait PlatformOps {
    /// Open a device for raw I/O
    fn open_device(path: &str, options: OpenOptions) -> Result<Box<dyn RawDevice>>;

    /// Check if running with elevated privileges
    fn has_elevated_privileges() -> bool;
}

cfg_if::cfg_if! {
    if #[cfg(unix)] {
        mod unix;
        pub use unix::UnixPlatform as Platform;
    } else if #[cfg(windows)] {
        mod windows;
        pub use windows::WindowsPlatform as Platform;
    }
}

cfg_if::cfg_if! {
    if #[cfg(any(unix, windows))] {
        /// Open a device for raw I/O using platform defaults
        pub fn open_device(path: &str, options: OpenOptions) -> Result<Box<dyn RawDevice>> {
            Platform::open_device(path, options)
        }

        /// Check if running with elevated privileges
        pub fn has_elevated_privileges() -> bool {
            Platform::has_elevated_privileges()
        }
    } else {
        /// Open a device (unsupported platform)
        pub fn open_device(_path: &str, _options: OpenOptions) -> Result<Box<dyn RawDevice>> {
            Err(PlatformError::NotSupported("Platform not supported".to_string()))
        }

        /// Check privileges (unsupported platform)
        pub fn has_elevated_privileges() -> bool {
            false
        }
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // OpenOptions tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_open_options_default() {
        let opts = OpenOptions::default();
        assert!(opts.read);
        assert!(opts.write);
        assert!(opts.exclusive);
    }

    #[test]
    fn test_open_options_builder() {
        let opts = OpenOptions::new().read(true).write(false).exclusive(false);

        assert!(opts.read);
        assert!(!opts.write);
        assert!(!opts.exclusive);
    }

    // -------------------------------------------------------------------------
    // Error tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_error_display() {
        let err = PlatformError::PermissionDenied("need root".to_string());
        assert!(err.to_string().contains("Permission denied"));
        assert!(err.to_string().contains("need root"));

        let err = PlatformError::DeviceBusy("/dev/sdb".to_string());
        assert!(err.to_string().contains("busy"));

        let err = PlatformError::DeviceNotFound("/dev/sdz".to_string());
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let platform_err: PlatformError = io_err.into();
        assert!(matches!(platform_err, PlatformError::Io(_)));
    }
}
