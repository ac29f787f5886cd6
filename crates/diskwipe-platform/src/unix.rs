//! Unix platform implementation
//!
//! Block devices are sized with `BLKGETSIZE64` on Linux and by seeking to the
//! end everywhere else. Exclusive access uses `O_EXCL`, which Linux honors
//! for block devices opened without `O_CREAT`.

use crate::{
    DeviceInfo, OpenOptions, PlatformError, PlatformOps, RawDevice, Result, DEFAULT_SECTOR_SIZE,
};
use std::fs::{File, OpenOptions as StdOpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::io::AsRawFd;
use std::path::Path;

#[cfg(target_os = "linux")]
use std::os::unix::fs::OpenOptionsExt;

/// Unix platform implementation
pub struct UnixPlatform;

impl PlatformOps for UnixPlatform {
    fn open_device(path: &str, options: OpenOptions) -> Result<Box<dyn RawDevice>> {
        UnixDevice::open(path, options).map(|d| Box::new(d) as Box<dyn RawDevice>)
    }

    fn has_elevated_privileges() -> bool {
        // SAFETY: geteuid() is a simple syscall that returns the effective user ID.
        // It has no preconditions and cannot cause undefined behavior.
        #[allow(unsafe_code)]
        unsafe {
            libc::geteuid() == 0
        }
    }
}

/// Unix device wrapper for raw I/O
pub struct UnixDevice {
    file: File,
    info: DeviceInfo,
}

impl UnixDevice {
    /// Open a device for raw I/O
    pub fn open(path: &str, options: OpenOptions) -> Result<Self> {
        let device_path = Path::new(path);

        let metadata = std::fs::metadata(device_path)
            .map_err(|_| PlatformError::DeviceNotFound(path.to_string()))?;
        let is_block_device = metadata.file_type().is_block_device();

        let mut std_options = StdOpenOptions::new();
        std_options.read(options.read).write(options.write);

        #[cfg(target_os = "linux")]
        if options.exclusive && is_block_device {
            std_options.custom_flags(libc::O_EXCL);
        }

        let mut file = std_options.open(device_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                PlatformError::PermissionDenied(format!(
                    "Cannot open {}: {}. Try running with sudo.",
                    path, e
                ))
            } else if e.raw_os_error() == Some(libc::EBUSY) {
                PlatformError::DeviceBusy(format!(
                    "{} is in use. Unmount its filesystems first.",
                    path
                ))
            } else {
                PlatformError::Io(e)
            }
        })?;

        let size = if is_block_device {
            get_device_size(&mut file)?
        } else {
            metadata.len()
        };

        let sector_size = if is_block_device {
            get_sector_size(&file)
        } else {
            DEFAULT_SECTOR_SIZE
        };

        tracing::debug!(
            "Opened {} ({} bytes, {} byte sectors, exclusive: {})",
            path,
            size,
            sector_size,
            options.exclusive && is_block_device
        );

        Ok(Self {
            file,
            info: DeviceInfo {
                path: path.to_string(),
                size,
                sector_size,
                is_block_device,
            },
        })
    }
}

impl RawDevice for UnixDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn sync(&self) -> Result<()> {
        let fd = self.file.as_raw_fd();
        // SAFETY: fsync() is called with a valid file descriptor obtained from as_raw_fd().
        // The fd remains valid for the lifetime of self.file.
        #[allow(unsafe_code)]
        let result = unsafe { libc::fsync(fd) };
        if result == 0 {
            Ok(())
        } else {
            Err(PlatformError::Io(std::io::Error::last_os_error()))
        }
    }
}

impl Read for UnixDevice {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for UnixDevice {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.file.write(buf)
    }

    /// Push written data through to the device
    ///
    /// `File::flush` does nothing on Unix, so the data is synced here to
    /// surface write-back errors to the caller.
    fn flush(&mut self) -> std::io::Result<()> {
        self.file.flush()?;
        self.file.sync_data()
    }
}

impl Seek for UnixDevice {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        self.file.seek(pos)
    }
}

/// Get block device size, leaving the file positioned at the start
fn get_device_size(file: &mut File) -> Result<u64> {
    #[cfg(target_os = "linux")]
    {
        // Cast via u32 to handle the sign bit correctly on platforms where Ioctl is i32
        const BLKGETSIZE64: libc::Ioctl = 0x80081272u32 as libc::Ioctl;

        let mut size: u64 = 0;
        // SAFETY: ioctl with BLKGETSIZE64 writes a u64 to the provided pointer.
        // We pass a valid mutable reference to a u64, and fd is valid.
        #[allow(unsafe_code)]
        let result = unsafe { libc::ioctl(file.as_raw_fd(), BLKGETSIZE64, &mut size) };

        if result == 0 {
            return Ok(size);
        }
    }

    let size = file.seek(SeekFrom::End(0))?;
    file.seek(SeekFrom::Start(0))?;
    Ok(size)
}

/// Get logical sector size, falling back to 512
fn get_sector_size(file: &File) -> u32 {
    #[cfg(target_os = "linux")]
    {
        const BLKSSZGET: libc::Ioctl = 0x1268u32 as libc::Ioctl;

        let mut sector_size: libc::c_int = 0;
        // SAFETY: ioctl with BLKSSZGET writes an int to the provided pointer.
        // We pass a valid mutable reference to a c_int, and fd is valid.
        #[allow(unsafe_code)]
        let result = unsafe { libc::ioctl(file.as_raw_fd(), BLKSSZGET, &mut sector_size) };

        if result == 0 && sector_size > 0 {
            return sector_size as u32;
        }
    }

    #[cfg(not(target_os = "linux"))]
    let _ = file;

    DEFAULT_SECTOR_SIZE
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn scratch(len: usize) -> NamedTempFile {
        let mut temp = NamedTempFile::new().unwrap();
        temp.write_all(&vec![0x5Au8; len]).unwrap();
        temp.flush().unwrap();
        temp
    }

    // -------------------------------------------------------------------------
    // UnixDevice open tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_open_nonexistent_device() {
        let result = UnixDevice::open("/dev/nonexistent_device_xyz", OpenOptions::default());
        assert!(matches!(result, Err(PlatformError::DeviceNotFound(_))));
    }

    #[test]
    fn test_open_regular_file() {
        let temp = scratch(8192);
        let device = UnixDevice::open(temp.path().to_str().unwrap(), OpenOptions::default())
            .unwrap();

        let info = device.info();
        assert_eq!(info.path, temp.path().to_str().unwrap());
        assert_eq!(info.size, 8192);
        assert_eq!(info.sector_size, DEFAULT_SECTOR_SIZE);
        assert!(!info.is_block_device);
        assert_eq!(device.size(), 8192);
    }

    #[test]
    fn test_open_read_only() {
        let temp = scratch(64);
        let options = OpenOptions::new().write(false);
        let mut device = UnixDevice::open(temp.path().to_str().unwrap(), options).unwrap();

        let mut buffer = [0u8; 64];
        device.read_exact(&mut buffer).unwrap();
        assert!(buffer.iter().all(|&b| b == 0x5A));
        assert!(device.write(b"x").is_err());
    }

    // -------------------------------------------------------------------------
    // Read/Write/Seek trait tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_overwrite_in_place() {
        let temp = scratch(1024);
        let mut device = UnixDevice::open(temp.path().to_str().unwrap(), OpenOptions::default())
            .unwrap();

        device.seek(SeekFrom::Start(512)).unwrap();
        device.write_all(&[0u8; 512]).unwrap();
        device.flush().unwrap();
        device.sync().unwrap();

        let contents = std::fs::read(temp.path()).unwrap();
        assert_eq!(contents.len(), 1024);
        assert!(contents[..512].iter().all(|&b| b == 0x5A));
        assert!(contents[512..].iter().all(|&b| b == 0x00));
    }

    #[test]
    fn test_flush_persists_writes() {
        let temp = scratch(2048);
        let mut device = UnixDevice::open(temp.path().to_str().unwrap(), OpenOptions::default())
            .unwrap();

        device.write_all(&[0xFFu8; 2048]).unwrap();
        device.flush().unwrap();

        let contents = std::fs::read(temp.path()).unwrap();
        assert!(contents.iter().all(|&b| b == 0xFF));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_flush_reports_sync_failure() {
        // /dev/null accepts writes but cannot be synced
        let mut device = UnixDevice::open("/dev/null", OpenOptions::default()).unwrap();
        device.write_all(&[0u8; 512]).unwrap();

        let err = device.flush().unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EINVAL));
    }

    #[test]
    fn test_seek_reports_position() {
        let temp = scratch(100);
        let mut device = UnixDevice::open(temp.path().to_str().unwrap(), OpenOptions::default())
            .unwrap();

        assert_eq!(device.seek(SeekFrom::Current(0)).unwrap(), 0);
        assert_eq!(device.seek(SeekFrom::Start(40)).unwrap(), 40);
        assert_eq!(device.seek(SeekFrom::Current(1)).unwrap(), 41);
        assert_eq!(device.seek(SeekFrom::End(-3)).unwrap(), 97);
    }

    // -------------------------------------------------------------------------
    // Platform privilege tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_has_elevated_privileges() {
        // Only checks that the call does not panic
        let _ = UnixPlatform::has_elevated_privileges();
    }
}
