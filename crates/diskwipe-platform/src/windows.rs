//! Windows platform implementation
//!
//! Opens `\\.\PhysicalDriveN` and `\\.\X:` paths with CreateFileW, sharing
//! read, write and delete access so mounted volumes remain usable.

use crate::{
    DeviceInfo, OpenOptions, PlatformError, PlatformOps, RawDevice, Result, DEFAULT_SECTOR_SIZE,
};
use std::io::{Read, Seek, SeekFrom, Write};
use std::ptr;
use windows_sys::Win32::Foundation::{
    CloseHandle, GENERIC_READ, GENERIC_WRITE, HANDLE, INVALID_HANDLE_VALUE,
};
use windows_sys::Win32::Storage::FileSystem::{
    CreateFileW, FlushFileBuffers, GetFileSizeEx, ReadFile, SetFilePointerEx, WriteFile,
    FILE_ATTRIBUTE_NORMAL, FILE_BEGIN, FILE_CURRENT, FILE_END, FILE_SHARE_DELETE, FILE_SHARE_READ,
    FILE_SHARE_WRITE, OPEN_EXISTING,
};
use windows_sys::Win32::System::Ioctl::{
    DISK_GEOMETRY, GET_LENGTH_INFORMATION, IOCTL_DISK_GET_DRIVE_GEOMETRY,
    IOCTL_DISK_GET_LENGTH_INFO,
};
use windows_sys::Win32::System::IO::DeviceIoControl;

/// Windows platform implementation
pub struct WindowsPlatform;

impl PlatformOps for WindowsPlatform {
    fn open_device(path: &str, options: OpenOptions) -> Result<Box<dyn RawDevice>> {
        WindowsDevice::open(path, options).map(|d| Box::new(d) as Box<dyn RawDevice>)
    }

    fn has_elevated_privileges() -> bool {
        is_elevated()
    }
}

/// Windows device wrapper for raw I/O
pub struct WindowsDevice {
    handle: HANDLE,
    info: DeviceInfo,
}

// SAFETY: the handle is owned exclusively by this wrapper and closed on drop.
#[allow(unsafe_code)]
unsafe impl Send for WindowsDevice {}

impl WindowsDevice {
    /// Open a physical drive or volume for raw I/O
    pub fn open(path: &str, options: OpenOptions) -> Result<Self> {
        let device_path = normalize_windows_path(path);

        let wide_path: Vec<u16> = device_path
            .encode_utf16()
            .chain(std::iter::once(0))
            .collect();

        let mut access = 0u32;
        if options.read {
            access |= GENERIC_READ;
        }
        if options.write {
            access |= GENERIC_WRITE;
        }

        // SAFETY: wide_path is a NUL-terminated UTF-16 buffer that outlives the call.
        // Security attributes and template handle are optional and passed as null.
        #[allow(unsafe_code)]
        let handle = unsafe {
            CreateFileW(
                wide_path.as_ptr(),
                access,
                FILE_SHARE_READ | FILE_SHARE_WRITE | FILE_SHARE_DELETE,
                ptr::null(),
                OPEN_EXISTING,
                FILE_ATTRIBUTE_NORMAL,
                0,
            )
        };

        if handle == INVALID_HANDLE_VALUE {
            let error = std::io::Error::last_os_error();
            return Err(match error.raw_os_error() {
                Some(5) => PlatformError::PermissionDenied(format!(
                    "Cannot open {}. Run as Administrator.",
                    device_path
                )),
                Some(32) => PlatformError::DeviceBusy(format!(
                    "{} is in use. Close any programs using it.",
                    device_path
                )),
                Some(2) | Some(3) => PlatformError::DeviceNotFound(device_path),
                _ => PlatformError::Io(error),
            });
        }

        let size = match get_device_size(handle) {
            Ok(size) => size,
            Err(e) => {
                // SAFETY: handle was returned valid by CreateFileW and is not used again.
                #[allow(unsafe_code)]
                unsafe {
                    CloseHandle(handle);
                }
                return Err(e);
            }
        };
        let sector_size = get_sector_size(handle);
        let is_block_device = device_path.starts_with("\\\\.\\");

        tracing::debug!(
            "Opened {} ({} bytes, {} byte sectors)",
            device_path,
            size,
            sector_size
        );

        Ok(Self {
            handle,
            info: DeviceInfo {
                path: device_path,
                size,
                sector_size,
                is_block_device,
            },
        })
    }
}

impl Drop for WindowsDevice {
    fn drop(&mut self) {
        // SAFETY: the handle is valid until this point and never used afterwards.
        #[allow(unsafe_code)]
        unsafe {
            CloseHandle(self.handle);
        }
    }
}

impl RawDevice for WindowsDevice {
    fn info(&self) -> &DeviceInfo {
        &self.info
    }

    fn sync(&self) -> Result<()> {
        // SAFETY: the handle is valid for the lifetime of self.
        #[allow(unsafe_code)]
        let result = unsafe { FlushFileBuffers(self.handle) };

        if result == 0 {
            Err(PlatformError::Io(std::io::Error::last_os_error()))
        } else {
            Ok(())
        }
    }
}

impl Read for WindowsDevice {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let mut bytes_read: u32 = 0;
        // SAFETY: buf is valid for writes of buf.len() bytes and the handle is open.
        #[allow(unsafe_code)]
        let result = unsafe {
            ReadFile(
                self.handle,
                buf.as_mut_ptr(),
                buf.len() as u32,
                &mut bytes_read,
                ptr::null_mut(),
            )
        };

        if result == 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(bytes_read as usize)
        }
    }
}

impl Write for WindowsDevice {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut bytes_written: u32 = 0;
        // SAFETY: buf is valid for reads of buf.len() bytes and the handle is open.
        #[allow(unsafe_code)]
        let result = unsafe {
            WriteFile(
                self.handle,
                buf.as_ptr(),
                buf.len() as u32,
                &mut bytes_written,
                ptr::null_mut(),
            )
        };

        if result == 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(bytes_written as usize)
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        // SAFETY: the handle is valid for the lifetime of self.
        #[allow(unsafe_code)]
        let result = unsafe { FlushFileBuffers(self.handle) };

        if result == 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(())
        }
    }
}

impl Seek for WindowsDevice {
    fn seek(&mut self, pos: SeekFrom) -> std::io::Result<u64> {
        let (offset, method) = match pos {
            SeekFrom::Start(n) => (n as i64, FILE_BEGIN),
            SeekFrom::End(n) => (n, FILE_END),
            SeekFrom::Current(n) => (n, FILE_CURRENT),
        };

        let mut new_pos: i64 = 0;
        // SAFETY: new_pos is a valid out pointer and the handle is open.
        #[allow(unsafe_code)]
        let result = unsafe { SetFilePointerEx(self.handle, offset, &mut new_pos, method) };

        if result == 0 {
            Err(std::io::Error::last_os_error())
        } else {
            Ok(new_pos as u64)
        }
    }
}

/// Normalize a device path for Windows
///
/// - "1" or "PhysicalDrive1" -> "\\.\PhysicalDrive1"
/// - "E:" or "E:\" -> "\\.\E:"
/// - "\\.\PhysicalDrive1" -> unchanged
fn normalize_windows_path(path: &str) -> String {
    if path.starts_with("\\\\.\\") {
        path.to_string()
    } else if path.starts_with("PhysicalDrive") {
        format!("\\\\.\\{}", path)
    } else if let Ok(n) = path.parse::<u32>() {
        format!("\\\\.\\PhysicalDrive{}", n)
    } else if is_drive_letter(path) {
        format!("\\\\.\\{}", &path[..2])
    } else {
        path.to_string()
    }
}

fn is_drive_letter(path: &str) -> bool {
    let bytes = path.as_bytes();
    matches!(bytes.len(), 2 | 3)
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && bytes.get(2).is_none_or(|&b| b == b'\\' || b == b'/')
}

/// Get device size on Windows
fn get_device_size(handle: HANDLE) -> Result<u64> {
    // SAFETY: GET_LENGTH_INFORMATION is plain data; all-zero is a valid value.
    #[allow(unsafe_code)]
    let mut length_info: GET_LENGTH_INFORMATION = unsafe { std::mem::zeroed() };
    let mut bytes_returned: u32 = 0;

    // SAFETY: the output buffer points to a GET_LENGTH_INFORMATION of the size passed.
    #[allow(unsafe_code)]
    let result = unsafe {
        DeviceIoControl(
            handle,
            IOCTL_DISK_GET_LENGTH_INFO,
            ptr::null(),
            0,
            &mut length_info as *mut _ as *mut _,
            std::mem::size_of::<GET_LENGTH_INFORMATION>() as u32,
            &mut bytes_returned,
            ptr::null_mut(),
        )
    };

    if result != 0 {
        return Ok(length_info.Length as u64);
    }

    // Regular files do not answer disk ioctls
    let mut size: i64 = 0;
    // SAFETY: size is a valid out pointer and the handle is open.
    #[allow(unsafe_code)]
    let result = unsafe { GetFileSizeEx(handle, &mut size) };

    if result != 0 {
        Ok(size as u64)
    } else {
        Err(PlatformError::Io(std::io::Error::last_os_error()))
    }
}

/// Get logical sector size, falling back to 512
fn get_sector_size(handle: HANDLE) -> u32 {
    // SAFETY: DISK_GEOMETRY is plain data; all-zero is a valid value.
    #[allow(unsafe_code)]
    let mut geometry: DISK_GEOMETRY = unsafe { std::mem::zeroed() };
    let mut bytes_returned: u32 = 0;

    // SAFETY: the output buffer points to a DISK_GEOMETRY of the size passed.
    #[allow(unsafe_code)]
    let result = unsafe {
        DeviceIoControl(
            handle,
            IOCTL_DISK_GET_DRIVE_GEOMETRY,
            ptr::null(),
            0,
            &mut geometry as *mut _ as *mut _,
            std::mem::size_of::<DISK_GEOMETRY>() as u32,
            &mut bytes_returned,
            ptr::null_mut(),
        )
    };

    if result != 0 && geometry.BytesPerSector > 0 {
        geometry.BytesPerSector
    } else {
        DEFAULT_SECTOR_SIZE
    }
}

/// Check if running with elevated privileges (Administrator)
fn is_elevated() -> bool {
    use windows_sys::Win32::Security::{
        GetTokenInformation, TokenElevation, TOKEN_ELEVATION, TOKEN_QUERY,
    };
    use windows_sys::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

    // SAFETY: every out pointer refers to a live local of the expected type and
    // the token handle is closed before returning.
    #[allow(unsafe_code)]
    unsafe {
        let mut token: HANDLE = 0;
        if OpenProcessToken(GetCurrentProcess(), TOKEN_QUERY, &mut token) == 0 {
            return false;
        }

        let mut elevation: TOKEN_ELEVATION = std::mem::zeroed();
        let mut size: u32 = 0;

        let result = GetTokenInformation(
            token,
            TokenElevation,
            &mut elevation as *mut _ as *mut _,
            std::mem::size_of::<TOKEN_ELEVATION>() as u32,
            &mut size,
        );

        CloseHandle(token);

        result != 0 && elevation.TokenIsElevated != 0
    }
}

// ============================================================================
// UNIT TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // -------------------------------------------------------------------------
    // Path normalization tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_normalize_windows_path_number() {
        assert_eq!(normalize_windows_path("0"), "\\\\.\\PhysicalDrive0");
        assert_eq!(normalize_windows_path("10"), "\\\\.\\PhysicalDrive10");
    }

    #[test]
    fn test_normalize_windows_path_name() {
        assert_eq!(
            normalize_windows_path("PhysicalDrive5"),
            "\\\\.\\PhysicalDrive5"
        );
        assert_eq!(
            normalize_windows_path("\\\\.\\PhysicalDrive1"),
            "\\\\.\\PhysicalDrive1"
        );
    }

    #[test]
    fn test_normalize_windows_path_volume() {
        assert_eq!(normalize_windows_path("E:"), "\\\\.\\E:");
        assert_eq!(normalize_windows_path("e:\\"), "\\\\.\\e:");
        assert_eq!(normalize_windows_path("\\\\.\\F:"), "\\\\.\\F:");
    }

    #[test]
    fn test_normalize_windows_path_other() {
        assert_eq!(normalize_windows_path("C:\\test.img"), "C:\\test.img");
        assert_eq!(normalize_windows_path("test.img"), "test.img");
    }
}
