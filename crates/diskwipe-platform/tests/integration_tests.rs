//! Integration tests for diskwipe-platform
//!
//! These tests exercise the public API against regular files.
//! Tests that require actual devices are marked with #[ignore].

use diskwipe_platform::*;
use std::io::{Read, Seek, SeekFrom, Write};
use tempfile::NamedTempFile;

fn scratch(len: usize) -> NamedTempFile {
    let mut temp = NamedTempFile::new().unwrap();
    temp.write_all(&vec![0x5Au8; len]).unwrap();
    temp.flush().unwrap();
    temp
}

// ============================================================================
// OpenOptions tests
// ============================================================================

#[test]
fn test_open_options_builder_chain() {
    let opts = OpenOptions::new()
        .exclusive(false)
        .read(false)
        .write(true)
        .exclusive(true);

    assert!(opts.exclusive);
    assert!(!opts.read);
    assert!(opts.write);
}

// ============================================================================
// Error handling tests
// ============================================================================

#[test]
fn test_error_conversion_from_io() {
    let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "test");
    let platform_err: PlatformError = io_err.into();

    assert!(matches!(platform_err, PlatformError::Io(_)));
    assert!(platform_err.to_string().contains("IO error"));
}

#[test]
fn test_error_messages() {
    let errors = vec![
        PlatformError::PermissionDenied("test".to_string()),
        PlatformError::DeviceBusy("test".to_string()),
        PlatformError::DeviceNotFound("test".to_string()),
        PlatformError::NotSupported("test".to_string()),
    ];

    for err in errors {
        assert!(err.to_string().contains("test"));
    }
}

#[test]
fn test_open_nonexistent_file() {
    let result = open_device("/nonexistent/path/to/device", OpenOptions::default());
    assert!(result.is_err());
}

// ============================================================================
// File-based tests (work on all platforms)
// ============================================================================

#[test]
fn test_open_tempfile() {
    let temp = scratch(8192);
    let result = open_device(temp.path().to_str().unwrap(), OpenOptions::default());
    assert!(result.is_ok(), "Should open tempfile: {:?}", result.err());
}

#[test]
fn test_device_size_matches_file() {
    let temp = scratch(32768);
    let device = open_device(temp.path().to_str().unwrap(), OpenOptions::default()).unwrap();

    assert_eq!(device.size(), 32768);
    assert_eq!(device.info().sector_size, DEFAULT_SECTOR_SIZE);
    assert!(!device.info().path.is_empty());
}

#[test]
fn test_stream_starts_at_zero() {
    let temp = scratch(4096);
    let mut device = open_device(temp.path().to_str().unwrap(), OpenOptions::default()).unwrap();
    assert_eq!(device.stream_position().unwrap(), 0);
}

#[test]
fn test_sequential_overwrite() {
    let temp = scratch(8192);
    let mut device = open_device(temp.path().to_str().unwrap(), OpenOptions::default()).unwrap();

    for i in 0..8u8 {
        device.write_all(&[i; 1024]).unwrap();
    }
    device.flush().unwrap();
    device.sync().unwrap();

    device.seek(SeekFrom::Start(0)).unwrap();
    let mut contents = Vec::new();
    device.read_to_end(&mut contents).unwrap();

    assert_eq!(contents.len(), 8192);
    for (i, chunk) in contents.chunks(1024).enumerate() {
        assert!(chunk.iter().all(|&b| b == i as u8), "Mismatch at chunk {}", i);
    }
}

#[test]
fn test_skip_one_byte() {
    let temp = scratch(16);
    let mut device = open_device(temp.path().to_str().unwrap(), OpenOptions::default()).unwrap();

    device.write_all(&[0u8; 4]).unwrap();
    assert_eq!(device.seek(SeekFrom::Current(1)).unwrap(), 5);
    device.write_all(&[0u8; 11]).unwrap();
    drop(device);

    let contents = std::fs::read(temp.path()).unwrap();
    assert_eq!(contents[4], 0x5A);
    assert_eq!(contents.iter().filter(|&&b| b == 0).count(), 15);
}

#[cfg(target_os = "linux")]
#[test]
fn test_flush_reaches_device_sync() {
    let mut device = open_device("/dev/null", OpenOptions::default()).unwrap();
    device.write_all(&[0u8; 4096]).unwrap();

    // Character devices without fsync support reject the sync
    assert!(device.flush().is_err());
}

// ============================================================================
// Privilege check tests
// ============================================================================

#[test]
fn test_has_elevated_privileges_runs() {
    // Just verify it doesn't panic
    let _ = has_elevated_privileges();
}

// ============================================================================
// Platform-specific tests (marked as ignored)
// ============================================================================

#[test]
#[ignore]
fn test_open_real_device() {
    // Requires root/admin and a scratch device, for example:
    // - Linux: /dev/sdb
    // - Windows: \\.\PhysicalDrive1
}
