//! Linux disk detection implementation
//!
//! Uses /sys/block for enumeration, the udev database for serial numbers and
//! labels, and /proc/mounts plus /proc/swaps for mount points.

use super::{DetectError, Disk, DiskKind, MediaClass, Result};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Where device information is read from
#[derive(Debug, Clone)]
pub(crate) struct Layout {
    pub sys_block: PathBuf,
    pub udev_data: PathBuf,
}

impl Layout {
    fn system() -> Self {
        Self {
            sys_block: PathBuf::from("/sys/block"),
            udev_data: PathBuf::from("/run/udev/data"),
        }
    }
}

/// Device path → mount points
pub(crate) type MountTable = HashMap<String, Vec<String>>;

/// List all physical disks on Linux, including readers without media
///
/// # Errors
///
/// Returns an error if `/sys/block` or `/proc/mounts` cannot be read.
pub fn list_disks() -> Result<Vec<Disk>> {
    let mounts = get_mount_table()?;
    scan(&Layout::system(), &mounts, DiskKind::Physical)
}

/// List all partitions on Linux
///
/// # Errors
///
/// Returns an error if `/sys/block` or `/proc/mounts` cannot be read.
pub fn list_volumes() -> Result<Vec<Disk>> {
    let mounts = get_mount_table()?;
    scan(&Layout::system(), &mounts, DiskKind::Volume)
}

pub(crate) fn scan(layout: &Layout, mounts: &MountTable, kind: DiskKind) -> Result<Vec<Disk>> {
    if !layout.sys_block.exists() {
        return Err(DetectError::EnumerationFailed(format!(
            "{} not found",
            layout.sys_block.display()
        )));
    }

    let mut disks = Vec::new();

    for entry in fs::read_dir(&layout.sys_block)? {
        let name = entry?.file_name().to_string_lossy().to_string();

        if should_skip_device(&name) {
            continue;
        }

        let disk = read_disk(layout, &name, mounts);
        match kind {
            DiskKind::Physical => disks.push(disk),
            DiskKind::Volume => disks.extend(read_partitions(layout, &name, &disk, mounts)),
        }
    }

    tracing::debug!("Found {} {} entries", disks.len(), kind);
    Ok(disks)
}

/// Check if a device should be skipped
pub(crate) fn should_skip_device(name: &str) -> bool {
    name.starts_with("loop")
        || name.starts_with("ram")
        || name.starts_with("dm-")
        || name.starts_with("zram")
        || name.starts_with("md")
        || name.starts_with("sr") // optical drives
}

/// Read a whole disk from /sys/block/<name>
fn read_disk(layout: &Layout, name: &str, mounts: &MountTable) -> Disk {
    let sys_path = layout.sys_block.join(name);
    let udev = read_udev_properties(layout, &sys_path);

    let removable = read_sys_value(&sys_path.join("removable")).as_deref() == Some("1");
    let media = if name.starts_with("fd") {
        MediaClass::Floppy
    } else if removable {
        MediaClass::Removable
    } else if is_usb_attached(&sys_path) {
        MediaClass::External
    } else {
        MediaClass::Fixed
    };

    let model = match (
        read_sys_value(&sys_path.join("device/vendor")),
        read_sys_value(&sys_path.join("device/model")),
    ) {
        (Some(v), Some(m)) => format!("{v} {m}"),
        (None, Some(m)) => m,
        (Some(v), None) => v,
        (None, None) => String::new(),
    };

    let serial = udev
        .get("ID_SERIAL_SHORT")
        .or_else(|| udev.get("ID_SERIAL"))
        .cloned()
        .or_else(|| read_sys_value(&sys_path.join("device/serial")))
        .or_else(|| read_sys_value(&sys_path.join("device/wwid")))
        .or_else(|| read_sys_value(&sys_path.join("wwid")));

    let mut disk = Disk::new(format!("/dev/{name}"), DiskKind::Physical)
        .with_model(model)
        .with_serial(serial)
        .with_size(read_size(&sys_path))
        .with_media(media);
    disk.sector_size = read_sector_size(&sys_path);

    let mut device_names = vec![name.to_string()];
    device_names.extend(partition_names(&sys_path, name));
    for device in device_names {
        for mount_point in mounts.get(&format!("/dev/{device}")).into_iter().flatten() {
            disk = disk.with_mount_point(mount_point.clone());
        }
    }

    disk
}

/// Read the partitions of a disk as volumes
///
/// A partition's identity is its partition table UUID, which survives the
/// partition being overwritten. Without one it falls back to the parent
/// serial suffixed with the partition number.
fn read_partitions(layout: &Layout, name: &str, parent: &Disk, mounts: &MountTable) -> Vec<Disk> {
    let sys_path = layout.sys_block.join(name);

    partition_names(&sys_path, name)
        .into_iter()
        .map(|part| {
            let part_path = sys_path.join(&part);
            let udev = read_udev_properties(layout, &part_path);

            let serial = udev.get("ID_PART_ENTRY_UUID").cloned().or_else(|| {
                let number = read_sys_value(&part_path.join("partition"))?;
                parent.serial.as_ref().map(|s| format!("{s}-part{number}"))
            });

            let mut volume = Disk::new(format!("/dev/{part}"), DiskKind::Volume)
                .with_model(udev.get("ID_FS_LABEL").cloned().unwrap_or_default())
                .with_serial(serial)
                .with_size(read_size(&part_path))
                .with_media(parent.media);
            volume.sector_size = parent.sector_size;

            for mount_point in mounts.get(&format!("/dev/{part}")).into_iter().flatten() {
                volume = volume.with_mount_point(mount_point.clone());
            }

            volume
        })
        .collect()
}

/// Names of partition directories below a disk's sysfs directory
fn partition_names(sys_path: &Path, disk_name: &str) -> Vec<String> {
    let Ok(entries) = fs::read_dir(sys_path) else {
        return Vec::new();
    };

    let mut names: Vec<String> = entries
        .flatten()
        .map(|e| e.file_name().to_string_lossy().to_string())
        .filter(|n| n.starts_with(disk_name) && n != disk_name)
        .filter(|n| sys_path.join(n).join("partition").exists())
        .collect();
    names.sort();
    names
}

/// Size in bytes; sysfs always counts 512-byte units
fn read_size(sys_path: &Path) -> u64 {
    read_sys_value(&sys_path.join("size"))
        .and_then(|s| s.parse::<u64>().ok())
        .map_or(0, |sectors| sectors * 512)
}

fn read_sector_size(sys_path: &Path) -> u32 {
    read_sys_value(&sys_path.join("queue/logical_block_size"))
        .and_then(|s| s.parse::<u32>().ok())
        .filter(|&s| s > 0)
        .unwrap_or(512)
}

/// Whether the device sits below a USB controller
fn is_usb_attached(sys_path: &Path) -> bool {
    fs::canonicalize(sys_path.join("device"))
        .map(|p| p.components().any(|c| c.as_os_str().to_string_lossy().starts_with("usb")))
        .unwrap_or(false)
}

/// Properties from the udev database entry of a block device
fn read_udev_properties(layout: &Layout, sys_path: &Path) -> HashMap<String, String> {
    read_sys_value(&sys_path.join("dev"))
        .and_then(|dev| fs::read_to_string(layout.udev_data.join(format!("b{dev}"))).ok())
        .map(|content| parse_udev_data(&content))
        .unwrap_or_default()
}

/// Parse the `E:KEY=value` lines of a udev database entry
pub(crate) fn parse_udev_data(content: &str) -> HashMap<String, String> {
    content
        .lines()
        .filter_map(|line| line.strip_prefix("E:"))
        .filter_map(|kv| kv.split_once('='))
        .filter(|(_, v)| !v.trim().is_empty())
        .map(|(k, v)| (k.to_string(), v.trim().to_string()))
        .collect()
}

/// Build the mount table from /proc/mounts and /proc/swaps
///
/// # Errors
///
/// Returns an error if `/proc/mounts` cannot be read.
pub(crate) fn get_mount_table() -> Result<MountTable> {
    let mounts = fs::read_to_string("/proc/mounts")
        .map_err(|e| DetectError::EnumerationFailed(format!("Failed to read /proc/mounts: {e}")))?;
    let swaps = fs::read_to_string("/proc/swaps").unwrap_or_default();
    Ok(build_mount_table(&mounts, &swaps))
}

pub(crate) fn build_mount_table(mounts: &str, swaps: &str) -> MountTable {
    let mut table = MountTable::new();

    for (device, mount_point) in mounts.lines().filter_map(parse_mount_line) {
        table.entry(device).or_default().push(mount_point);
    }

    // Header line starts with "Filename"
    for device in swaps.lines().skip(1).filter_map(|l| l.split_whitespace().next()) {
        table
            .entry(device.to_string())
            .or_default()
            .push("[SWAP]".to_string());
    }

    table
}

/// Parse a single line from /proc/mounts
/// Format: device `mount_point` filesystem options dump pass
pub(crate) fn parse_mount_line(line: &str) -> Option<(String, String)> {
    let mut parts = line.split_whitespace();
    let device = parts.next()?;
    let mount_point = parts.next()?;
    parts.next()?;

    if !device.starts_with("/dev/") {
        return None;
    }

    Some((device.to_string(), decode_mount_point(mount_point)))
}

/// Decode octal escapes (`\040` for space) used in /proc/mounts
fn decode_mount_point(raw: &str) -> String {
    let bytes = raw.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let escaped = std::str::from_utf8(&bytes[i + 1..i + 4]).ok();
            if let Some(byte) = escaped.and_then(|s| u8::from_str_radix(s, 8).ok()) {
                out.push(byte);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    String::from_utf8_lossy(&out).to_string()
}

/// Read a trimmed, non-empty value from sysfs
fn read_sys_value(path: &Path) -> Option<String> {
    fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ============================================================================
// UNIT TESTS
// ============================================================================
