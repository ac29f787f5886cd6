//! Windows disk detection implementation
//!
//! Uses PowerShell and CIM queries for device enumeration.

use super::wmi::{
    parse_disk_drives, parse_partition_letters, parse_volumes, DISK_DRIVE_QUERY, PARTITION_QUERY,
    VOLUME_QUERY,
};
use super::{DetectError, Disk, Result};
use std::process::Command;

/// List all physical disks on Windows
///
/// # Errors
///
/// Returns an error if PowerShell cannot be run or the disk query fails.
pub fn list_disks() -> Result<Vec<Disk>> {
    let drives = parse_disk_drives(&run_powershell(DISK_DRIVE_QUERY)?);

    // Drive letters are cosmetic for physical disks; do not fail without them
    let letters = match run_powershell(PARTITION_QUERY) {
        Ok(csv) => parse_partition_letters(&csv),
        Err(e) => {
            tracing::warn!("Could not map drive letters to disks: {}", e);
            Default::default()
        }
    };

    let disks: Vec<Disk> = drives
        .into_iter()
        .map(|(index, disk)| {
            letters
                .get(&index)
                .into_iter()
                .flatten()
                .fold(disk, |disk, letter| disk.with_mount_point(letter.clone()))
        })
        .collect();

    tracing::debug!("Found {} disks", disks.len());
    Ok(disks)
}

/// List all volumes on Windows
///
/// # Errors
///
/// Returns an error if PowerShell cannot be run or the volume query fails.
pub fn list_volumes() -> Result<Vec<Disk>> {
    let volumes = parse_volumes(&run_powershell(VOLUME_QUERY)?);
    tracing::debug!("Found {} volumes", volumes.len());
    Ok(volumes)
}

fn run_powershell(query: &str) -> Result<String> {
    let output = Command::new("powershell")
        .args(["-NoProfile", "-NonInteractive", "-Command", query])
        .output()
        .map_err(|e| DetectError::CommandFailed(format!("PowerShell failed: {e}")))?;

    if !output.status.success() {
        return Err(DetectError::CommandFailed(format!(
            "PowerShell query failed: {}",
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).to_string())
}
