//! List command - displays disks or volumes and whether they may be erased

use anyhow::{Context, Result};
use console::style;
use diskwipe_core::{format_size, DeviceTarget, Policy, Settings};
use diskwipe_detect::{Disk, DiskKind};
use std::path::PathBuf;

/// Arguments for the list command
pub struct ListArgs {
    pub volumes: bool,
    pub show_all: bool,
    pub json: bool,
    pub silent: bool,
    pub config_file: Option<PathBuf>,
}

/// Execute the list command
pub fn execute(args: ListArgs) -> Result<()> {
    let kind = if args.volumes {
        DiskKind::Volume
    } else {
        DiskKind::Physical
    };

    let all_disks = diskwipe_detect::list(kind).context("Failed to list devices")?;
    let config_path = args.config_file.or_else(Settings::config_path);
    let policy = Settings::load_from_path(config_path).policy();

    let disks: Vec<&Disk> = all_disks
        .iter()
        .filter(|d| args.show_all || is_erasable(d, &policy))
        .collect();

    // JSON output mode - always output even in silent mode (it's machine-readable)
    if args.json {
        println!("{}", disks_to_json(&disks, &policy)?);
        return Ok(());
    }

    if args.silent {
        return Ok(());
    }

    if disks.is_empty() {
        if args.show_all {
            println!("No {}s found.", kind);
        } else {
            println!("No erasable {}s found.", kind);
            println!(
                "{}",
                style("Tip: Use --all to show every device, including refused ones").dim()
            );
        }
        return Ok(());
    }

    println!("{} {} {}(s):\n", style("Found").green().bold(), disks.len(), kind);

    for disk in &disks {
        print_disk(disk, &policy);
    }

    if !args.show_all {
        let hidden = all_disks.len() - disks.len();
        if hidden > 0 {
            println!(
                "{}",
                style(format!(
                    "Note: {} system, fixed or empty {}(s) hidden. Use --all to show.",
                    hidden, kind
                ))
                .dim()
            );
        }
    }

    Ok(())
}

/// Whether the device can be handed to the erase command
pub fn is_erasable(disk: &Disk, policy: &Policy) -> bool {
    !disk.is_system && disk.has_media() && policy.can_wipe(&disk.media_type)
}

fn print_disk(disk: &Disk, policy: &Policy) {
    let status = if is_erasable(disk, policy) {
        style("✓").green().bold()
    } else {
        style("✗").red().bold()
    };

    let size = if disk.has_media() {
        style(format_size(disk.size)).white()
    } else {
        style("no media".to_string()).yellow()
    };

    println!(
        "{} {} {} ({})",
        status,
        style(&disk.path).white().bold(),
        style(disk.display_name()).white(),
        size
    );

    let identifier = DeviceTarget::new(disk.serial.as_deref(), disk.size, "").identifier;
    println!(
        "    Serial: {} | Media: {}",
        style(identifier).dim(),
        style(&disk.media_type).dim()
    );

    if disk.is_system {
        println!(
            "    {} {}",
            style("SYSTEM").red().bold(),
            style(disk.system_reason.as_deref().unwrap_or("Marked as system disk")).dim()
        );
    } else if let Err(denial) = policy.check(&disk.media_type) {
        println!("    {}", style(denial).yellow());
    }

    if !disk.mount_points.is_empty() {
        println!("    Mounted: {}", style(disk.mount_points.join(", ")).dim());
    }

    println!();
}

/// JSON array of devices with their identifier and policy verdict
fn disks_to_json(disks: &[&Disk], policy: &Policy) -> Result<String> {
    let entries = disks
        .iter()
        .map(|disk| {
            let mut value = serde_json::to_value(disk)?;
            if let Some(object) = value.as_object_mut() {
                object.insert(
                    "identifier".into(),
                    DeviceTarget::new(disk.serial.as_deref(), disk.size, "")
                        .identifier
                        .into(),
                );
                object.insert("size_display".into(), format_size(disk.size).into());
                object.insert("can_wipe".into(), is_erasable(disk, policy).into());
            }
            Ok(value)
        })
        .collect::<Result<Vec<_>, serde_json::Error>>()?;

    Ok(serde_json::to_string_pretty(&entries)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use diskwipe_detect::MediaClass;

    fn usb_stick() -> Disk {
        Disk::new("/dev/sdb", DiskKind::Physical)
            .with_model("SanDisk Cruzer")
            .with_serial(Some("4C530001230517105223".to_string()))
            .with_size(16_000_000_000)
            .with_media(MediaClass::Removable)
    }

    fn internal_disk() -> Disk {
        Disk::new("/dev/sda", DiskKind::Physical)
            .with_size(500_000_000_000)
            .with_media(MediaClass::Fixed)
    }

    #[test]
    fn test_is_erasable_removable() {
        assert!(is_erasable(&usb_stick(), &Policy::new()));
    }

    #[test]
    fn test_is_erasable_fixed_needs_policy() {
        assert!(!is_erasable(&internal_disk(), &Policy::new()));
        assert!(is_erasable(
            &internal_disk(),
            &Policy::new().allow_fixed_disk(true)
        ));
    }

    #[test]
    fn test_is_erasable_never_system() {
        let disk = internal_disk().with_mount_point("/");
        assert!(!is_erasable(&disk, &Policy::new().allow_fixed_disk(true)));
    }

    #[test]
    fn test_is_erasable_needs_media() {
        let reader = Disk::new("/dev/sdc", DiskKind::Physical).with_media(MediaClass::Removable);
        assert!(!is_erasable(&reader, &Policy::new()));
    }

    #[test]
    fn test_disks_to_json() {
        let stick = usb_stick();
        let anonymous = internal_disk();
        let json = disks_to_json(&[&stick, &anonymous], &Policy::new()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value[0]["path"], "/dev/sdb");
        assert_eq!(value[0]["identifier"], "4C530001230517105223");
        assert_eq!(value[0]["size_display"], "14.9 GB");
        assert_eq!(value[0]["can_wipe"], true);
        assert_eq!(value[1]["identifier"], "UNKNOWN-SERIAL");
        assert_eq!(value[1]["can_wipe"], false);
    }

    #[test]
    fn test_disks_to_json_empty() {
        assert_eq!(disks_to_json(&[], &Policy::new()).unwrap(), "[]");
    }
}
