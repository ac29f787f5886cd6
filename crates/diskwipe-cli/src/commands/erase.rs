//! Erase command - overwrites a disk or volume with a pattern
//!
//! This is the main functionality of diskwipe. It handles:
//! - Target resolution and policy checks
//! - User confirmation
//! - Resuming from saved progress
//! - Erasing with progress display
//! - Reporting damaged media

use anyhow::{bail, Context, Result};
use console::style;
use dialoguer::Confirm;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use diskwipe_core::{
    format_clock, format_size, DeviceTarget, Denial, EraseEngine, EraseMode, EraseOutcome,
    EraseReport, PatternSource, Policy, ResumeStatus, Settings, SettingsProgressStore,
};
use diskwipe_detect::{find_disk, DetectError, Disk, DiskKind};
use diskwipe_platform::{has_elevated_privileges, open_device, OpenOptions};

use crate::progress::{create_erase_progress_bar, update_bar};

/// Arguments for the erase command
pub struct EraseArgs {
    pub device: String,
    pub mode: Option<EraseMode>,
    pub volume: bool,
    pub skip_confirm: bool,
    pub no_resume: bool,
    pub cancel_flag: Arc<AtomicBool>,
    pub silent: bool,
    pub quiet: bool,
    pub config_file: Option<PathBuf>,
}

/// Conditionally print based on silent mode
macro_rules! print_if {
    ($silent:expr, $($arg:tt)*) => {
        if !$silent {
            print!($($arg)*);
        }
    };
}

/// Conditionally println based on silent mode
macro_rules! println_if {
    ($silent:expr) => {
        if !$silent {
            println!();
        }
    };
    ($silent:expr, $($arg:tt)*) => {
        if !$silent {
            println!($($arg)*);
        }
    };
}

/// Execute the erase command
pub fn execute(args: EraseArgs) -> Result<()> {
    let silent = args.silent;
    let config_path = args.config_file.clone().or_else(Settings::config_path);
    let mut settings = Settings::load_from_path(config_path.clone());
    let mode = args.mode.unwrap_or(settings.mode);

    // Step 1: Resolve the target device
    let kind = if args.volume {
        DiskKind::Volume
    } else {
        DiskKind::Physical
    };

    println_if!(
        silent,
        "{} {}",
        style("Target:").bold(),
        style(&args.device).cyan()
    );

    let disk = match find_disk(&args.device, kind) {
        Ok(disk) => disk,
        Err(DetectError::DeviceNotFound(path)) => bail!(
            "{} '{}' not found.\n\
             Run 'diskwipe list{}' to see available devices.",
            if args.volume { "Volume" } else { "Device" },
            path,
            if args.volume { " --volumes" } else { "" }
        ),
        Err(e) => return Err(e).context("Failed to list devices"),
    };

    // Step 2: Policy gate
    let target = check_target(&disk, &settings.policy())?;

    println_if!(
        silent,
        "  {} {} ({}, {})",
        style("✓").green(),
        disk.display_name(),
        format_size(target.total_size),
        target.media_class
    );
    println_if!(silent, "  Serial: {}", target.identifier);
    println_if!(
        silent,
        "  Mode: {} ({})",
        style(mode).cyan(),
        mode.description()
    );

    if target.is_empty() {
        println_if!(
            silent,
            "\n{}",
            style("Nothing to erase: the device reports no capacity.").yellow()
        );
        return Ok(());
    }

    // Step 3: Saved progress
    if let Some(offset) = settings.progress.get(&target.identifier).copied() {
        if args.no_resume {
            settings.progress.remove(&target.identifier);
            settings
                .save_to_path(config_path.clone())
                .context("Failed to discard saved progress")?;
            println_if!(
                silent,
                "  {} Discarded saved progress at {}",
                style("ℹ").blue(),
                format_size(offset)
            );
        } else {
            println_if!(
                silent,
                "\n{}",
                style("Saved progress found for this device.").bold().cyan()
            );
            println_if!(silent, "  It will continue at {}", format_size(offset));
        }
    }

    // Step 4: Check for elevated privileges
    if !has_elevated_privileges() {
        #[cfg(unix)]
        bail!(
            "Root privileges required.\n\
             Try running with: sudo diskwipe erase ..."
        );

        #[cfg(windows)]
        bail!(
            "Administrator privileges required.\n\
             Right-click and select 'Run as administrator'."
        );

        #[cfg(not(any(unix, windows)))]
        bail!("Elevated privileges required for raw device access.");
    }

    // Step 5: Confirmation (skip_confirm is already true when silent)
    if !args.skip_confirm {
        println!();
        println!("{}", style("-- DATA LOSS IMMINENT --").red().bold());
        println!(
            "{}",
            style(format!(
                "Every byte on {} will be overwritten. This cannot be undone.",
                disk.path
            ))
            .red()
        );
        println!();

        let proceed = Confirm::new()
            .with_prompt(format!("Erase {} with mode '{}'?", disk.path, mode))
            .default(false)
            .interact()?;

        if !proceed {
            println!("{}", style("Aborted.").yellow());
            return Ok(());
        }
    }

    // A Ctrl+C during the prompt stands; nothing has been written yet
    if args.cancel_flag.load(Ordering::SeqCst) {
        println_if!(silent, "{}", style("Aborted.").yellow());
        return Ok(());
    }

    // Step 6: Open the device
    println_if!(silent, "\n{}", style("Erasing...").bold());

    let mut device = open_device(&disk.path, OpenOptions::new())
        .with_context(|| format!("Failed to open device: {}", disk.path))?;

    let device_info = device.info().clone();
    tracing::debug!(
        "Opened device: {} ({} bytes, sector_size={})",
        device_info.path,
        device_info.size,
        device_info.sector_size
    );
    if device_info.size != target.total_size {
        tracing::debug!(
            "Device reports {} bytes, enumeration reported {}",
            device_info.size,
            target.total_size
        );
    }

    // Step 7: Run the engine
    let pb = create_erase_progress_bar(target.total_size, silent || args.quiet);
    let pb_progress = pb.clone();

    // Warnings reach the terminal through the engine's tracing output
    let mut engine = EraseEngine::new()
        .with_cancel_flag(args.cancel_flag.clone())
        .on_progress(move |progress| update_bar(&pb_progress, progress));

    let pattern = PatternSource::for_target(mode, target.total_size);
    let mut store = SettingsProgressStore::new(&mut settings, config_path);
    let result = engine.run(&target, &mut device, pattern, &mut store);

    pb.finish_and_clear();

    let report = result.context("Erase failed")?;

    // Step 8: Sync using platform layer
    print_if!(silent, "  Syncing... ");
    if !silent {
        std::io::stdout().flush()?;
    }
    device.sync().context("Failed to sync device")?;
    println_if!(silent, "{}", style("done").green());

    if !silent {
        render_report(&report);
    }

    Ok(())
}

/// Apply the wipe policy to a detected device
///
/// System disks are refused regardless of the policy.
pub fn check_target(disk: &Disk, policy: &Policy) -> Result<DeviceTarget> {
    if disk.is_system {
        bail!(
            "Refusing to erase system {}: {}\n\
             Reason: {}",
            disk.kind,
            disk.path,
            disk.system_reason.as_deref().unwrap_or("Marked as system disk")
        );
    }

    let target = DeviceTarget::new(disk.serial.as_deref(), disk.size, disk.media_type.clone());

    match policy.check(&target.media_class) {
        Ok(()) => Ok(target),
        Err(denial @ Denial::FixedDiskDisallowed) => bail!(
            "{}\n\
             To allow them, run: diskwipe settings --allow-fixed-disk true",
            denial
        ),
        Err(denial) => bail!("{} Refusing to erase {}.", denial, disk.path),
    }
}

/// Plain-text summary lines for a finished run
pub fn report_lines(report: &EraseReport) -> Vec<String> {
    let mut lines = Vec::new();

    match &report.resume {
        ResumeStatus::Resumed { offset } => {
            lines.push(format!("Resumed at {}", format_size(*offset)));
        }
        ResumeStatus::Restarted { requested, .. } => {
            lines.push(format!(
                "Saved progress at {} was unusable; started from the beginning",
                format_size(*requested)
            ));
        }
        ResumeStatus::Fresh => {}
    }

    match report.outcome {
        EraseOutcome::Completed => lines.push(format!(
            "Erased {} in {}",
            format_size(report.bytes_written),
            format_clock(report.elapsed)
        )),
        EraseOutcome::Cancelled { offset } => lines.push(format!(
            "Operation cancelled. Progress will be saved at {}",
            format_size(offset)
        )),
        EraseOutcome::NothingToErase => {
            lines.push("Nothing to erase: the device reports no capacity.".to_string());
        }
    }

    if report.is_damaged() {
        lines.push(format!(
            "{} byte(s) in {} range(s) could not be written",
            report.damaged_bytes, report.damaged_ranges
        ));
    }

    lines
}

fn render_report(report: &EraseReport) {
    let lines = report_lines(report);
    let (summary, rest) = lines.split_at(lines.len().saturating_sub(usize::from(report.is_damaged())));

    for line in summary {
        println!("  {}", line);
    }

    if report.is_damaged() {
        println!();
        println!("{}", style("-- DAMAGED DISK/VOLUME --").red().bold());
        for line in rest {
            println!("  {}", style(line).red());
        }
        println!("{}", style("Recommendation: Discard this media.").red().bold());
    }

    println!();
    match report.outcome {
        EraseOutcome::Completed => println!(
            "{}",
            style("✓ Erase complete! You can safely remove the device.")
                .green()
                .bold()
        ),
        EraseOutcome::Cancelled { .. } => println!(
            "{}",
            style("Run the same command again to continue.").yellow()
        ),
        EraseOutcome::NothingToErase => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use diskwipe_detect::MediaClass;
    use std::time::Duration;

    fn removable() -> Disk {
        Disk::new("/dev/sdb", DiskKind::Physical)
            .with_serial(Some("  4C530001230517105223 ".to_string()))
            .with_size(2_500_000)
            .with_media(MediaClass::Removable)
    }

    fn report(outcome: EraseOutcome, damaged_bytes: u64) -> EraseReport {
        EraseReport {
            outcome,
            resume: ResumeStatus::Fresh,
            start_offset: 0,
            final_position: 2_500_000,
            bytes_written: 2_500_000,
            damaged_bytes,
            damaged_ranges: u64::from(damaged_bytes > 0),
            elapsed: Duration::from_secs(75),
        }
    }

    // -------------------------------------------------------------------------
    // check_target tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_check_target_removable() {
        let target = check_target(&removable(), &Policy::new()).unwrap();
        assert_eq!(target.identifier, "4C530001230517105223");
        assert_eq!(target.total_size, 2_500_000);
        assert_eq!(target.media_class, "Removable Media");
    }

    #[test]
    fn test_check_target_fixed_disallowed() {
        let disk = removable().with_media(MediaClass::Fixed);
        let err = check_target(&disk, &Policy::new()).unwrap_err().to_string();
        assert!(err.contains("Fixed disks are disallowed."));
        assert!(err.contains("--allow-fixed-disk true"));
    }

    #[test]
    fn test_check_target_fixed_allowed() {
        let disk = removable().with_media(MediaClass::External);
        assert!(check_target(&disk, &Policy::new().allow_fixed_disk(true)).is_ok());
    }

    #[test]
    fn test_check_target_unknown_media() {
        let disk = removable().with_media(MediaClass::Unknown);
        let err = check_target(&disk, &Policy::new().allow_fixed_disk(true))
            .unwrap_err()
            .to_string();
        assert!(err.contains("unknown"));
    }

    #[test]
    fn test_check_target_system_disk() {
        let disk = removable().with_mount_point("/boot");
        let err = check_target(&disk, &Policy::new().allow_fixed_disk(true))
            .unwrap_err()
            .to_string();
        assert!(err.contains("Refusing to erase system disk"));
    }

    #[test]
    fn test_check_target_missing_serial() {
        let disk = removable().with_serial(None);
        let target = check_target(&disk, &Policy::new()).unwrap();
        assert_eq!(target.identifier, "UNKNOWN-SERIAL");
    }

    // -------------------------------------------------------------------------
    // report_lines tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_report_lines_completed() {
        let lines = report_lines(&report(EraseOutcome::Completed, 0));
        assert_eq!(lines, vec!["Erased 2.384 MB in 00:01:15"]);
    }

    #[test]
    fn test_report_lines_cancelled() {
        let lines = report_lines(&report(EraseOutcome::Cancelled { offset: 1024 }, 0));
        assert_eq!(lines, vec!["Operation cancelled. Progress will be saved at 1 KB"]);
    }

    #[test]
    fn test_report_lines_damaged_last() {
        let lines = report_lines(&report(EraseOutcome::Completed, 11));
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "11 byte(s) in 1 range(s) could not be written");
    }

    #[test]
    fn test_report_lines_resumed() {
        let mut r = report(EraseOutcome::Completed, 0);
        r.resume = ResumeStatus::Resumed { offset: 1_048_576 };
        assert_eq!(report_lines(&r)[0], "Resumed at 1 MB");
    }

    #[test]
    fn test_report_lines_restarted() {
        let mut r = report(EraseOutcome::Completed, 0);
        r.resume = ResumeStatus::Restarted {
            requested: 4096,
            reason: "beyond end".to_string(),
        };
        assert!(report_lines(&r)[0].contains("4 KB was unusable"));
    }
}
