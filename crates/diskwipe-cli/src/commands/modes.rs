//! Modes command - describes the erase modes

use anyhow::Result;
use console::style;
use diskwipe_core::{EraseMode, Settings};
use std::path::PathBuf;

/// Execute the modes command
pub fn execute(config_file: Option<PathBuf>, silent: bool) -> Result<()> {
    if silent {
        return Ok(());
    }

    let configured = Settings::load_from_path(config_file.or_else(Settings::config_path)).mode;

    println!("{}", style("Erase modes").bold());
    println!();
    for line in mode_lines(configured) {
        println!("{}", line);
    }
    println!();
    println!(
        "{}",
        style("* = default. Change it with 'diskwipe settings --mode <MODE>'.").dim()
    );

    Ok(())
}

/// One line per mode, the configured one marked with `*`
pub fn mode_lines(configured: EraseMode) -> Vec<String> {
    EraseMode::all()
        .iter()
        .map(|&mode| {
            let marker = if mode == configured { '*' } else { ' ' };
            format!("{} {:<14} {}", marker, mode.name(), mode.description())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_lines_mark_configured() {
        let lines = mode_lines(EraseMode::Alternate);
        assert_eq!(lines.len(), 5);
        assert_eq!(lines.iter().filter(|l| l.starts_with('*')).count(), 1);
        assert_eq!(
            lines[2],
            "* alternate      Write alternating pattern of one and zero"
        );
    }

    #[test]
    fn test_mode_lines_default() {
        let lines = mode_lines(EraseMode::default());
        assert!(lines[0].starts_with("* zero"));
        assert!(lines[4].contains("cryptographically secure"));
    }
}
