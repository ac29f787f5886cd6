//! Settings file management command

use anyhow::{Context, Result};
use console::style;
use diskwipe_core::{format_size, EraseMode, Settings};
use std::path::PathBuf;

/// Arguments for the settings command
pub struct SettingsArgs {
    /// Initialize a new settings file with defaults
    pub init: bool,
    /// Show the path to the settings file
    pub path: bool,
    /// Show settings in JSON format
    pub json: bool,
    /// New default erase mode
    pub mode: Option<EraseMode>,
    /// New fixed disk permission
    pub allow_fixed_disk: Option<bool>,
    /// Forget all saved progress
    pub clear_progress: bool,
    /// Suppress output (for scripting)
    pub silent: bool,
    /// Custom settings file path (overrides default)
    pub config_file: Option<PathBuf>,
}

impl SettingsArgs {
    fn has_changes(&self) -> bool {
        self.mode.is_some() || self.allow_fixed_disk.is_some() || self.clear_progress
    }
}

/// Execute the settings command
pub fn execute(args: SettingsArgs) -> Result<()> {
    let config_path = args.config_file.clone().or_else(Settings::config_path);

    if args.path {
        if let Some(path) = &config_path {
            if !args.silent {
                println!("{}", path.display());
            }
        } else if !args.silent {
            eprintln!("{}", style("Could not determine settings path").yellow());
        }
        return Ok(());
    }

    if args.init {
        return init_settings(config_path, args.silent);
    }

    if args.has_changes() {
        return update_settings(&args, config_path);
    }

    show_settings(config_path, args.json, args.silent)
}

/// Initialize a new settings file with default values
fn init_settings(config_path: Option<PathBuf>, silent: bool) -> Result<()> {
    let path = config_path.context("Could not determine configuration directory")?;

    if path.exists() {
        if !silent {
            eprintln!(
                "{} Settings file already exists at: {}",
                style("Warning:").yellow(),
                path.display()
            );
            eprintln!("Use 'diskwipe settings --mode ...' to change it, or delete it to re-initialize.");
        }
        return Ok(());
    }

    let saved_path = Settings::default()
        .save_to_path(Some(path))
        .context("Failed to save settings file")?;

    if !silent {
        println!(
            "{} Created settings file at: {}",
            style("Success:").green(),
            saved_path.display()
        );
    }

    Ok(())
}

/// Apply the requested changes and save
fn update_settings(args: &SettingsArgs, config_path: Option<PathBuf>) -> Result<()> {
    let mut settings = Settings::load_from_path(config_path.clone());
    let cleared = apply_changes(&mut settings, args);

    let saved_path = settings
        .save_to_path(config_path)
        .context("Failed to save settings file")?;

    if !args.silent {
        if let Some(mode) = args.mode {
            println!("  mode = \"{}\" ({})", mode, mode.description());
        }
        if let Some(allow) = args.allow_fixed_disk {
            println!("  allow_fixed_disk = {}", allow);
        }
        if args.clear_progress {
            println!("  Cleared {} saved run(s)", cleared);
        }
        println!(
            "{} Saved settings to: {}",
            style("Success:").green(),
            saved_path.display()
        );
    }

    Ok(())
}

/// Apply changes to settings; returns the number of cleared progress entries
fn apply_changes(settings: &mut Settings, args: &SettingsArgs) -> usize {
    if let Some(mode) = args.mode {
        settings.mode = mode;
    }
    if let Some(allow) = args.allow_fixed_disk {
        settings.allow_fixed_disk = allow;
    }
    if args.clear_progress {
        settings.clear_progress()
    } else {
        0
    }
}

/// Show the current settings
fn show_settings(config_path: Option<PathBuf>, json: bool, silent: bool) -> Result<()> {
    if silent {
        return Ok(());
    }

    let config_exists = config_path.as_ref().is_some_and(|p| p.exists());
    let settings = Settings::load_from_path(config_path.clone());

    if json {
        let json_output = serde_json::to_string_pretty(&settings)
            .context("Failed to serialize settings to JSON")?;
        println!("{}", json_output);
        return Ok(());
    }

    println!("{}", style("diskwipe Settings").bold());
    println!();

    if let Some(path) = &config_path {
        if config_exists {
            println!("  {} {}", style("Settings file:").dim(), path.display());
        } else {
            println!(
                "  {} {} {}",
                style("Settings file:").dim(),
                path.display(),
                style("(not found, using defaults)").yellow()
            );
        }
    }
    println!();

    println!("  allow_fixed_disk = {}", settings.allow_fixed_disk);
    println!(
        "  mode = \"{}\" {}",
        settings.mode,
        style(format!("({})", settings.mode.description())).dim()
    );
    println!();

    println!("{}", style("[progress]").cyan());
    if settings.progress.is_empty() {
        println!("  {}", style("(no unfinished runs)").dim());
    }
    for (identifier, offset) in &settings.progress {
        println!(
            "  \"{}\" = {} {}",
            identifier,
            offset,
            style(format!("({})", format_size(*offset))).dim()
        );
    }

    if !config_exists {
        println!();
        println!(
            "{}",
            style("Run 'diskwipe settings --init' to create a settings file.").dim()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn args(config_file: PathBuf) -> SettingsArgs {
        SettingsArgs {
            init: false,
            path: false,
            json: false,
            mode: None,
            allow_fixed_disk: None,
            clear_progress: false,
            silent: true,
            config_file: Some(config_file),
        }
    }

    #[test]
    fn test_has_changes() {
        let dir = TempDir::new().unwrap();
        let mut a = args(dir.path().join("s.toml"));
        assert!(!a.has_changes());
        a.clear_progress = true;
        assert!(a.has_changes());
    }

    #[test]
    fn test_show_settings_silent() {
        assert!(show_settings(None, false, true).is_ok());
        assert!(show_settings(None, true, true).is_ok());
    }

    #[test]
    fn test_init_creates_file_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diskwipe_settings.toml");

        execute(SettingsArgs {
            init: true,
            ..args(path.clone())
        })
        .unwrap();
        assert!(path.exists());

        std::fs::write(&path, "mode = \"one\"\n").unwrap();
        execute(SettingsArgs {
            init: true,
            ..args(path.clone())
        })
        .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "mode = \"one\"\n");
    }

    #[test]
    fn test_update_settings_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("diskwipe_settings.toml");

        execute(SettingsArgs {
            mode: Some(EraseMode::SecureRandom),
            allow_fixed_disk: Some(true),
            ..args(path.clone())
        })
        .unwrap();

        let loaded = Settings::load_from_path(Some(path));
        assert_eq!(loaded.mode, EraseMode::SecureRandom);
        assert!(loaded.allow_fixed_disk);
    }

    #[test]
    fn test_apply_changes_clears_progress() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::default();
        settings.progress.insert("A".to_string(), 1);
        settings.progress.insert("B".to_string(), 2);

        let cleared = apply_changes(
            &mut settings,
            &SettingsArgs {
                clear_progress: true,
                ..args(dir.path().join("unused.toml"))
            },
        );

        assert_eq!(cleared, 2);
        assert!(settings.progress.is_empty());
        assert_eq!(settings.mode, EraseMode::Zero);
    }

    #[test]
    fn test_settings_json_serialization() {
        let json = serde_json::to_string_pretty(&Settings::default()).unwrap();
        assert!(json.contains("allow_fixed_disk"));
        assert!(json.contains("\"mode\": \"zero\""));
        assert!(json.contains("progress"));
    }
}
