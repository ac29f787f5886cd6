//! diskwipe - Resumable pattern erasing of removable disks and volumes
//!
//! # Usage
//!
//! ```bash
//! # List devices that may be erased
//! diskwipe list
//!
//! # Erase a USB stick with zeros
//! sudo diskwipe erase /dev/sdb
//!
//! # Erase a single volume with random data
//! sudo diskwipe erase /dev/sdb1 --volume --mode fast-random
//!
//! # Allow fixed disks and pick a default mode
//! diskwipe settings --allow-fixed-disk true --mode secure-random
//! ```

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use clap_mangen::Man;
use console::style;
use diskwipe_core::EraseMode;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

mod commands;
mod progress;

/// diskwipe - Resumable pattern erasing of removable disks and volumes
#[derive(Parser)]
#[command(name = "diskwipe")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Suppress ALL output (implies --quiet and --yes)
    #[arg(long, global = true)]
    silent: bool,

    /// Settings file to use instead of the default location
    #[arg(long, global = true, env = "DISKWIPE_CONFIG", value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List disks or volumes and whether they may be erased
    List {
        /// List volumes instead of whole disks
        #[arg(long)]
        volumes: bool,

        /// Show all devices, including ones the policy refuses
        #[arg(short, long)]
        all: bool,

        /// Output in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Overwrite a disk or volume with a pattern
    Erase {
        /// Device to erase (e.g., /dev/sdb, \\.\PhysicalDrive1, \\.\E:)
        device: String,

        /// Erase mode (zero, one, alternate, fast-random, secure-random)
        #[arg(short, long)]
        mode: Option<EraseMode>,

        /// Treat DEVICE as a volume rather than a whole disk
        #[arg(long)]
        volume: bool,

        /// Skip confirmation prompt (use with caution!)
        #[arg(short = 'y', long)]
        yes: bool,

        /// Discard saved progress and start from the beginning
        #[arg(long)]
        no_resume: bool,
    },

    /// Describe the available erase modes
    Modes,

    /// Show or change persistent settings
    Settings {
        /// Initialize a new settings file with defaults
        #[arg(long)]
        init: bool,

        /// Show the path to the settings file
        #[arg(long)]
        path: bool,

        /// Show settings in JSON format
        #[arg(long)]
        json: bool,

        /// Set the default erase mode
        #[arg(long)]
        mode: Option<EraseMode>,

        /// Allow or forbid erasing fixed disks
        #[arg(long, value_name = "BOOL")]
        allow_fixed_disk: Option<bool>,

        /// Forget all saved progress
        #[arg(long)]
        clear_progress: bool,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },

    /// Generate man pages
    Mangen {
        /// Output directory for man pages
        #[arg(short, long, default_value = ".")]
        out_dir: String,
    },
}

fn main() {
    // Set up panic handler for nicer error messages
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("{} {}", style("Error:").red().bold(), panic_info);
    }));

    if let Err(e) = run() {
        eprintln!("{} {}", style("Error:").red().bold(), e);

        // Show cause chain when backtraces are requested
        if std::env::var("RUST_BACKTRACE").is_ok() {
            let mut source = e.source();
            while let Some(cause) = source {
                eprintln!("  {} {}", style("Caused by:").yellow(), cause);
                source = cause.source();
            }
        }

        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // --silent implies --quiet (no logs at all, not even errors to tracing)
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else if cli.quiet || cli.silent {
        EnvFilter::new("off")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .init();

    let silent = cli.silent;
    let quiet = cli.quiet || silent;

    // First Ctrl+C requests cancellation, the second one exits
    let cancel_flag = Arc::new(AtomicBool::new(false));
    let flag = cancel_flag.clone();
    ctrlc::set_handler(move || {
        if flag.swap(true, Ordering::SeqCst) {
            if !silent {
                eprintln!("\n{}", style("Forced exit").red().bold());
            }
            std::process::exit(130);
        }
        if !silent {
            eprintln!(
                "\n{}",
                style("Cancelling... Press Ctrl+C again to force exit").yellow()
            );
        }
    })?;

    match cli.command {
        Commands::List { volumes, all, json } => commands::list::execute(commands::list::ListArgs {
            volumes,
            show_all: all,
            json,
            silent,
            config_file: cli.config,
        }),
        Commands::Erase {
            device,
            mode,
            volume,
            yes,
            no_resume,
        } => commands::erase::execute(commands::erase::EraseArgs {
            device,
            mode,
            volume,
            skip_confirm: yes || silent, // --silent implies --yes
            no_resume,
            cancel_flag,
            silent,
            quiet,
            config_file: cli.config,
        }),
        Commands::Modes => commands::modes::execute(cli.config, silent),
        Commands::Settings {
            init,
            path,
            json,
            mode,
            allow_fixed_disk,
            clear_progress,
        } => commands::settings::execute(commands::settings::SettingsArgs {
            init,
            path,
            json,
            mode,
            allow_fixed_disk,
            clear_progress,
            silent,
            config_file: cli.config,
        }),
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut std::io::stdout());
            Ok(())
        }
        Commands::Mangen { out_dir } => generate_man_pages(&out_dir, silent),
    }
}

fn generate_man_pages(out_dir: &str, silent: bool) -> Result<()> {
    let cmd = Cli::command();
    let out_path = std::path::Path::new(out_dir);
    std::fs::create_dir_all(out_path)?;

    let man = Man::new(cmd.clone());
    let mut buffer = Vec::new();
    man.render(&mut buffer)?;
    std::fs::write(out_path.join("diskwipe.1"), buffer)?;
    if !silent {
        println!("Generated: {}/diskwipe.1", out_dir);
    }

    for subcommand in cmd.get_subcommands() {
        let name = subcommand.get_name();
        if subcommand.is_hide_set() || matches!(name, "completions" | "mangen" | "help") {
            continue;
        }

        let man = Man::new(subcommand.clone());
        let mut buffer = Vec::new();
        man.render(&mut buffer)?;
        let filename = format!("diskwipe-{}.1", name);
        std::fs::write(out_path.join(&filename), buffer)?;
        if !silent {
            println!("Generated: {}/{}", out_dir, filename);
        }
    }

    if !silent {
        println!(
            "\nInstall with: sudo cp {}/*.1 /usr/local/share/man/man1/",
            out_dir
        );
    }
    Ok(())
}
