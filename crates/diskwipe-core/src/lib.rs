//! # diskwipe Core
//!
//! Core library providing the erase engine for the diskwipe disk sanitizing tool.
//!
//! ## Modules
//!
//! - `engine`: Sequential erase loop with resume, progress and cancellation
//! - `pattern`: Erase modes and the pattern buffer they produce
//! - `recovery`: Byte-by-byte rewriting of ranges a bulk write failed on
//! - `resume`: Progress store contract and in-memory implementation
//! - `progress`: Percentage, time estimate and display helpers
//! - `target`: Description of the device being erased
//! - `config`: Wipe policy deciding which media may be targeted
//! - `settings`: Persistent user settings from configuration file
//! - `error`: Error types and result aliases
//!
//! ## Example
//!
//! ```ignore
//! use diskwipe_core::{DeviceTarget, EraseEngine, EraseMode, PatternSource, Settings, SettingsProgressStore};
//!
//! let mut settings = Settings::load();
//! let target = DeviceTarget::new(Some(serial), size, "Removable Media");
//! if !settings.policy().can_wipe(&target.media_class) {
//!     return Ok(());
//! }
//!
//! let pattern = PatternSource::for_target(settings.mode, target.total_size);
//! let mut store = SettingsProgressStore::new(&mut settings, Settings::config_path());
//!
//! let mut engine = EraseEngine::new()
//!     .on_progress(|p| println!("{} {}", p.percentage_display(), p.estimate.display()));
//!
//! let report = engine.run(&target, &mut device, pattern, &mut store)?;
//! println!("{:?} with {} damaged bytes", report.outcome, report.damaged_bytes);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod engine;
pub mod error;
pub mod pattern;
pub mod progress;
pub mod recovery;
pub mod resume;
pub mod settings;
pub mod target;

pub use config::{Denial, Policy};
pub use engine::{
    EraseConfig, EraseEngine, EraseOutcome, EraseReport, EraseWarning, ResumeStatus,
    DEFAULT_AUTOSAVE_INTERVAL, DEFAULT_REPORT_INTERVAL,
};
pub use error::{Error, Result};
pub use pattern::{
    buffer_size_for, EraseMode, PatternSource, LARGE_BUFFER_SIZE, LARGE_MEDIA_THRESHOLD,
    SMALL_BUFFER_SIZE,
};
pub use progress::{
    format_clock, format_size, percentage, round_percentage, time_estimate, EraseProgress,
    TimeEstimate,
};
pub use recovery::recover_damaged_range;
pub use resume::{validate_resume_offset, MemoryProgressStore, ProgressStore};
pub use settings::{Settings, SettingsError, SettingsProgressStore, CONFIG_FILE_NAME};
pub use target::{DeviceTarget, UNKNOWN_IDENTIFIER};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_policy_gate() {
        let settings = Settings::default();
        let target = DeviceTarget::new(Some("ABC"), 4096, "Fixed hard disk media");
        assert!(!settings.policy().can_wipe(&target.media_class));
    }

    #[test]
    fn test_pattern_for_target() {
        let target = DeviceTarget::new(Some("ABC"), 2_500_000, "Removable Media");
        let pattern = PatternSource::for_target(EraseMode::Alternate, target.total_size);
        assert_eq!(pattern.len(), SMALL_BUFFER_SIZE);
    }
}
