//! Erase engine
//!
//! This module drives a single erase run against a seekable stream:
//! - Resumes from the offset saved for the device, or restarts at zero when
//!   that offset cannot be used
//! - Writes the pattern buffer sequentially, never past the target size
//! - Falls back to byte-by-byte recovery when a bulk write fails
//! - Reports progress, autosaves the position and polls for cancellation on
//!   a fixed time cadence
//!
//! A run moves through `Idle → Resuming → Writing` and ends as
//! [`EraseOutcome::Completed`], [`EraseOutcome::Cancelled`] or a fatal
//! [`Error`](crate::Error). Targets without capacity end as
//! [`EraseOutcome::NothingToErase`] without touching the stream.
//!
//! # Example
//!
//! ```ignore
//! use diskwipe_core::{DeviceTarget, EraseEngine, EraseMode, MemoryProgressStore, PatternSource};
//!
//! let target = DeviceTarget::new(Some("AA00000000000489"), size, "Removable Media");
//! let pattern = PatternSource::for_target(EraseMode::Zero, target.total_size);
//! let mut store = MemoryProgressStore::new();
//!
//! let mut engine = EraseEngine::new()
//!     .on_progress(|p| println!("{} {}", p.percentage_display(), p.estimate.display()));
//!
//! let report = engine.run(&target, &mut device, pattern, &mut store)?;
//! println!("{:?}, {} damaged bytes", report.outcome, report.damaged_bytes);
//! ```

use crate::error::{Error, Result};
use crate::pattern::PatternSource;
use crate::progress::EraseProgress;
use crate::recovery::{recover_damaged_range, stream_position};
use crate::resume::{validate_resume_offset, ProgressStore};
use crate::target::DeviceTarget;
use std::io::{Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default interval between progress reports and cancellation polls
pub const DEFAULT_REPORT_INTERVAL: Duration = Duration::from_secs(1);

/// Default interval between progress autosaves
pub const DEFAULT_AUTOSAVE_INTERVAL: Duration = Duration::from_secs(60);

/// Progress callback type
pub type ProgressCallback = Box<dyn Fn(&EraseProgress) + Send + Sync>;

/// Warning callback type
pub type WarningCallback = Box<dyn Fn(&EraseWarning) + Send + Sync>;

/// Configuration for erase runs
#[derive(Debug, Clone)]
pub struct EraseConfig {
    /// How often progress is reported and cancellation is polled
    pub report_interval: Duration,

    /// How often the position is saved to the progress store
    pub autosave_interval: Duration,

    /// Whether to flush the stream when the loop ends
    pub flush_on_complete: bool,
}

impl Default for EraseConfig {
    fn default() -> Self {
        Self {
            report_interval: DEFAULT_REPORT_INTERVAL,
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
            flush_on_complete: true,
        }
    }
}

impl EraseConfig {
    /// Create a new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the progress report interval
    pub fn report_interval(mut self, interval: Duration) -> Self {
        self.report_interval = interval;
        self
    }

    /// Set the autosave interval
    pub fn autosave_interval(mut self, interval: Duration) -> Self {
        self.autosave_interval = interval;
        self
    }

    /// Set flush on complete
    pub fn flush_on_complete(mut self, flush: bool) -> Self {
        self.flush_on_complete = flush;
        self
    }
}

/// Non-fatal conditions surfaced while a run continues
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EraseWarning {
    /// The saved offset could not be applied; the run restarts at zero
    ResumeRejected {
        /// Offset found in the progress store
        offset: u64,
        /// Why it was rejected
        reason: String,
    },

    /// A periodic autosave failed
    AutosaveFailed {
        /// Position that should have been saved
        offset: u64,
        /// Store error
        reason: String,
    },

    /// The final progress store update failed
    StoreUpdateFailed {
        /// Store error
        reason: String,
    },
}

impl std::fmt::Display for EraseWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EraseWarning::ResumeRejected { offset, reason } => write!(
                f,
                "Cannot resume at offset {} ({}). Starting from the beginning; another disk may share this serial number",
                offset, reason
            ),
            EraseWarning::AutosaveFailed { offset, reason } => {
                write!(f, "Failed to autosave progress at {}: {}", offset, reason)
            }
            EraseWarning::StoreUpdateFailed { reason } => {
                write!(f, "Failed to update saved progress: {}", reason)
            }
        }
    }
}

/// Where a run started
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResumeStatus {
    /// No saved progress for the device
    Fresh,
    /// Continued from a saved offset
    Resumed {
        /// Offset the run continued from
        offset: u64,
    },
    /// Saved progress existed but was unusable
    Restarted {
        /// Offset found in the progress store
        requested: u64,
        /// Why it was rejected
        reason: String,
    },
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EraseOutcome {
    /// Every byte up to the target size was covered
    Completed,
    /// Cancellation was observed; progress was saved at `offset`
    Cancelled {
        /// Position at cancellation
        offset: u64,
    },
    /// The target reports no capacity; nothing was written
    NothingToErase,
}

/// Result of an erase run
#[derive(Debug, Clone)]
pub struct EraseReport {
    /// How the run ended
    pub outcome: EraseOutcome,

    /// Where the run started
    pub resume: ResumeStatus,

    /// Offset the write loop started from
    pub start_offset: u64,

    /// Stream position when the loop ended
    pub final_position: u64,

    /// Bytes the loop moved across in this run, damaged ones included
    pub bytes_written: u64,

    /// Bytes that could not be written
    pub damaged_bytes: u64,

    /// Bulk writes that needed byte-by-byte recovery
    pub damaged_ranges: u64,

    /// Total time elapsed
    pub elapsed: Duration,
}

impl EraseReport {
    /// Whether any byte failed to write
    pub fn is_damaged(&self) -> bool {
        self.damaged_bytes > 0
    }

    /// Whether the run covered the whole target
    pub fn is_completed(&self) -> bool {
        self.outcome == EraseOutcome::Completed
    }
}

/// Erase engine for block device streams
pub struct EraseEngine {
    config: EraseConfig,
    progress_callback: Option<ProgressCallback>,
    warning_callback: Option<WarningCallback>,
    cancel_flag: Arc<AtomicBool>,
    owns_cancel_flag: bool,
}

impl EraseEngine {
    /// Create a new engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EraseConfig::default())
    }

    /// Create a new engine with custom configuration
    pub fn with_config(config: EraseConfig) -> Self {
        Self {
            config,
            progress_callback: None,
            warning_callback: None,
            cancel_flag: Arc::new(AtomicBool::new(false)),
            owns_cancel_flag: true,
        }
    }

    /// Set a progress callback
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(&EraseProgress) + Send + Sync + 'static,
    {
        self.progress_callback = Some(Box::new(callback));
        self
    }

    /// Set a callback for non-fatal warnings
    pub fn on_warning<F>(mut self, callback: F) -> Self
    where
        F: Fn(&EraseWarning) + Send + Sync + 'static,
    {
        self.warning_callback = Some(Box::new(callback));
        self
    }

    /// Poll an existing flag for cancellation instead of the engine's own
    ///
    /// The engine never clears a flag it was given. A flag that is already
    /// set when `run` starts cancels the run at the first progress evaluation.
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel_flag = flag;
        self.owns_cancel_flag = false;
        self
    }

    /// Get a handle to cancel the run
    ///
    /// Setting the flag stops the run at the next progress evaluation.
    pub fn cancel_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel_flag)
    }

    /// Get the configuration
    pub fn config(&self) -> &EraseConfig {
        &self.config
    }

    /// Erase `target` through `stream`
    ///
    /// The pattern is consumed so its mode cannot change during the run.
    /// The progress store entry for the target is removed on completion and
    /// set to the final position on cancellation. Fatal errors leave the store
    /// as it was last autosaved.
    ///
    /// # Errors
    ///
    /// Fails on a stream that cannot seek, an empty pattern buffer, a failed
    /// seek before writing starts, an entropy failure, a stream that cannot be
    /// moved past a damaged range, or a failed final flush.
    pub fn run<W, S>(
        &mut self,
        target: &DeviceTarget,
        stream: &mut W,
        mut pattern: PatternSource,
        store: &mut S,
    ) -> Result<EraseReport>
    where
        W: Write + Seek,
        S: ProgressStore + ?Sized,
    {
        // Clear any request left over from a previous run
        if self.owns_cancel_flag {
            self.cancel_flag.store(false, Ordering::SeqCst);
        }

        let start_time = Instant::now();
        let total = target.total_size;

        if total == 0 {
            tracing::info!("{} reports no capacity, nothing to erase", target.identifier);
            return Ok(EraseReport {
                outcome: EraseOutcome::NothingToErase,
                resume: ResumeStatus::Fresh,
                start_offset: 0,
                final_position: 0,
                bytes_written: 0,
                damaged_bytes: 0,
                damaged_ranges: 0,
                elapsed: start_time.elapsed(),
            });
        }

        if pattern.is_empty() {
            return Err(Error::InvalidConfig("pattern buffer is empty".to_string()));
        }

        stream_position(stream)?;

        let resume = self.resume(target, stream, store)?;
        let start_offset = match resume {
            ResumeStatus::Resumed { offset } => offset,
            _ => 0,
        };

        tracing::info!(
            "Erasing {} from offset {} ({} bytes, mode {}, {} byte buffer)",
            target.identifier,
            start_offset,
            total,
            pattern.mode(),
            pattern.len()
        );

        let random = pattern.mode().is_random();
        let mut position = start_offset;
        let mut damaged_bytes = 0u64;
        let mut damaged_ranges = 0u64;
        let mut cancelled = false;
        let mut last_report = Instant::now();
        let mut last_autosave = Instant::now();

        while position < total && !cancelled {
            if random {
                pattern.fill()?;
            }

            let count = (pattern.len() as u64).min(total - position) as usize;

            if let Err(e) = stream.write_all(&pattern.buffer()[..count]) {
                tracing::debug!(offset = position, count, error = %e, "Bulk write failed");

                if stream_position(stream)? != position {
                    stream.seek(SeekFrom::Start(position))?;
                }

                damaged_bytes += recover_damaged_range(stream, pattern.buffer(), 0, count)?;
                damaged_ranges += 1;
            }

            position = stream_position(stream)?;

            if last_report.elapsed() >= self.config.report_interval {
                last_report = Instant::now();

                self.report(&EraseProgress::new(
                    position,
                    total,
                    start_offset,
                    start_time.elapsed(),
                    damaged_bytes,
                ));

                if last_autosave.elapsed() >= self.config.autosave_interval {
                    last_autosave = Instant::now();
                    self.autosave(store, &target.identifier, position);
                }

                if self.cancel_flag.load(Ordering::SeqCst) {
                    tracing::debug!("Cancellation requested at offset {}", position);
                    cancelled = true;
                }
            }
        }

        if self.config.flush_on_complete {
            stream.flush()?;
        }

        let elapsed = start_time.elapsed();
        self.report(&EraseProgress::new(
            position,
            total,
            start_offset,
            elapsed,
            damaged_bytes,
        ));

        let outcome = if !cancelled && position >= total {
            if let Err(e) = store.remove(&target.identifier) {
                tracing::warn!("Failed to clear saved progress for {}: {}", target.identifier, e);
                self.warn(&EraseWarning::StoreUpdateFailed {
                    reason: e.to_string(),
                });
            }
            tracing::info!(
                "Erase of {} completed in {:.1}s, {} damaged byte(s)",
                target.identifier,
                elapsed.as_secs_f64(),
                damaged_bytes
            );
            EraseOutcome::Completed
        } else {
            if let Err(e) = store.set(&target.identifier, position) {
                tracing::warn!("Failed to save progress for {}: {}", target.identifier, e);
                self.warn(&EraseWarning::StoreUpdateFailed {
                    reason: e.to_string(),
                });
            }
            tracing::info!("Erase of {} cancelled at offset {}", target.identifier, position);
            EraseOutcome::Cancelled { offset: position }
        };

        Ok(EraseReport {
            outcome,
            resume,
            start_offset,
            final_position: position,
            bytes_written: position - start_offset,
            damaged_bytes,
            damaged_ranges,
            elapsed,
        })
    }

    /// Position the stream for the run, honoring saved progress when possible
    fn resume<W, S>(&self, target: &DeviceTarget, stream: &mut W, store: &S) -> Result<ResumeStatus>
    where
        W: Seek,
        S: ProgressStore + ?Sized,
    {
        let Some(saved) = store.get(&target.identifier) else {
            stream.seek(SeekFrom::Start(0))?;
            return Ok(ResumeStatus::Fresh);
        };

        let rejection = match validate_resume_offset(saved, target.total_size) {
            Some(reason) => Some(reason),
            None => match stream.seek(SeekFrom::Start(saved)) {
                Ok(landed) if landed == saved => None,
                Ok(landed) => Some(format!("seek landed at {}", landed)),
                Err(e) => Some(e.to_string()),
            },
        };

        let Some(reason) = rejection else {
            tracing::info!("Resuming {} at offset {}", target.identifier, saved);
            return Ok(ResumeStatus::Resumed { offset: saved });
        };

        let warning = EraseWarning::ResumeRejected {
            offset: saved,
            reason: reason.clone(),
        };
        tracing::warn!("{}", warning);
        self.warn(&warning);

        stream.seek(SeekFrom::Start(0))?;
        Ok(ResumeStatus::Restarted {
            requested: saved,
            reason,
        })
    }

    fn autosave<S>(&self, store: &mut S, identifier: &str, position: u64)
    where
        S: ProgressStore + ?Sized,
    {
        match store.set(identifier, position) {
            Ok(()) => tracing::debug!("Autosaved {} at offset {}", identifier, position),
            Err(e) => {
                tracing::warn!("Autosave failed for {}: {}", identifier, e);
                self.warn(&EraseWarning::AutosaveFailed {
                    offset: position,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn report(&self, progress: &EraseProgress) {
        if let Some(ref callback) = self.progress_callback {
            callback(progress);
        }
    }

    fn warn(&self, warning: &EraseWarning) {
        if let Some(ref callback) = self.warning_callback {
            callback(warning);
        }
    }
}

impl Default for EraseEngine {
    fn default() -> Self {
        Self::new()
    }
}
