//! Progress bar utilities for the CLI

use diskwipe_core::{format_size, EraseProgress};
use indicatif::{ProgressBar, ProgressStyle};

const ERASE_TEMPLATE: &str =
    "  {spinner:.green} Erasing [{bar:40.cyan/blue}] {bytes}/{total_bytes} {msg}";

/// Create a progress bar for an erase run
pub fn create_erase_progress_bar(total: u64, silent: bool) -> ProgressBar {
    if silent {
        return ProgressBar::hidden();
    }

    let pb = if total > 0 {
        ProgressBar::new(total)
    } else {
        ProgressBar::new_spinner()
    };

    match ProgressStyle::with_template(ERASE_TEMPLATE) {
        Ok(style) => pb.set_style(style.progress_chars("█▓░")),
        Err(e) => tracing::debug!("Invalid progress template: {}", e),
    }

    pb
}

/// Message shown next to the bar: percentage, `elapsed/estimate` and damage
pub fn progress_message(progress: &EraseProgress) -> String {
    let mut message = format!(
        "{} {}",
        progress.percentage_display(),
        progress.estimate.display()
    );
    if progress.damaged_bytes > 0 {
        message.push_str(&format!(
            " ({} damaged)",
            format_size(progress.damaged_bytes)
        ));
    }
    message
}

/// Apply a progress snapshot to a bar
pub fn update_bar(pb: &ProgressBar, progress: &EraseProgress) {
    pb.set_position(progress.position);
    pb.set_message(progress_message(progress));
}
