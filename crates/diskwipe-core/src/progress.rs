//! Progress arithmetic and display helpers
//!
//! The engine reports [`EraseProgress`] snapshots as plain data; the
//! formatting helpers here are for front ends that want the traditional
//! `hh:mm:ss` and `123.4 MB` renderings.

use std::time::Duration;

/// Size unit labels, smallest first
const SIZE_UNITS: [&str; 9] = ["B", "KB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];

/// Completion percentage of `position` within `size`, unrounded
///
/// The position is clamped into `0..=size`. A position of zero is exactly
/// 0% and a position equal to the size is exactly 100%, which also makes an
/// empty target report 0%.
pub fn percentage(position: u64, size: u64) -> f64 {
    let position = position.min(size);
    if position == 0 {
        return 0.0;
    }
    if position == size {
        return 100.0;
    }
    position as f64 / size as f64 * 100.0
}

/// Round a percentage to two decimals for display
pub fn round_percentage(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Elapsed time and projected total run time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeEstimate {
    /// Time spent so far, floored to whole seconds
    pub elapsed: Duration,
    /// Projected total time, floored to whole seconds; zero when unknown
    pub total: Duration,
}

impl TimeEstimate {
    /// Render as `elapsed/total` clocks
    pub fn display(&self) -> String {
        format!("{}/{}", format_clock(self.elapsed), format_clock(self.total))
    }
}

/// Project the total run time from the elapsed time and an unrounded percentage
///
/// `total = 100 / percentage * elapsed`, or zero while nothing is done yet.
pub fn time_estimate(elapsed: Duration, percentage: f64) -> TimeEstimate {
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    let total_ms = if percentage > 0.0 {
        100.0 / percentage * elapsed_ms
    } else {
        0.0
    };

    TimeEstimate {
        elapsed: whole_seconds(elapsed_ms),
        total: whole_seconds(total_ms),
    }
}

fn whole_seconds(ms: f64) -> Duration {
    if ms.is_finite() && ms > 0.0 {
        Duration::from_secs((ms / 1000.0).floor() as u64)
    } else {
        Duration::ZERO
    }
}

/// Snapshot of a running erase
#[derive(Debug, Clone, PartialEq)]
pub struct EraseProgress {
    /// Current stream position
    pub position: u64,

    /// Total bytes to erase
    pub total_bytes: u64,

    /// Offset the run started from (non-zero when resumed)
    pub start_offset: u64,

    /// Completion percentage rounded to two decimals
    pub percentage: f64,

    /// Elapsed time and projected total
    pub estimate: TimeEstimate,

    /// Bytes that could not be written so far
    pub damaged_bytes: u64,
}

impl EraseProgress {
    /// Build a snapshot; the estimate uses the unrounded percentage
    pub fn new(
        position: u64,
        total_bytes: u64,
        start_offset: u64,
        elapsed: Duration,
        damaged_bytes: u64,
    ) -> Self {
        let exact = percentage(position, total_bytes);
        Self {
            position,
            total_bytes,
            start_offset,
            percentage: round_percentage(exact),
            estimate: time_estimate(elapsed, exact),
            damaged_bytes,
        }
    }

    /// Bytes still to be written
    pub fn remaining(&self) -> u64 {
        self.total_bytes.saturating_sub(self.position)
    }

    /// Whether the position has reached the end of the target
    pub fn is_complete(&self) -> bool {
        self.position >= self.total_bytes
    }

    /// Percentage with two decimals, e.g. `42.50%`
    pub fn percentage_display(&self) -> String {
        format!("{:.2}%", self.percentage)
    }
}

/// Format a byte count using binary units and four significant digits
///
/// Produces `1000 B`, `1.5 KB`, `123.5 MB`, `1 GB`.
pub fn format_size(bytes: u64) -> String {
    let mut value = bytes as f64;
    let mut index = 0;
    while value >= 1024.0 && index < SIZE_UNITS.len() - 1 {
        value /= 1024.0;
        index += 1;
    }

    let integer_digits = (value.floor() as u64).to_string().len();
    let decimals = 4usize.saturating_sub(integer_digits);
    let factor = 10f64.powi(decimals as i32);
    let rounded = (value * factor).round() / factor;

    format!("{} {}", rounded, SIZE_UNITS[index])
}

/// Format a duration as `hh:mm:ss`, with a `d.` day prefix when needed
pub fn format_clock(duration: Duration) -> String {
    let total = duration.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let seconds = total % 60;

    if days > 0 {
        format!("{}.{:02}:{:02}:{:02}", days, hours, minutes, seconds)
    } else {
        format!("{:02}:{:02}:{:02}", hours, minutes, seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- percentage tests ----

    #[test]
    fn test_percentage_endpoints() {
        assert_eq!(percentage(0, 1000), 0.0);
        assert_eq!(percentage(1000, 1000), 100.0);
        assert_eq!(percentage(500, 1000), 50.0);
    }

    #[test]
    fn test_percentage_clamps_overshoot() {
        assert_eq!(percentage(5000, 1000), 100.0);
    }

    #[test]
    fn test_percentage_empty_target() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(10, 0), 0.0);
    }

    #[test]
    fn test_percentage_monotonic() {
        let sizes = [1u64, 7, 512, 2_500_000, 1_000_000_007, u64::MAX];
        for size in sizes {
            let step = (size / 997).max(1);
            let mut last = 0.0;
            let mut position = 0u64;
            while position <= size {
                let p = percentage(position, size);
                assert!(p >= last, "percentage dropped at {position}/{size}");
                last = p;
                match position.checked_add(step) {
                    Some(next) => position = next,
                    None => break,
                }
            }
            assert_eq!(percentage(size, size), 100.0);
        }
    }

    #[test]
    fn test_round_percentage() {
        assert_eq!(round_percentage(33.333_333), 33.33);
        assert_eq!(round_percentage(66.666_666), 66.67);
        assert_eq!(round_percentage(100.0), 100.0);
    }

    // ---- time estimate tests ----

    #[test]
    fn test_time_estimate_zero_percentage() {
        let estimate = time_estimate(Duration::from_millis(4_500), 0.0);
        assert_eq!(estimate.elapsed, Duration::from_secs(4));
        assert_eq!(estimate.total, Duration::ZERO);
    }

    #[test]
    fn test_time_estimate_projection() {
        // 25% done after 10 seconds means 40 seconds in total
        let estimate = time_estimate(Duration::from_secs(10), 25.0);
        assert_eq!(estimate.elapsed, Duration::from_secs(10));
        assert_eq!(estimate.total, Duration::from_secs(40));
    }

    #[test]
    fn test_time_estimate_floors() {
        let estimate = time_estimate(Duration::from_millis(1_999), 30.0);
        assert_eq!(estimate.elapsed, Duration::from_secs(1));
        // 100 / 30 * 1999 ms = 6663.33 ms
        assert_eq!(estimate.total, Duration::from_secs(6));
    }

    #[test]
    fn test_time_estimate_display() {
        let estimate = time_estimate(Duration::from_secs(65), 50.0);
        assert_eq!(estimate.display(), "00:01:05/00:02:10");
    }

    // ---- progress snapshot tests ----

    #[test]
    fn test_erase_progress_rounding() {
        let progress = EraseProgress::new(2, 3, 0, Duration::from_secs(200), 0);
        assert_eq!(progress.percentage, 66.67);
        // 66.67% would project 299s; the exact two thirds gives 300s
        assert_eq!(progress.estimate.total, Duration::from_secs(300));
        assert_eq!(progress.remaining(), 1);
        assert!(!progress.is_complete());
        assert_eq!(progress.percentage_display(), "66.67%");
    }

    // ---- format tests ----

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1000), "1000 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1024), "1 KB");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(2_500_000), "2.384 MB");
        assert_eq!(format_size(16 * 1024 * 1024 * 1024), "16 GB");
    }

    #[test]
    fn test_format_size_significant_digits() {
        // 123.456 MB keeps one decimal
        assert_eq!(format_size(129_453_818), "123.5 MB");
        // 12.3456 GB keeps two decimals
        assert_eq!(format_size(13_255_955_529), "12.35 GB");
    }

    #[test]
    fn test_format_size_largest_unit() {
        assert!(format_size(u64::MAX).ends_with(" EB"));
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(Duration::ZERO), "00:00:00");
        assert_eq!(format_clock(Duration::from_secs(59)), "00:00:59");
        assert_eq!(format_clock(Duration::from_secs(3661)), "01:01:01");
        assert_eq!(format_clock(Duration::from_secs(90_061)), "1.01:01:01");
    }
}
