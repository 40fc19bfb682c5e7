//! Scan progress reporting.

use std::fmt;
use std::time::{Duration, Instant};

use humansize::{DECIMAL, format_size};
use serde::{Deserialize, Serialize};

/// Seconds after which elapsed time is reported in minutes.
const MINUTES_AFTER_SECS: f64 = 300.0;
/// File rate below which throughput is reported per minute.
const PER_MINUTE_BELOW: f64 = 5.0;

/// Progress information during a scan.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanProgress {
    /// Bytes actually fed to the hasher so far.
    pub bytes_read: u64,
    /// Sum of the sizes of all admitted files so far.
    pub bytes_total: u64,
    /// Non-directory entries seen so far.
    pub files_seen: u64,
    /// Directories visited so far, the root included.
    pub dirs_seen: u64,
    /// Time elapsed since the scan started.
    pub elapsed: Duration,
}

impl ScanProgress {
    /// Files per second.
    pub fn files_per_second(&self) -> f64 {
        rate(self.files_seen as f64, self.elapsed)
    }

    /// Bytes read per second.
    pub fn bytes_per_second(&self) -> f64 {
        rate(self.bytes_read as f64, self.elapsed)
    }

    /// Bytes tiering avoided reading.
    pub fn bytes_skipped(&self) -> u64 {
        self.bytes_total.saturating_sub(self.bytes_read)
    }
}

impl fmt::Display for ScanProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.elapsed.as_secs_f64();
        let (duration, time_unit) = if secs > MINUTES_AFTER_SECS {
            (secs / 60.0, "minutes")
        } else {
            (secs, "seconds")
        };

        let per_second = self.files_per_second();
        let (file_rate, rate_unit) = if per_second < PER_MINUTE_BELOW {
            (per_second * 60.0, "minute")
        } else {
            (per_second, "second")
        };

        write!(
            f,
            "{} of {} read from disk across {} directories & {} files in {:.2} {} at {}/s, or {:.0} files per {}",
            format_size(self.bytes_read, DECIMAL),
            format_size(self.bytes_total, DECIMAL),
            self.dirs_seen,
            self.files_seen,
            duration,
            time_unit,
            format_size(self.bytes_per_second() as u64, DECIMAL),
            file_rate,
            rate_unit,
        )
    }
}

fn rate(amount: f64, elapsed: Duration) -> f64 {
    let secs = elapsed.as_secs_f64();
    if secs > 0.0 { amount / secs } else { 0.0 }
}

/// Counters for a completed scan.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Non-directory entries seen, skipped ones included.
    pub files_seen: u64,
    /// Directories visited, the root included.
    pub dirs_seen: u64,
    /// Files that made it into the tree.
    pub files_fingerprinted: u64,
    /// Sum of sizes of fingerprinted files.
    pub bytes_total: u64,
    /// Bytes fed to the hasher.
    pub bytes_read: u64,
    pub symlinks_skipped: u64,
    /// Files skipped by an extension rule.
    pub files_excluded: u64,
    /// Directories pruned by a path rule.
    pub dirs_excluded: u64,
}

impl ScanStats {
    pub fn progress(&self, elapsed: Duration) -> ScanProgress {
        ScanProgress {
            bytes_read: self.bytes_read,
            bytes_total: self.bytes_total,
            files_seen: self.files_seen,
            dirs_seen: self.dirs_seen,
            elapsed,
        }
    }
}

/// Decides when the next progress report is due.
#[derive(Debug)]
pub(crate) struct ProgressTracker {
    start_time: Instant,
    interval: Duration,
    interval_files: u64,
    last_report: Instant,
    last_files_seen: u64,
}

impl ProgressTracker {
    pub fn new(interval: Duration, interval_files: u64) -> Self {
        let now = Instant::now();
        Self {
            start_time: now,
            interval,
            interval_files,
            last_report: now,
            last_files_seen: 0,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// Whether enough time or enough files have passed since the last report.
    pub fn due(&self, now: Instant, files_seen: u64) -> bool {
        now.duration_since(self.last_report) > self.interval
            || files_seen.saturating_sub(self.last_files_seen) > self.interval_files
    }

    pub fn mark(&mut self, now: Instant, files_seen: u64) {
        self.last_report = now;
        self.last_files_seen = files_seen;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rates_with_zero_elapsed() {
        let progress = ScanProgress {
            files_seen: 10,
            bytes_read: 100,
            ..Default::default()
        };
        assert_eq!(progress.files_per_second(), 0.0);
        assert_eq!(progress.bytes_per_second(), 0.0);
    }

    #[test]
    fn test_display_switches_units() {
        let slow = ScanProgress {
            bytes_read: 2_000_000,
            bytes_total: 5_000_000,
            files_seen: 60,
            dirs_seen: 3,
            elapsed: Duration::from_secs(600),
        };
        let line = slow.to_string();
        assert!(line.contains("10.00 minutes"), "{line}");
        assert!(line.contains("6 files per minute"), "{line}");
        assert!(line.contains("3 directories & 60 files"), "{line}");
        let read_of_total = format!(
            "{} of {} read from disk",
            format_size(2_000_000u64, DECIMAL),
            format_size(5_000_000u64, DECIMAL)
        );
        assert!(line.starts_with(&read_of_total), "{line}");
        assert_eq!(slow.bytes_skipped(), 3_000_000);

        let fast = ScanProgress {
            files_seen: 1000,
            elapsed: Duration::from_secs(10),
            ..Default::default()
        };
        let line = fast.to_string();
        assert!(line.contains("10.00 seconds"), "{line}");
        assert!(line.contains("100 files per second"), "{line}");
    }

    #[test]
    fn test_tracker_due_on_file_count() {
        let mut tracker = ProgressTracker::new(Duration::from_secs(3600), 10);
        let now = Instant::now();
        assert!(!tracker.due(now, 10));
        assert!(tracker.due(now, 11));
        tracker.mark(now, 11);
        assert!(!tracker.due(now, 21));
        assert!(tracker.due(now, 22));
    }

    #[test]
    fn test_tracker_due_on_time() {
        let tracker = ProgressTracker::new(Duration::from_millis(10), u64::MAX);
        let later = Instant::now() + Duration::from_millis(50);
        assert!(tracker.due(later, 0));
    }
}
