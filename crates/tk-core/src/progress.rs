//! Live progress of one remux run.
//!
//! The executor owns the only writer; status presenters hold an
//! `Arc<ProgressState>` and read [`ProgressState::snapshot`]. Byte progress is
//! estimated from the fraction of the source duration the remux tool reports
//! as written, so it approximates but never exceeds the source size.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Mutable progress counters for a single run.
#[derive(Debug)]
pub struct ProgressState {
    total_bytes: u64,
    duration_secs: f64,
    processed_bytes: AtomicU64,
    started: Instant,
}

/// Point-in-time view of a [`ProgressState`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSnapshot {
    pub processed_bytes: u64,
    pub total_bytes: u64,
    /// 0.0..=100.0
    pub percent: f64,
    pub speed_bytes_per_sec: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eta: Option<Duration>,
    pub elapsed: Duration,
}

impl ProgressState {
    /// Create a state for a source of `total_bytes` lasting `duration_secs`.
    ///
    /// A non-positive or non-finite duration is treated as 1.0 second.
    pub fn new(total_bytes: u64, duration_secs: f64) -> Self {
        let duration_secs = if duration_secs.is_finite() && duration_secs > 0.0 {
            duration_secs
        } else {
            1.0
        };
        Self {
            total_bytes,
            duration_secs,
            processed_bytes: AtomicU64::new(0),
            started: Instant::now(),
        }
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }

    pub fn processed_bytes(&self) -> u64 {
        self.processed_bytes.load(Ordering::Acquire)
    }

    /// Record that the tool has written output up to `elapsed_us`
    /// microseconds of media time. Returns the processed byte count after
    /// the update; it never decreases.
    pub fn advance_to_elapsed(&self, elapsed_us: i64) -> u64 {
        let fraction = elapsed_us as f64 / (self.duration_secs * 1_000_000.0);
        let fraction = fraction.clamp(0.0, 1.0);
        let estimate = (fraction * self.total_bytes as f64) as u64;
        let previous = self.processed_bytes.fetch_max(estimate, Ordering::AcqRel);
        previous.max(estimate)
    }

    /// Percent, speed, and ETA derived from the current counters.
    pub fn snapshot(&self) -> ProgressSnapshot {
        let processed = self.processed_bytes();
        let elapsed = self.started.elapsed();

        let percent = if self.total_bytes == 0 {
            0.0
        } else {
            processed as f64 / self.total_bytes as f64 * 100.0
        };

        let secs = elapsed.as_secs_f64();
        let speed = if secs > 0.0 { processed as f64 / secs } else { 0.0 };

        let eta = if speed > 0.0 {
            let remaining = self.total_bytes.saturating_sub(processed) as f64;
            Some(Duration::from_secs_f64(remaining / speed))
        } else {
            None
        };

        ProgressSnapshot {
            processed_bytes: processed,
            total_bytes: self.total_bytes,
            percent,
            speed_bytes_per_sec: speed,
            eta,
            elapsed,
        }
    }
}
