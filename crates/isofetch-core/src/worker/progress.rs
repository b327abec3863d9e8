//! Debounced percent tracking for a single transfer.

use std::time::{Duration, Instant};

/// Minimum time between two emissions with the same percent.
pub const EMIT_INTERVAL: Duration = Duration::from_secs(1);

/// Turns byte counts into percent updates worth reporting.
///
/// A percent is emitted when it has advanced by at least one point, or when
/// `EMIT_INTERVAL` has passed since the previous emission. The reported value
/// never goes down and never exceeds 100; it stays 0 when the total is unknown.
#[derive(Debug, Clone)]
pub struct ProgressTracker {
    total: Option<u64>,
    downloaded: u64,
    last_percent: u8,
    last_emit: Instant,
}

impl ProgressTracker {
    /// Starts at 0%, with the initial 0 counted as already emitted.
    pub fn new(total: Option<u64>) -> Self {
        Self::starting_at(total, Instant::now())
    }

    fn starting_at(total: Option<u64>, now: Instant) -> Self {
        Self {
            total: total.filter(|&t| t > 0),
            downloaded: 0,
            last_percent: 0,
            last_emit: now,
        }
    }

    /// Late-arriving total (curl learns it from the first response head).
    pub fn set_total(&mut self, total: Option<u64>) {
        if self.total.is_none() {
            self.total = total.filter(|&t| t > 0);
        }
    }

    pub fn downloaded(&self) -> u64 {
        self.downloaded
    }

    pub fn percent(&self) -> u8 {
        self.last_percent
    }

    /// Record `bytes` more and return the percent to report, if any.
    pub fn advance(&mut self, bytes: u64) -> Option<u8> {
        self.advance_at(bytes, Instant::now())
    }

    fn advance_at(&mut self, bytes: u64, now: Instant) -> Option<u8> {
        self.downloaded = self.downloaded.saturating_add(bytes);
        let percent = self.computed().max(self.last_percent);
        let advanced = percent > self.last_percent;
        let stale = now.saturating_duration_since(self.last_emit) >= EMIT_INTERVAL;
        if !advanced && !stale {
            return None;
        }
        self.last_percent = percent;
        self.last_emit = now;
        Some(percent)
    }

    fn computed(&self) -> u8 {
        match self.total {
            Some(total) => {
                let pct = u128::from(self.downloaded) * 100 / u128::from(total);
                pct.min(100) as u8
            }
            None => 0,
        }
    }
}
