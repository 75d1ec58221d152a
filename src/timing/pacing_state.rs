use std::time::Duration;

use super::{DEFAULT_FREQUENCY, MIN_INTERVAL_MS};

/// The target frequency and the nominal interval derived from it.
///
/// The interval starts out as `1000 / frequency` but is also adjusted by the
/// timer loop when a tick overruns, so it is not always derivable from the
/// frequency alone.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub(super) struct PacingState {
    frequency: u32,
    interval_ms: u64,
}

impl Default for PacingState {
    fn default() -> Self {
        Self::new(DEFAULT_FREQUENCY)
    }
}

impl PacingState {
    /// Create pacing state for the given frequency. A zero frequency falls
    /// back to the default.
    pub fn new(frequency: u32) -> Self {
        let frequency = if frequency == 0 {
            DEFAULT_FREQUENCY
        } else {
            frequency
        };
        Self {
            frequency,
            interval_ms: interval_for(frequency),
        }
    }

    pub fn frequency(&self) -> u32 {
        self.frequency
    }

    pub fn interval_ms(&self) -> u64 {
        self.interval_ms
    }

    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    /// Set a new frequency and recompute the nominal interval.
    ///
    /// Returns false, leaving everything untouched, when the frequency is not
    /// positive or matches the current one.
    pub fn configure(&mut self, frequency: i32) -> bool {
        if frequency <= 0 || frequency as u32 == self.frequency {
            return false;
        }
        self.frequency = frequency as u32;
        self.interval_ms = interval_for(self.frequency);
        true
    }

    /// Shrink the nominal interval by however much `work` overran it.
    ///
    /// Only whole milliseconds count toward the overrun. The result never
    /// drops below [`MIN_INTERVAL_MS`]. Returns the overrun that was
    /// subtracted, if any.
    pub fn apply_overrun(&mut self, work: Duration) -> Option<u64> {
        let work_ms = work.as_millis() as u64;
        if work_ms <= self.interval_ms {
            return None;
        }
        let overrun = work_ms - self.interval_ms;
        self.interval_ms = self
            .interval_ms
            .saturating_sub(overrun)
            .max(MIN_INTERVAL_MS);
        Some(overrun)
    }

    /// Time left to sleep in this iteration once `work` has been spent.
    pub fn remaining_after(&self, work: Duration) -> Option<Duration> {
        self.interval()
            .checked_sub(work)
            .filter(|remaining| !remaining.is_zero())
    }
}

fn interval_for(frequency: u32) -> u64 {
    (1000 / u64::from(frequency)).max(MIN_INTERVAL_MS)
}
