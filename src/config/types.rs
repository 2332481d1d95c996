//! Runtime polling parameters and the option sets the dashboard exposes

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::types::{Instrument, Timeframe};

/// Poll intervals offered by the dashboard (ms)
pub const POLL_INTERVALS_MS: [u64; 4] = [30_000, 60_000, 120_000, 180_000];

/// Notification cooldowns offered by the dashboard (ms)
pub const NOTIFY_COOLDOWNS_MS: [u64; 3] = [60_000, 120_000, 180_000];

/// Everything that parameterizes one polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollConfig {
    pub instrument: Instrument,
    pub timeframe: Timeframe,
    pub interval_ms: u64,
    pub cooldown_ms: u64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            instrument: Instrument::default(),
            timeframe: Timeframe::default(),
            interval_ms: 30_000,
            cooldown_ms: 60_000,
        }
    }
}

impl PollConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }

    /// Reject values outside the enumerated option sets
    pub fn validate(&self) -> Result<()> {
        if !POLL_INTERVALS_MS.contains(&self.interval_ms) {
            bail!(
                "poll interval {}ms is not one of {:?}",
                self.interval_ms,
                POLL_INTERVALS_MS
            );
        }
        if !NOTIFY_COOLDOWNS_MS.contains(&self.cooldown_ms) {
            bail!(
                "notification cooldown {}ms is not one of {:?}",
                self.cooldown_ms,
                NOTIFY_COOLDOWNS_MS
            );
        }
        Ok(())
    }

    /// True when switching to `other` requires a new timer.
    /// Cooldown is read per dispatch and does not count.
    pub fn timer_changed(&self, other: &PollConfig) -> bool {
        self.instrument != other.instrument
            || self.timeframe != other.timeframe
            || self.interval_ms != other.interval_ms
    }
}
