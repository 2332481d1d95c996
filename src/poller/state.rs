//! Snapshot published to the presentation layer after every change

use serde::Serialize;

use crate::aggregator::{RunningStats, TrendState};
use crate::config::PollConfig;
use crate::notify::DispatchOutcome;
use crate::types::{Candle, Signal};

/// Scheduler lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum SchedulerPhase {
    /// Constructed, no timer armed yet
    #[default]
    Idle,
    /// Timer armed; generation counts arms since start (first arm = 1)
    Running { timer_generation: u64 },
    /// Torn down, no further ticks
    Stopped,
}

/// Where the latest signal came from
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub enum FeedMode {
    #[default]
    Live,
    /// Backend unreachable, synthetic data substituted
    Degraded { reason: String },
}

impl FeedMode {
    pub fn is_degraded(&self) -> bool {
        matches!(self, FeedMode::Degraded { .. })
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardState {
    pub phase: SchedulerPhase,
    pub config: Option<PollConfig>,
    /// Completed poll cycles
    pub cycles: u64,
    pub signal: Option<Signal>,
    pub mode: FeedMode,
    pub stats: RunningStats,
    pub trend: TrendState,
    pub last_dispatch: Option<DispatchOutcome>,
    /// Synthetic chart series
    pub chart: Vec<Candle>,
    /// Unix ms of the last completed cycle
    pub updated_at_ms: Option<i64>,
}
