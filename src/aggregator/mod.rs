//! Signal state aggregation
//!
//! Running statistics and price-trend tracking, updated once per poll cycle
//! for fetched and synthetic signals alike.

use rust_decimal::Decimal;
use serde::Serialize;
use std::str::FromStr;

use crate::error::{RelayError, RelayResult};
use crate::types::Signal;

/// Counters since process start
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunningStats {
    /// Signals observed (live + synthetic)
    pub total_signals: u64,
    /// Incremented on every signal. Nothing resolves signals against real
    /// trade outcomes, so this is an optimistic placeholder, not a result.
    pub wins: u64,
    /// wins / total in percent, None before the first signal
    pub win_rate: Option<f64>,
    /// Mean confidence of observed signals, None before the first signal
    pub avg_confidence: Option<f64>,
    #[serde(skip)]
    confidence_sum: u64,
}

impl RunningStats {
    fn record(&mut self, confidence: u8) {
        self.total_signals += 1;
        self.wins += 1;
        self.confidence_sum += u64::from(confidence);

        let total = self.total_signals as f64;
        self.win_rate = Some(self.wins as f64 / total * 100.0);
        self.avg_confidence = Some(self.confidence_sum as f64 / total);
    }
}

/// Direction of the last price move
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TrendDirection {
    Up,
    Down,
    Flat,
}

/// Last observed price and the signed move into it
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TrendState {
    pub previous_price: Option<Decimal>,
    /// current - previous; None until two prices were seen
    pub delta: Option<Decimal>,
}

impl TrendState {
    pub fn direction(&self) -> Option<TrendDirection> {
        self.delta.map(|d| {
            if d > Decimal::ZERO {
                TrendDirection::Up
            } else if d < Decimal::ZERO {
                TrendDirection::Down
            } else {
                TrendDirection::Flat
            }
        })
    }

    fn update(&mut self, raw_price: &str) -> RelayResult<Option<Decimal>> {
        // Numeric JSON prices can arrive in exponent form ("1e-5")
        let trimmed = raw_price.trim();
        let price = Decimal::from_str(trimmed)
            .or_else(|_| Decimal::from_scientific(trimmed))
            .map_err(|_| RelayError::MalformedPrice(raw_price.to_string()))?;

        let delta = self.previous_price.map(|prev| price - prev);
        if delta.is_some() {
            self.delta = delta;
        }
        self.previous_price = Some(price);
        Ok(delta)
    }
}

/// Owns stats and trend; the only writer of either
#[derive(Debug, Default)]
pub struct SignalAggregator {
    stats: RunningStats,
    trend: TrendState,
}

impl SignalAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one signal in: stats first, then trend.
    ///
    /// Returns the new trend delta (None on the first price). A
    /// `MalformedPrice` error leaves the trend untouched; stats are already
    /// updated by then.
    pub fn observe(&mut self, signal: &Signal) -> RelayResult<Option<Decimal>> {
        self.stats.record(signal.confidence);
        self.trend.update(&signal.price)
    }

    pub fn stats(&self) -> &RunningStats {
        &self.stats
    }

    pub fn trend(&self) -> &TrendState {
        &self.trend
    }
}
