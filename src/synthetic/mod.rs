//! Synthetic data for degraded mode
//!
//! When the backend is unreachable the poller substitutes a plausible signal
//! from [`SyntheticGenerator`] and extends the chart through [`SyntheticFeed`].
//! Nothing here performs I/O.

mod feed;

pub use feed::SyntheticFeed;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::types::{Candle, Direction, Signal, SignalStatus, Technical, Timeframe};

/// Spacing between seeded bars
pub const BAR_SPACING_SECS: i64 = 60;

/// Max absolute open-to-close move of a synthetic bar
const MAX_BODY_MOVE: f64 = 0.0004;
/// Max wick extension beyond the body
const MAX_WICK: f64 = 0.0003;

/// Fallback signal price band [low, low + width)
const PRICE_LOW: f64 = 1.085;
const PRICE_WIDTH: f64 = 0.001;

/// Random generator for fallback signals and OHLC bars
pub struct SyntheticGenerator {
    rng: StdRng,
}

impl Default for SyntheticGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic generator for tests and replays
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Fallback signal: always active, confidence 80-90, price near 1.0855
    pub fn signal(&mut self, timeframe: Timeframe) -> Signal {
        let direction = if self.rng.gen_bool(0.5) {
            Direction::Call
        } else {
            Direction::Put
        };
        let confidence = self.rng.gen_range(80..=90u8);
        let price = PRICE_LOW + self.rng.gen::<f64>() * PRICE_WIDTH;
        let rsi = self.rng.gen_range(30..=70u32);

        Signal {
            status: SignalStatus::Active,
            direction,
            confidence,
            price: format!("{:.5}", price),
            expire: timeframe.label().to_string(),
            technical: Some(Technical {
                rsi: Some(rsi.into()),
                macd: Some(serde_json::json!(0.0001)),
                pattern: Some("Hammer".into()),
                extra: serde_json::Map::new(),
            }),
            extra: serde_json::Map::new(),
        }
    }

    /// `count` chained bars 60s apart, the last one a minute before `now_secs`
    pub fn candles(&mut self, count: usize, start_price: f64, now_secs: i64) -> Vec<Candle> {
        let mut bars = Vec::with_capacity(count);
        let mut price = start_price;
        for i in 0..count {
            let time = now_secs - (count - i) as i64 * BAR_SPACING_SECS;
            let bar = self.bar(time, price);
            price = bar.close;
            bars.push(bar);
        }
        bars
    }

    /// One bar opening at `open`
    pub fn bar(&mut self, time: i64, open: f64) -> Candle {
        let change = (self.rng.gen::<f64>() - 0.5) * 2.0 * MAX_BODY_MOVE;
        let close = open + change;
        let high = open.max(close) + self.rng.gen::<f64>() * MAX_WICK;
        let low = open.min(close) - self.rng.gen::<f64>() * MAX_WICK;
        Candle {
            time,
            open,
            high,
            low,
            close,
        }
    }
}
