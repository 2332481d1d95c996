//! Synthetic chart series
//!
//! Seeded once at startup and extended by one bar per degraded cycle. Live
//! cycles never touch it, so fetched and synthetic data are never mixed.

use std::collections::VecDeque;

use super::SyntheticGenerator;
use crate::types::Candle;

pub struct SyntheticFeed {
    bars: VecDeque<Candle>,
    /// Maximum bars to keep
    max_bars: usize,
}

impl SyntheticFeed {
    /// Seed `count` bars starting at `start_price`
    pub fn seeded(
        generator: &mut SyntheticGenerator,
        count: usize,
        start_price: f64,
        now_secs: i64,
        max_bars: usize,
    ) -> Self {
        let mut feed = Self {
            bars: generator.candles(count, start_price, now_secs).into(),
            max_bars: max_bars.max(1),
        };
        feed.trim();
        feed
    }

    /// Append the next synthetic bar, continuing from the last close
    pub fn tick(&mut self, generator: &mut SyntheticGenerator, now_secs: i64) -> Candle {
        let bar = match self.bars.back() {
            // Bar times must stay strictly increasing for chart consumers
            Some(last) => generator.bar(now_secs.max(last.time + 1), last.close),
            None => generator.bar(now_secs, 0.0),
        };
        self.bars.push_back(bar);
        self.trim();
        bar
    }

    pub fn last(&self) -> Option<&Candle> {
        self.bars.back()
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Bars in chronological order
    pub fn bars(&self) -> Vec<Candle> {
        self.bars.iter().copied().collect()
    }

    fn trim(&mut self) {
        while self.bars.len() > self.max_bars {
            self.bars.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_continues_from_last_close() {
        let mut generator = SyntheticGenerator::with_seed(5);
        let mut feed = SyntheticFeed::seeded(&mut generator, 100, 1.0850, 1_000_000, 500);
        assert_eq!(feed.len(), 100);

        let last = *feed.last().unwrap();
        let bar = feed.tick(&mut generator, 1_000_030);
        assert_eq!(bar.open, last.close);
        assert_eq!(bar.time, 1_000_030);
        assert_eq!(feed.len(), 101);
    }

    #[test]
    fn test_tick_keeps_times_increasing() {
        let mut generator = SyntheticGenerator::with_seed(5);
        let mut feed = SyntheticFeed::seeded(&mut generator, 3, 1.0, 1_000, 10);
        let last_time = feed.last().unwrap().time;

        let bar = feed.tick(&mut generator, 0);
        assert_eq!(bar.time, last_time + 1);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut generator = SyntheticGenerator::with_seed(5);
        let mut feed = SyntheticFeed::seeded(&mut generator, 10, 1.0, 1_000, 12);
        for i in 0..5 {
            feed.tick(&mut generator, 2_000 + i * 30);
        }
        assert_eq!(feed.len(), 12);

        let bars = feed.bars();
        for pair in bars.windows(2) {
            assert_eq!(pair[1].open, pair[0].close);
        }
    }
}
