//! Polling scheduler
//!
//! One task owns the timer and every piece of mutable state. Each tick runs a
//! short sequential pipeline:
//!
//! fetch (or synthetic fallback) -> stats -> trend -> dispatch -> publish
//!
//! Cycles are awaited by the loop, so two cycles never overlap. Shutdown is
//! checked at both await points and before any mutation; a fetch or send that
//! finishes after shutdown is dropped with its results.

mod state;

pub use state::{DashboardState, FeedMode, SchedulerPhase};

use anyhow::Result;
use rust_decimal::Decimal;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::aggregator::SignalAggregator;
use crate::clock::Clock;
use crate::config::{PollConfig, SyntheticConfig};
use crate::notify::{Alert, DispatchOutcome, NotificationDispatcher, Notifier};
use crate::source::SignalSource;
use crate::synthetic::{SyntheticFeed, SyntheticGenerator};

/// Initial chart seeding
#[derive(Debug, Clone, Copy)]
pub struct ChartSettings {
    pub seed_bars: usize,
    pub seed_price: f64,
    pub max_bars: usize,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            seed_bars: 100,
            seed_price: 1.0850,
            max_bars: 500,
        }
    }
}

impl From<&SyntheticConfig> for ChartSettings {
    fn from(cfg: &SyntheticConfig) -> Self {
        Self {
            seed_bars: cfg.seed_bars,
            seed_price: cfg.seed_price,
            max_bars: cfg.max_bars,
        }
    }
}

/// What one cycle did, for logging
#[derive(Debug, Clone)]
struct CycleReport {
    cycle: u64,
    degraded: bool,
    delta: Option<Decimal>,
    dispatch: Option<DispatchOutcome>,
}

/// Idle poller: components wired, no timer yet
pub struct Poller {
    source: Box<dyn SignalSource>,
    dispatcher: NotificationDispatcher,
    aggregator: SignalAggregator,
    generator: SyntheticGenerator,
    feed: SyntheticFeed,
    clock: Arc<dyn Clock>,
    cycles: u64,
    state_tx: watch::Sender<DashboardState>,
}

impl Poller {
    pub fn new(
        source: Box<dyn SignalSource>,
        notifier: Box<dyn Notifier>,
        clock: Arc<dyn Clock>,
        mut generator: SyntheticGenerator,
        chart: ChartSettings,
    ) -> Self {
        let now_secs = clock.now_ms() / 1000;
        let feed = SyntheticFeed::seeded(
            &mut generator,
            chart.seed_bars,
            chart.seed_price,
            now_secs,
            chart.max_bars,
        );
        let (state_tx, _) = watch::channel(DashboardState {
            chart: feed.bars(),
            ..DashboardState::default()
        });

        Self {
            source,
            dispatcher: NotificationDispatcher::new(notifier, clock.clone()),
            aggregator: SignalAggregator::new(),
            generator,
            feed,
            clock,
            cycles: 0,
            state_tx,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state_tx.subscribe()
    }

    /// Arm the timer and spawn the loop (Idle -> Running)
    pub fn start(self, config: PollConfig) -> PollerHandle {
        let (config_tx, config_rx) = watch::channel(config);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let state_rx = self.state_tx.subscribe();

        let task = tokio::spawn(self.run(config, config_rx, shutdown_rx));

        PollerHandle {
            config_tx,
            shutdown_tx,
            state_rx,
            task,
        }
    }

    async fn run(
        mut self,
        mut config: PollConfig,
        mut config_rx: watch::Receiver<PollConfig>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) {
        let mut generation = 1;
        let mut ticker = arm(config.interval());
        self.state_tx.send_modify(|s| {
            s.phase = SchedulerPhase::Running {
                timer_generation: generation,
            };
            s.config = Some(config);
        });
        info!(
            symbol = %config.instrument,
            source = self.source.name(),
            timeframe = %config.timeframe,
            interval_ms = config.interval_ms,
            cooldown_ms = config.cooldown_ms,
            "⏱️ Poller started"
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown_rx.changed() => break,

                changed = config_rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let next = *config_rx.borrow_and_update();
                    if config.timer_changed(&next) {
                        // Dropping the old Interval cancels it; the new one
                        // waits a full period before its first tick
                        generation += 1;
                        ticker = arm(next.interval());
                        info!(
                            symbol = %next.instrument,
                            timeframe = %next.timeframe,
                            interval_ms = next.interval_ms,
                            timer_generation = generation,
                            "Poll timer re-armed"
                        );
                    } else {
                        debug!(cooldown_ms = next.cooldown_ms, "Cooldown updated");
                    }
                    config = next;
                    self.state_tx.send_modify(|s| {
                        s.phase = SchedulerPhase::Running { timer_generation: generation };
                        s.config = Some(config);
                    });
                }

                _ = ticker.tick() => {
                    match self.cycle(&config, &mut shutdown_rx).await {
                        Some(report) => info!(
                            cycle = report.cycle,
                            degraded = report.degraded,
                            delta = ?report.delta,
                            dispatch = ?report.dispatch,
                            "Poll cycle complete"
                        ),
                        None => break,
                    }
                }
            }
        }

        self.state_tx
            .send_modify(|s| s.phase = SchedulerPhase::Stopped);
        info!(cycles = self.cycles, "Poller stopped");
    }

    /// One tick. Returns None when shutdown was observed mid-cycle; from that
    /// point on nothing is mutated or published.
    async fn cycle(
        &mut self,
        config: &PollConfig,
        shutdown: &mut watch::Receiver<bool>,
    ) -> Option<CycleReport> {
        let fetched = tokio::select! {
            biased;
            _ = shutdown.changed() => return None,
            result = self.source.fetch(config.instrument, config.timeframe) => result,
        };
        if *shutdown.borrow() {
            return None;
        }

        let now_ms = self.clock.now_ms();
        let was_degraded = self.state_tx.borrow().mode.is_degraded();
        let (signal, mode) = match fetched {
            Ok(signal) => {
                if was_degraded {
                    info!(symbol = %config.instrument, "🟢 Signal backend reachable again");
                }
                (signal, FeedMode::Live)
            }
            Err(e) => {
                if !was_degraded {
                    warn!(symbol = %config.instrument, error = %e, "🔴 Degraded mode: using synthetic signals");
                } else {
                    debug!(symbol = %config.instrument, error = %e, "Still degraded");
                }
                let signal = self.generator.signal(config.timeframe);
                self.feed.tick(&mut self.generator, now_ms / 1000);
                (signal, FeedMode::Degraded { reason: e.to_string() })
            }
        };

        let delta = match self.aggregator.observe(&signal) {
            Ok(delta) => delta,
            Err(e) => {
                warn!(error = %e, "Skipping trend update");
                None
            }
        };

        let dispatch = if signal.is_active() {
            let alert = Alert::from_signal(&signal, &config.instrument);
            tokio::select! {
                biased;
                _ = shutdown.changed() => return None,
                outcome = self.dispatcher.dispatch(&alert, config.cooldown()) => Some(outcome),
            }
        } else {
            None
        };

        self.cycles += 1;
        let report = CycleReport {
            cycle: self.cycles,
            degraded: mode.is_degraded(),
            delta,
            dispatch,
        };

        let stats = self.aggregator.stats().clone();
        let trend = self.aggregator.trend().clone();
        let chart = report.degraded.then(|| self.feed.bars());
        self.state_tx.send_modify(|s| {
            s.cycles = report.cycle;
            s.signal = Some(signal);
            s.mode = mode;
            s.stats = stats;
            s.trend = trend;
            if dispatch.is_some() {
                s.last_dispatch = dispatch;
            }
            if let Some(chart) = chart {
                s.chart = chart;
            }
            s.updated_at_ms = Some(now_ms);
        });

        Some(report)
    }
}

fn arm(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Control surface of a running poller
pub struct PollerHandle {
    config_tx: watch::Sender<PollConfig>,
    shutdown_tx: watch::Sender<bool>,
    state_rx: watch::Receiver<DashboardState>,
    task: JoinHandle<()>,
}

impl PollerHandle {
    /// Apply new parameters. Returns false when nothing changed.
    pub fn reconfigure(&self, next: PollConfig) -> Result<bool> {
        next.validate()?;
        Ok(self.config_tx.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        }))
    }

    pub fn config(&self) -> PollConfig {
        *self.config_tx.borrow()
    }

    /// Latest published snapshot
    pub fn state(&self) -> DashboardState {
        self.state_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.state_rx.clone()
    }

    /// Stop the loop and wait for it; no tick fires afterwards
    pub async fn shutdown(self) -> Result<(), JoinError> {
        let _ = self.shutdown_tx.send(true);
        self.task.await
    }
}
