//! Scheduler tests on a paused tokio clock

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use signal_relay::clock::Clock;
    use signal_relay::config::PollConfig;
    use signal_relay::error::{RelayError, RelayResult};
    use signal_relay::notify::{DispatchOutcome, Notifier};
    use signal_relay::poller::{ChartSettings, Poller, PollerHandle, SchedulerPhase};
    use signal_relay::source::SignalSource;
    use signal_relay::synthetic::SyntheticGenerator;
    use signal_relay::types::{
        Asset, Direction, Instrument, Signal, SignalStatus, Timeframe,
    };
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::time::{sleep, Instant};

    // ============================================================================
    // Fakes
    // ============================================================================

    /// Follows tokio's (paused) clock
    struct TokioClock {
        start: Instant,
    }

    impl Clock for TokioClock {
        fn now_ms(&self) -> i64 {
            1_700_000_000_000 + self.start.elapsed().as_millis() as i64
        }
    }

    #[derive(Clone)]
    enum Step {
        Ok(Signal),
        Fail,
        Delayed(Duration, Signal),
    }

    struct ScriptedSource {
        calls: Arc<AtomicUsize>,
        script: Mutex<VecDeque<Step>>,
        fallback: Step,
    }

    #[async_trait]
    impl SignalSource for ScriptedSource {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn fetch(&self, _: Instrument, _: Timeframe) -> RelayResult<Signal> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let step = self
                .script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone());
            match step {
                Step::Ok(signal) => Ok(signal),
                Step::Fail => Err(RelayError::SourceUnavailable("connection refused".into())),
                Step::Delayed(delay, signal) => {
                    sleep(delay).await;
                    Ok(signal)
                }
            }
        }
    }

    /// Records every send attempt; optionally rejects all of them
    #[derive(Clone, Default)]
    struct RecordingNotifier {
        sent: Arc<Mutex<Vec<String>>>,
        reject: bool,
    }

    impl RecordingNotifier {
        fn rejecting() -> Self {
            Self {
                reject: true,
                ..Self::default()
            }
        }

        fn count(&self) -> usize {
            self.sent.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        async fn send(&self, text: &str) -> RelayResult<()> {
            self.sent.lock().unwrap().push(text.to_string());
            if self.reject {
                return Err(RelayError::NotificationDelivery("HTTP 502 Bad Gateway".into()));
            }
            Ok(())
        }
    }

    struct Harness {
        handle: PollerHandle,
        calls: Arc<AtomicUsize>,
        notifier: RecordingNotifier,
    }

    fn signal(status: SignalStatus, price: &str) -> Signal {
        Signal {
            status,
            direction: Direction::Put,
            confidence: 77,
            price: price.to_string(),
            expire: "1m".to_string(),
            technical: None,
            extra: serde_json::Map::new(),
        }
    }

    fn config(interval_ms: u64, cooldown_ms: u64) -> PollConfig {
        PollConfig {
            instrument: Instrument::new(Asset::EURUSD, false),
            timeframe: Timeframe::Min1,
            interval_ms,
            cooldown_ms,
        }
    }

    fn start(script: Vec<Step>, fallback: Step, cfg: PollConfig) -> Harness {
        start_with(script, fallback, cfg, RecordingNotifier::default())
    }

    fn start_with(
        script: Vec<Step>,
        fallback: Step,
        cfg: PollConfig,
        notifier: RecordingNotifier,
    ) -> Harness {
        let calls = Arc::new(AtomicUsize::new(0));
        let source = ScriptedSource {
            calls: calls.clone(),
            script: Mutex::new(script.into()),
            fallback,
        };
        let poller = Poller::new(
            Box::new(source),
            Box::new(notifier.clone()),
            Arc::new(TokioClock {
                start: Instant::now(),
            }),
            SyntheticGenerator::with_seed(42),
            ChartSettings::default(),
        );
        Harness {
            handle: poller.start(cfg),
            calls,
            notifier,
        }
    }

    fn calls(h: &Harness) -> usize {
        h.calls.load(Ordering::SeqCst)
    }

    // ============================================================================
    // End-to-end scenarios
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_degraded_mode_respects_cooldown() {
        let h = start(vec![], Step::Fail, config(30_000, 60_000));

        // First tick one interval after start: fallback signal, alert sent
        sleep(Duration::from_secs(31)).await;
        assert_eq!(calls(&h), 1);
        assert_eq!(h.notifier.count(), 1);
        let state = h.handle.state();
        assert!(state.mode.is_degraded());
        assert!(state.signal.as_ref().unwrap().is_active());
        assert_eq!(state.last_dispatch, Some(DispatchOutcome::Sent));
        assert_eq!(state.chart.len(), 101);

        // 30s later: still degraded, inside the cooldown
        sleep(Duration::from_secs(30)).await;
        assert_eq!(calls(&h), 2);
        assert_eq!(h.notifier.count(), 1);
        assert!(matches!(
            h.handle.state().last_dispatch,
            Some(DispatchOutcome::Throttled { .. })
        ));

        // A full cooldown after the first send: alert goes out again
        sleep(Duration::from_secs(30)).await;
        assert_eq!(calls(&h), 3);
        assert_eq!(h.notifier.count(), 2);

        let state = h.handle.state();
        assert_eq!(state.cycles, 3);
        assert_eq!(state.stats.total_signals, 3);
        assert_eq!(state.chart.len(), 103);
        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_inactive_signals_update_state_without_alerts() {
        let h = start(
            vec![
                Step::Ok(signal(SignalStatus::Inactive, "1.08500")),
                Step::Ok(signal(SignalStatus::Inactive, "1.08520")),
                Step::Ok(signal(SignalStatus::Inactive, "1.08490")),
            ],
            Step::Fail,
            config(30_000, 60_000),
        );

        sleep(Duration::from_secs(91)).await;
        assert_eq!(calls(&h), 3);
        assert_eq!(h.notifier.count(), 0);

        let state = h.handle.state();
        assert_eq!(state.stats.total_signals, 3);
        assert_eq!(state.trend.delta, Some(dec!(-0.00030)));
        assert_eq!(state.last_dispatch, None);
        assert!(!state.mode.is_degraded());
        // Live cycles never extend the synthetic chart
        assert_eq!(state.chart.len(), 100);
        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_recovers_from_degraded_mode() {
        let h = start(
            vec![Step::Fail, Step::Ok(signal(SignalStatus::Active, "1.09"))],
            Step::Fail,
            config(30_000, 60_000),
        );

        sleep(Duration::from_secs(31)).await;
        assert!(h.handle.state().mode.is_degraded());

        sleep(Duration::from_secs(30)).await;
        let state = h.handle.state();
        assert!(!state.mode.is_degraded());
        assert_eq!(state.signal.unwrap().price, "1.09");
        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_delivery_failures_do_not_stall_the_loop() {
        let h = start_with(
            vec![
                Step::Ok(signal(SignalStatus::Active, "1.08500")),
                Step::Ok(signal(SignalStatus::Active, "1.08520")),
                Step::Ok(signal(SignalStatus::Active, "1.08490")),
            ],
            Step::Ok(signal(SignalStatus::Inactive, "1.08480")),
            config(30_000, 60_000),
            RecordingNotifier::rejecting(),
        );

        // 30s: send attempted and rejected; signal and stats still published
        sleep(Duration::from_secs(31)).await;
        let state = h.handle.state();
        assert_eq!(h.notifier.count(), 1);
        assert_eq!(state.last_dispatch, Some(DispatchOutcome::Failed));
        assert_eq!(state.signal.unwrap().price, "1.08500");
        assert_eq!(state.stats.total_signals, 1);
        assert_eq!(state.trend.delta, None);

        // 60s: the failed attempt still holds the cooldown window
        sleep(Duration::from_secs(30)).await;
        let state = h.handle.state();
        assert_eq!(h.notifier.count(), 1);
        assert!(matches!(
            state.last_dispatch,
            Some(DispatchOutcome::Throttled { .. })
        ));
        assert_eq!(state.stats.total_signals, 2);
        assert_eq!(state.trend.delta, Some(dec!(0.00020)));

        // 90s: window elapsed, next attempt fails too
        sleep(Duration::from_secs(30)).await;
        let state = h.handle.state();
        assert_eq!(h.notifier.count(), 2);
        assert_eq!(state.last_dispatch, Some(DispatchOutcome::Failed));
        assert_eq!(state.signal.unwrap().price, "1.08490");
        assert_eq!(state.stats.total_signals, 3);
        assert_eq!(state.trend.delta, Some(dec!(-0.00030)));

        // 120s: still polling
        sleep(Duration::from_secs(30)).await;
        assert_eq!(calls(&h), 4);
        let state = h.handle.state();
        assert_eq!(state.cycles, 4);
        assert_eq!(state.phase, SchedulerPhase::Running { timer_generation: 1 });
        assert!(!state.mode.is_degraded());
        h.handle.shutdown().await.unwrap();
    }

    // ============================================================================
    // Timer management
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_interval_change_rearms_once_without_double_fetch() {
        let live = Step::Ok(signal(SignalStatus::Inactive, "1.1"));
        let h = start(vec![], live, config(30_000, 60_000));

        sleep(Duration::from_secs(1)).await;
        assert_eq!(
            h.handle.state().phase,
            SchedulerPhase::Running { timer_generation: 1 }
        );

        sleep(Duration::from_secs(44)).await;
        assert_eq!(calls(&h), 1);

        assert!(h.handle.reconfigure(config(60_000, 60_000)).unwrap());
        sleep(Duration::from_secs(1)).await;
        assert_eq!(
            h.handle.state().phase,
            SchedulerPhase::Running { timer_generation: 2 }
        );
        // No fetch at the moment of change, none on the old 30s grid
        assert_eq!(calls(&h), 1);

        // t = 100s: new timer armed at 45s has not fired yet
        sleep(Duration::from_secs(54)).await;
        assert_eq!(calls(&h), 1);

        // t = 106s: first tick of the new timer (45s + 60s)
        sleep(Duration::from_secs(6)).await;
        assert_eq!(calls(&h), 2);
        assert_eq!(
            h.handle.state().phase,
            SchedulerPhase::Running { timer_generation: 2 }
        );
        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldown_change_keeps_timer() {
        let live = Step::Ok(signal(SignalStatus::Inactive, "1.1"));
        let h = start(vec![], live, config(30_000, 60_000));

        sleep(Duration::from_secs(45)).await;
        assert!(h.handle.reconfigure(config(30_000, 180_000)).unwrap());

        sleep(Duration::from_secs(16)).await;
        assert_eq!(calls(&h), 2);

        let state = h.handle.state();
        assert_eq!(state.phase, SchedulerPhase::Running { timer_generation: 1 });
        assert_eq!(state.config.unwrap().cooldown_ms, 180_000);
        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_asset_change_rearms() {
        let live = Step::Ok(signal(SignalStatus::Inactive, "1.1"));
        let h = start(vec![], live, config(30_000, 60_000));

        sleep(Duration::from_secs(10)).await;
        let otc = PollConfig {
            instrument: Instrument::new(Asset::NZDUSD, true),
            ..config(30_000, 60_000)
        };
        assert!(h.handle.reconfigure(otc).unwrap());

        // Old deadline (30s) passes without a fetch; new one is 10s + 30s
        sleep(Duration::from_secs(25)).await;
        assert_eq!(calls(&h), 0);
        sleep(Duration::from_secs(6)).await;
        assert_eq!(calls(&h), 1);
        assert_eq!(h.handle.config().instrument.symbol(), "NZDUSD-OTC");
        h.handle.shutdown().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconfigure_validation() {
        let h = start(vec![], Step::Fail, config(30_000, 60_000));

        assert!(!h.handle.reconfigure(config(30_000, 60_000)).unwrap());
        assert!(h.handle.reconfigure(config(45_000, 60_000)).is_err());
        assert_eq!(h.handle.config().interval_ms, 30_000);
        h.handle.shutdown().await.unwrap();
    }

    // ============================================================================
    // Teardown
    // ============================================================================

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_all_ticks() {
        let h = start(vec![], Step::Fail, config(30_000, 60_000));

        sleep(Duration::from_secs(31)).await;
        assert_eq!(calls(&h), 1);

        let state_rx = h.handle.subscribe();
        h.handle.shutdown().await.unwrap();
        assert_eq!(state_rx.borrow().phase, SchedulerPhase::Stopped);

        sleep(Duration::from_secs(600)).await;
        assert_eq!(h.calls.load(Ordering::SeqCst), 1);
        assert_eq!(h.notifier.count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_completing_after_shutdown_is_ignored() {
        let slow = Step::Delayed(
            Duration::from_secs(20),
            signal(SignalStatus::Active, "1.2"),
        );
        let h = start(vec![slow], Step::Fail, config(30_000, 60_000));

        // Fetch starts at 30s and would finish at 50s
        sleep(Duration::from_secs(35)).await;
        assert_eq!(calls(&h), 1);

        let state_rx = h.handle.subscribe();
        h.handle.shutdown().await.unwrap();
        sleep(Duration::from_secs(60)).await;

        let state = state_rx.borrow().clone();
        assert_eq!(state.phase, SchedulerPhase::Stopped);
        assert_eq!(state.cycles, 0);
        assert_eq!(state.stats.total_signals, 0);
        assert!(state.signal.is_none());
        assert_eq!(h.notifier.count(), 0);
    }
}
