//! Notification dispatch
//!
//! Alerts go out through a [`Notifier`] at most once per cooldown window.
//! The window is measured from the dispatch *attempt*: the timestamp is
//! stamped before the send is awaited, so a slow or hung send cannot let a
//! burst through once it resolves. Throttled alerts are dropped, not queued.

mod telegram;

pub use telegram::TelegramNotifier;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::RelayResult;
use crate::types::{Instrument, Signal, Timeframe};

/// Outbound messaging channel
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message. Failures map to `NotificationDelivery`.
    async fn send(&self, text: &str) -> RelayResult<()>;
}

/// Formatted alert payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub direction: String,
    pub symbol: String,
    pub confidence: u8,
    pub price: String,
    pub expire: String,
}

impl Alert {
    pub fn from_signal(signal: &Signal, instrument: &Instrument) -> Self {
        Self {
            direction: signal.direction.to_string(),
            symbol: instrument.symbol(),
            confidence: signal.confidence,
            price: signal.price.clone(),
            expire: signal.expire.clone(),
        }
    }

    /// Placeholder alert used to check the messaging setup
    pub fn test(instrument: &Instrument, timeframe: Timeframe) -> Self {
        Self {
            direction: "TEST".to_string(),
            symbol: instrument.symbol(),
            confidence: 100,
            price: "0".to_string(),
            expire: timeframe.label().to_string(),
        }
    }

    /// Single-line message body
    pub fn text(&self) -> String {
        format!(
            "🚨 Signal: {} {} | Conf: {}% | Price: {} | Exp: {}",
            self.direction, self.symbol, self.confidence, self.price, self.expire
        )
    }
}

/// Result of one dispatch decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DispatchOutcome {
    /// Delivered
    Sent,
    /// Attempted but the notifier failed; the cooldown still applies
    Failed,
    /// Inside the cooldown window, dropped
    Throttled { remaining_ms: i64 },
}

/// Cooldown gate in front of a notifier. Sole owner of the last-sent stamp.
pub struct NotificationDispatcher {
    notifier: Box<dyn Notifier>,
    clock: Arc<dyn Clock>,
    last_sent_ms: Option<i64>,
}

impl NotificationDispatcher {
    pub fn new(notifier: Box<dyn Notifier>, clock: Arc<dyn Clock>) -> Self {
        Self {
            notifier,
            clock,
            last_sent_ms: None,
        }
    }

    /// Time of the last attempt (Unix ms)
    pub fn last_sent_ms(&self) -> Option<i64> {
        self.last_sent_ms
    }

    /// Cooldown check; stamps the attempt time when admitted
    fn admit(&mut self, cooldown: Duration) -> Result<i64, i64> {
        let now = self.clock.now_ms();
        let cooldown_ms = cooldown.as_millis() as i64;
        if let Some(last) = self.last_sent_ms {
            let elapsed = now - last;
            if elapsed < cooldown_ms {
                return Err(cooldown_ms - elapsed);
            }
        }
        self.last_sent_ms = Some(now);
        Ok(now)
    }

    /// Send `alert` unless the previous attempt is younger than `cooldown`.
    /// Delivery errors are logged here and never returned.
    pub async fn dispatch(&mut self, alert: &Alert, cooldown: Duration) -> DispatchOutcome {
        let stamped = match self.admit(cooldown) {
            Ok(now) => now,
            Err(remaining_ms) => {
                debug!(
                    symbol = %alert.symbol,
                    remaining_ms,
                    "Notification throttled by cooldown"
                );
                return DispatchOutcome::Throttled { remaining_ms };
            }
        };

        match self.notifier.send(&alert.text()).await {
            Ok(()) => {
                info!(
                    symbol = %alert.symbol,
                    direction = %alert.direction,
                    confidence = alert.confidence,
                    attempted_at = stamped,
                    "📨 Notification sent"
                );
                DispatchOutcome::Sent
            }
            Err(e) => {
                warn!(symbol = %alert.symbol, error = %e, "Notification failed");
                DispatchOutcome::Failed
            }
        }
    }
}
