//! Error types for the polling loop.
//!
//! None of these are fatal: each one has a local recovery in the poller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RelayError {
    /// Fetch failed (network, non-2xx status or malformed body).
    #[error("Signal source unavailable: {0}")]
    SourceUnavailable(String),

    /// Messaging API rejected or never received the alert.
    #[error("Notification delivery failed: {0}")]
    NotificationDelivery(String),

    /// Price string could not be parsed as a decimal.
    #[error("Malformed price: {0:?}")]
    MalformedPrice(String),
}

pub type RelayResult<T> = Result<T, RelayError>;
