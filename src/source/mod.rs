//! Signal source adapters
//!
//! A source performs exactly one request per call. Retrying is left to the
//! next scheduled poll.

mod http;

pub use http::HttpSignalSource;

use crate::error::RelayResult;
use crate::types::{Instrument, Signal, Timeframe};
use async_trait::async_trait;

/// Trait for signal providers
#[async_trait]
pub trait SignalSource: Send + Sync {
    /// Get the source name
    fn name(&self) -> &'static str;

    /// Fetch the current signal. Every failure mode maps to
    /// [`RelayError::SourceUnavailable`](crate::error::RelayError::SourceUnavailable).
    async fn fetch(&self, instrument: Instrument, timeframe: Timeframe) -> RelayResult<Signal>;
}
