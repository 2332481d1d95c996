//! HTTP signal backend client

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use super::SignalSource;
use crate::error::{RelayError, RelayResult};
use crate::types::{Instrument, Signal, Timeframe};

/// Client for `GET {base}/signals/{symbol}?otc=..&timeframe=..`
pub struct HttpSignalSource {
    client: Client,
    base_url: String,
}

impl HttpSignalSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> RelayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RelayError::SourceUnavailable(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn signal_url(&self, instrument: &Instrument) -> String {
        format!("{}/signals/{}", self.base_url, instrument.symbol())
    }
}

#[async_trait]
impl SignalSource for HttpSignalSource {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch(&self, instrument: Instrument, timeframe: Timeframe) -> RelayResult<Signal> {
        let url = self.signal_url(&instrument);
        let otc = instrument.otc.to_string();
        let params = [("otc", otc.as_str()), ("timeframe", timeframe.label())];

        let response = self
            .client
            .get(&url)
            .query(&params)
            .send()
            .await
            .map_err(|e| RelayError::SourceUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(RelayError::SourceUnavailable(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| RelayError::SourceUnavailable(format!("body read failed: {e}")))?;

        let signal: Signal = serde_json::from_str(&body)
            .map_err(|e| RelayError::SourceUnavailable(format!("malformed body: {e}")))?;
        signal.validate().map_err(RelayError::SourceUnavailable)?;

        debug!(
            symbol = %instrument,
            timeframe = %timeframe,
            direction = %signal.direction,
            confidence = signal.confidence,
            "Fetched signal"
        );
        Ok(signal)
    }
}
