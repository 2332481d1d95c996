//! Core types used throughout signal-relay
//!
//! Defines instruments, timeframes, the signal payload and chart bars.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Spot FX pairs the backend publishes signals for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Asset {
    EURUSD,
    GBPUSD,
    AUDUSD,
    USDJPY,
    EURGBP,
    EURJPY,
    GBPJPY,
    AUDJPY,
    USDCHF,
    NZDUSD,
}

impl Default for Asset {
    fn default() -> Self {
        Asset::EURUSD
    }
}

impl Asset {
    pub const ALL: [Asset; 10] = [
        Asset::EURUSD,
        Asset::GBPUSD,
        Asset::AUDUSD,
        Asset::USDJPY,
        Asset::EURGBP,
        Asset::EURJPY,
        Asset::GBPJPY,
        Asset::AUDJPY,
        Asset::USDCHF,
        Asset::NZDUSD,
    ];

    pub fn symbol(&self) -> &'static str {
        match self {
            Asset::EURUSD => "EURUSD",
            Asset::GBPUSD => "GBPUSD",
            Asset::AUDUSD => "AUDUSD",
            Asset::USDJPY => "USDJPY",
            Asset::EURGBP => "EURGBP",
            Asset::EURJPY => "EURJPY",
            Asset::GBPJPY => "GBPJPY",
            Asset::AUDJPY => "AUDJPY",
            Asset::USDCHF => "USDCHF",
            Asset::NZDUSD => "NZDUSD",
        }
    }

    /// Parse from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Self> {
        let upper = s.trim().to_uppercase();
        Asset::ALL.iter().copied().find(|a| a.symbol() == upper)
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// A tradable series: spot pair or its OTC variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Instrument {
    pub base: Asset,
    pub otc: bool,
}

impl Instrument {
    pub fn new(base: Asset, otc: bool) -> Self {
        Self { base, otc }
    }

    /// Resolved symbol, e.g. "EURUSD" or "EURUSD-OTC"
    pub fn symbol(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.otc {
            write!(f, "{}-OTC", self.base)
        } else {
            write!(f, "{}", self.base)
        }
    }
}

/// Supported signal expiries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    Min1,
    Min2,
    Min3,
    Min5,
    Min15,
}

impl Default for Timeframe {
    fn default() -> Self {
        Timeframe::Min1
    }
}

impl Timeframe {
    pub const ALL: [Timeframe; 5] = [
        Timeframe::Min1,
        Timeframe::Min2,
        Timeframe::Min3,
        Timeframe::Min5,
        Timeframe::Min15,
    ];

    /// Label used on the wire and in alerts
    pub fn label(&self) -> &'static str {
        match self {
            Timeframe::Min1 => "1m",
            Timeframe::Min2 => "2m",
            Timeframe::Min3 => "3m",
            Timeframe::Min5 => "5m",
            Timeframe::Min15 => "15m",
        }
    }

    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "1min" => Some(Timeframe::Min1),
            "2m" | "2min" => Some(Timeframe::Min2),
            "3m" | "3min" => Some(Timeframe::Min3),
            "5m" | "5min" => Some(Timeframe::Min5),
            "15m" | "15min" => Some(Timeframe::Min15),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Predicted price direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    #[serde(rename = "CALL")]
    Call,
    #[serde(rename = "PUT")]
    Put,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Call => write!(f, "CALL"),
            Direction::Put => write!(f, "PUT"),
        }
    }
}

/// Whether a signal should be acted upon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignalStatus {
    Active,
    Inactive,
}

/// Indicator bundle attached to a signal.
///
/// Only the keys the synthetic generator fills are typed; everything else the
/// backend sends is kept in `extra` and passed through untouched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Technical {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub macd: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<serde_json::Value>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// One prediction payload for an instrument at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Signal {
    pub status: SignalStatus,
    pub direction: Direction,
    /// Confidence percentage (0 - 100)
    pub confidence: u8,
    /// Instrument price at signal time, kept as received
    #[serde(deserialize_with = "string_or_number")]
    pub price: String,
    /// Expiry label, e.g. "1m"
    pub expire: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical: Option<Technical>,
    /// Enrichment fields (confluence, sentiment, performance, risk ...)
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Signal {
    pub fn is_active(&self) -> bool {
        self.status == SignalStatus::Active
    }

    /// Structural checks serde cannot express
    pub fn validate(&self) -> Result<(), String> {
        if self.confidence > 100 {
            return Err(format!("confidence {} out of range", self.confidence));
        }
        Ok(())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "price must be a string or number, got {other}"
        ))),
    }
}

/// OHLC bar for the dashboard chart
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Bar time (Unix seconds)
    pub time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}
