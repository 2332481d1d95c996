//! signal-relay library
//!
//! Polls a remote trading-signal backend, falls back to synthetic data when
//! it is unreachable, and forwards active signals to Telegram behind a
//! cooldown.

pub mod aggregator;
pub mod clock;
pub mod config;
pub mod error;
pub mod notify;
pub mod poller;
pub mod source;
pub mod synthetic;
pub mod types;
