//! Configuration management for signal-relay
//!
//! Loads from optional config files + environment variables via .env

mod types;

pub use types::*;

use anyhow::{bail, Context, Result};
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::types::{Asset, Instrument, Timeframe};

/// Fallback signal backend when no override is configured
pub const DEFAULT_BACKEND_URL: &str = "https://premium-ai-signals-backend-y2m1.onrender.com";

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub backend: BackendConfig,
    pub polling: PollingConfig,
    pub telegram: TelegramConfig,
    pub synthetic: SyntheticConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackendConfig {
    /// Signal backend base address
    pub base_url: String,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollingConfig {
    /// Base asset, e.g. "EURUSD"
    pub asset: String,
    /// Poll the OTC series instead of spot
    pub otc: bool,
    /// Signal expiry ("1m", "2m", "3m", "5m", "15m")
    pub timeframe: String,
    /// Poll interval in milliseconds
    pub interval_ms: u64,
    /// Minimum spacing between alerts in milliseconds
    pub cooldown_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramConfig {
    /// Bot API base address
    pub api_base: String,
    /// Bot token (required, no default)
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Destination chat id (required, no default)
    #[serde(default)]
    pub chat_id: Option<String>,
    /// Per-request timeout in milliseconds
    pub request_timeout_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SyntheticConfig {
    /// Bars generated for the initial chart
    pub seed_bars: usize,
    /// Open price of the first seeded bar
    pub seed_price: f64,
    /// Maximum bars retained in the chart series
    pub max_bars: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones
    pub json: bool,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        // Load .env file first
        dotenvy::dotenv().ok();

        let config = Self::defaults()?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // Override with environment variables (RELAY__*)
            .add_source(Environment::with_prefix("RELAY").separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let app_config: AppConfig = config
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        Ok(app_config)
    }

    /// Builder pre-populated with every default except the Telegram secrets
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>> {
        let builder = Config::builder()
            // Backend defaults
            .set_default("backend.base_url", DEFAULT_BACKEND_URL)?
            .set_default("backend.request_timeout_ms", 10_000)?
            // Polling defaults
            .set_default("polling.asset", "EURUSD")?
            .set_default("polling.otc", false)?
            .set_default("polling.timeframe", "1m")?
            .set_default("polling.interval_ms", 30_000)?
            .set_default("polling.cooldown_ms", 60_000)?
            // Telegram defaults
            .set_default("telegram.api_base", "https://api.telegram.org")?
            .set_default("telegram.request_timeout_ms", 10_000)?
            // Synthetic feed defaults
            .set_default("synthetic.seed_bars", 100)?
            .set_default("synthetic.seed_price", 1.0850)?
            .set_default("synthetic.max_bars", 500)?
            // Logging defaults
            .set_default("logging.json", false)?;
        Ok(builder)
    }

    /// Polling section resolved into typed runtime parameters
    pub fn poll_config(&self) -> Result<PollConfig> {
        let base = Asset::from_str(&self.polling.asset)
            .with_context(|| format!("Unknown asset {:?}", self.polling.asset))?;
        let timeframe = Timeframe::from_str(&self.polling.timeframe)
            .with_context(|| format!("Unknown timeframe {:?}", self.polling.timeframe))?;

        let poll = PollConfig {
            instrument: Instrument::new(base, self.polling.otc),
            timeframe,
            interval_ms: self.polling.interval_ms,
            cooldown_ms: self.polling.cooldown_ms,
        };
        poll.validate()?;
        Ok(poll)
    }

    /// Telegram credentials; absence is a startup error
    pub fn telegram_credentials(&self) -> Result<(String, String)> {
        let token = match self.telegram.bot_token.as_deref().map(str::trim) {
            Some(t) if !t.is_empty() => t.to_string(),
            _ => bail!("telegram.bot_token is not set (RELAY__TELEGRAM__BOT_TOKEN)"),
        };
        let chat_id = match self.telegram.chat_id.as_deref().map(str::trim) {
            Some(c) if !c.is_empty() => c.to_string(),
            _ => bail!("telegram.chat_id is not set (RELAY__TELEGRAM__CHAT_ID)"),
        };
        Ok((token, chat_id))
    }

    /// Validate everything needed before the loop starts
    pub fn validate(&self) -> Result<()> {
        if self.backend.base_url.trim().is_empty() {
            bail!("backend.base_url must not be empty");
        }
        if self.synthetic.seed_bars == 0 {
            bail!("synthetic.seed_bars must be at least 1");
        }
        if self.synthetic.max_bars < self.synthetic.seed_bars {
            bail!("synthetic.max_bars must be >= synthetic.seed_bars");
        }
        self.poll_config()?;
        self.telegram_credentials()?;
        Ok(())
    }

    /// Generate a digest of the config (without secrets) for logging
    pub fn digest(&self) -> String {
        format!(
            "backend={} asset={} otc={} timeframe={} interval_ms={} cooldown_ms={} telegram_configured={}",
            self.backend.base_url,
            self.polling.asset,
            self.polling.otc,
            self.polling.timeframe,
            self.polling.interval_ms,
            self.polling.cooldown_ms,
            self.telegram_credentials().is_ok()
        )
    }
}

impl std::fmt::Display for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.digest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(overrides: &[(&str, &str)]) -> AppConfig {
        let mut builder = AppConfig::defaults().unwrap();
        for (key, value) in overrides {
            builder = builder.set_override(*key, *value).unwrap();
        }
        builder.build().unwrap().try_deserialize().unwrap()
    }

    #[test]
    fn test_defaults_resolve() {
        let cfg = build(&[]);
        assert_eq!(cfg.backend.base_url, DEFAULT_BACKEND_URL);

        let poll = cfg.poll_config().unwrap();
        assert_eq!(poll.instrument, Instrument::new(Asset::EURUSD, false));
        assert_eq!(poll.timeframe, Timeframe::Min1);
        assert_eq!(poll.interval_ms, 30_000);
        assert_eq!(poll.cooldown_ms, 60_000);
    }

    #[test]
    fn test_missing_secrets_fail_validation() {
        let cfg = build(&[]);
        assert!(cfg.validate().is_err());

        let cfg = build(&[("telegram.bot_token", "123:abc")]);
        assert!(cfg.validate().is_err());

        let cfg = build(&[("telegram.bot_token", "123:abc"), ("telegram.chat_id", "  ")]);
        assert!(cfg.validate().is_err());

        let cfg = build(&[("telegram.bot_token", "123:abc"), ("telegram.chat_id", "42")]);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_polling_overrides() {
        let cfg = build(&[
            ("polling.asset", "gbpjpy"),
            ("polling.otc", "true"),
            ("polling.timeframe", "5m"),
            ("polling.interval_ms", "120000"),
        ]);
        let poll = cfg.poll_config().unwrap();
        assert_eq!(poll.instrument.symbol(), "GBPJPY-OTC");
        assert_eq!(poll.timeframe, Timeframe::Min5);
        assert_eq!(poll.interval_ms, 120_000);
    }

    #[test]
    fn test_rejects_unknown_asset() {
        let cfg = build(&[("polling.asset", "BTCUSD")]);
        assert!(cfg.poll_config().is_err());
    }

    #[test]
    fn test_digest_hides_secrets() {
        let cfg = build(&[("telegram.bot_token", "123:secret"), ("telegram.chat_id", "42")]);
        let digest = cfg.digest();
        assert!(!digest.contains("secret"));
        assert!(digest.contains("telegram_configured=true"));
    }
}
