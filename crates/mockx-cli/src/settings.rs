//! Layered settings: defaults, `mockx.toml`, environment, flags.
//!
//! ```toml
//! mode = "paper"
//! timeout_ms = 10000
//!
//! [paper]
//! base_url = "http://localhost:8000"
//! api_key = "dev-key"
//!
//! [prod]
//! exchange_id = "binance"
//! api_key = "..."
//! secret = "..."
//! sandbox = true
//! ```

use std::fmt::{Debug, Formatter};
use std::path::Path;

use config::{Config, File, FileFormat};
use mockx_core::{GatewayConfig, Mode};
use serde::Deserialize;

use crate::error::CliError;

pub const DEFAULT_SETTINGS_FILE: &str = "mockx.toml";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

const OFFLINE_BASE_URL: &str = "http://offline.mockx";
const OFFLINE_API_KEY: &str = "offline";

/// Seconds, fractional allowed.
const TIMEOUT_ENV: &str = "MOCKEXCHANGE_TIMEOUT";

const ENV_OVERRIDES: [(&str, &str); 7] = [
    ("MOCKX_MODE", "mode"),
    ("MOCKEXCHANGE_BASE_URL", "paper.base_url"),
    ("MOCKEXCHANGE_API_KEY", "paper.api_key"),
    ("MOCKX_EXCHANGE_ID", "prod.exchange_id"),
    ("MOCKX_API_KEY", "prod.api_key"),
    ("MOCKX_SECRET", "prod.secret"),
    ("MOCKX_SANDBOX", "prod.sandbox"),
];

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    pub mode: String,
    pub timeout_ms: u64,
    #[serde(default)]
    pub paper: PaperSettings,
    #[serde(default)]
    pub prod: ProdSettings,
}

#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct PaperSettings {
    pub base_url: String,
    pub api_key: Option<String>,
}

#[derive(Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct ProdSettings {
    pub exchange_id: Option<String>,
    pub api_key: Option<String>,
    pub secret: Option<String>,
    pub sandbox: bool,
}

impl Debug for PaperSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PaperSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Debug for ProdSettings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProdSettings")
            .field("exchange_id", &self.exchange_id)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("secret", &self.secret.as_ref().map(|_| "[REDACTED]"))
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

impl Settings {
    /// Resolves settings. `env` looks up one environment variable; blank values count as unset.
    pub fn load<F>(path: Option<&Path>, env: F, mode_flag: Option<&str>) -> Result<Self, CliError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::from(Path::new(DEFAULT_SETTINGS_FILE))
                .format(FileFormat::Toml)
                .required(false),
        };

        let mut builder = Config::builder()
            .set_default("mode", Mode::Paper.as_str())?
            .set_default("timeout_ms", DEFAULT_TIMEOUT_MS)?
            .set_default("paper.base_url", DEFAULT_BASE_URL)?
            .set_default("prod.sandbox", false)?
            .add_source(file);

        let lookup = |key: &str| env(key).filter(|value| !value.trim().is_empty());
        for (variable, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(key, lookup(variable))?;
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            builder = builder.set_override("timeout_ms", timeout_from_seconds(&raw)?)?;
        }
        builder = builder.set_override_option("mode", mode_flag)?;

        let settings: Self = builder.build()?.try_deserialize()?;
        tracing::debug!(
            mode = %settings.mode,
            timeout_ms = settings.timeout_ms,
            "settings resolved"
        );
        Ok(settings)
    }

    pub fn mode(&self) -> Result<Mode, CliError> {
        Ok(self.mode.parse::<Mode>()?)
    }

    /// Gateway configuration for the resolved mode.
    pub fn gateway_config(&self) -> Result<(Mode, GatewayConfig), CliError> {
        let mode = self.mode()?;
        let config = match mode {
            Mode::Paper => GatewayConfig {
                base_url: Some(self.paper.base_url.clone()),
                api_key: self.paper.api_key.clone(),
                ..GatewayConfig::default()
            },
            Mode::Prod => GatewayConfig {
                exchange_id: self.prod.exchange_id.clone(),
                api_key: self.prod.api_key.clone(),
                secret: self.prod.secret.clone(),
                sandbox: Some(self.prod.sandbox),
                ..GatewayConfig::default()
            },
        };
        Ok((mode, config.with_timeout_ms(self.timeout_ms)))
    }

    /// Paper configuration for the in-memory venue. Keeps the configured key when one is set.
    pub fn offline_config(&self) -> GatewayConfig {
        let api_key = self.paper.api_key.as_deref().unwrap_or(OFFLINE_API_KEY);
        GatewayConfig::paper(OFFLINE_BASE_URL, api_key).with_timeout_ms(self.timeout_ms)
    }
}

fn timeout_from_seconds(raw: &str) -> Result<u64, CliError> {
    let invalid = |message: String| CliError::InvalidSetting {
        key: TIMEOUT_ENV,
        message,
    };
    let seconds = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| invalid(format!("'{raw}' is not a number of seconds")))?;
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(invalid(format!("'{raw}' must be a positive number of seconds")));
    }
    let millis = (seconds * 1_000.0).round();
    if millis < 1.0 || millis > u64::MAX as f64 {
        return Err(invalid(format!("'{raw}' is out of range")));
    }
    Ok(millis as u64)
}
