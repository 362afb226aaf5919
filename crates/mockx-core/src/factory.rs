//! Gateway construction. The only place that knows both backends exist.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;
use std::time::Duration;

use mockx_venue::{VenueClient, VenueCredentials, VenueError};
use serde::Deserialize;
use tracing::{error, info};

use crate::adapters::{venue_error, Backend, LiveAdapter, PaperAdapter};
use crate::capabilities::{CapabilityTable, Mode};
use crate::gateway::Gateway;
use crate::http_client::{HttpClient, ReqwestHttpClient, DEFAULT_TIMEOUT_MS};
use crate::{GatewayError, GatewayResult};

/// Mode-specific settings. Paper reads `base_url`, `api_key` and `timeout_ms`; prod reads
/// `exchange_id`, `api_key`, `secret`, `sandbox` and `timeout_ms`.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_ms: Option<u64>,
    pub exchange_id: Option<String>,
    pub secret: Option<String>,
    pub sandbox: Option<bool>,
}

impl GatewayConfig {
    pub fn paper(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            api_key: Some(api_key.into()),
            ..Self::default()
        }
    }

    pub fn prod(
        exchange_id: impl Into<String>,
        api_key: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            exchange_id: Some(exchange_id.into()),
            api_key: Some(api_key.into()),
            secret: Some(secret.into()),
            ..Self::default()
        }
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = Some(timeout_ms);
        self
    }

    pub fn with_sandbox(mut self, sandbox: bool) -> Self {
        self.sandbox = Some(sandbox);
        self
    }

    fn timeout_ms(&self) -> GatewayResult<u64> {
        match self.timeout_ms {
            Some(0) => Err(GatewayError::configuration("timeout_ms must be greater than zero")),
            Some(timeout_ms) => Ok(timeout_ms),
            None => Ok(DEFAULT_TIMEOUT_MS),
        }
    }
}

impl Debug for GatewayConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redacted(&self.api_key))
            .field("timeout_ms", &self.timeout_ms)
            .field("exchange_id", &self.exchange_id)
            .field("secret", &redacted(&self.secret))
            .field("sandbox", &self.sandbox)
            .finish()
    }
}

fn required<'a>(mode: Mode, field: &str, value: Option<&'a String>) -> GatewayResult<&'a str> {
    value
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| GatewayError::configuration(format!("{mode} mode requires '{field}'")))
}

/// How the factory obtains a live venue client.
pub trait VenueConnector: Send + Sync {
    fn connect(
        &self,
        exchange_id: &str,
        credentials: VenueCredentials,
    ) -> Result<Arc<dyn VenueClient>, VenueError>;
}

/// Connects through [`mockx_venue::connect`].
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultVenueConnector;

impl VenueConnector for DefaultVenueConnector {
    fn connect(
        &self,
        exchange_id: &str,
        credentials: VenueCredentials,
    ) -> Result<Arc<dyn VenueClient>, VenueError> {
        mockx_venue::connect(exchange_id, credentials)
    }
}

/// Builds gateways, with injectable transports for both backends.
#[derive(Clone)]
pub struct GatewayFactory {
    http: Arc<dyn HttpClient>,
    connector: Arc<dyn VenueConnector>,
}

impl Default for GatewayFactory {
    fn default() -> Self {
        Self {
            http: Arc::new(ReqwestHttpClient::new()),
            connector: Arc::new(DefaultVenueConnector),
        }
    }
}

impl GatewayFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport used by paper gateways.
    pub fn with_http_client(mut self, http: Arc<dyn HttpClient>) -> Self {
        self.http = http;
        self
    }

    /// Client source used by prod gateways.
    pub fn with_venue_connector(mut self, connector: Arc<dyn VenueConnector>) -> Self {
        self.connector = connector;
        self
    }

    /// `mode` is `paper` or `prod`, case-insensitive.
    pub fn create(&self, mode: &str, config: &GatewayConfig) -> GatewayResult<Gateway> {
        let mode = mode.parse::<Mode>()?;
        self.create_for(mode, config)
    }

    pub fn create_for(&self, mode: Mode, config: &GatewayConfig) -> GatewayResult<Gateway> {
        let built = match mode {
            Mode::Paper => self.paper_backend(config),
            Mode::Prod => self.prod_backend(config),
        };
        let gateway = built.and_then(|backend| assemble(backend, CapabilityTable::for_mode(mode)?));
        match &gateway {
            Ok(gateway) => info!(
                mode = %mode,
                target = %gateway.target(),
                enabled = gateway.has().enabled().count(),
                "gateway created"
            ),
            Err(failure) => error!(mode = %mode, error = %failure, "gateway creation failed"),
        }
        gateway
    }

    fn paper_backend(&self, config: &GatewayConfig) -> GatewayResult<Box<dyn Backend>> {
        let base_url = required(Mode::Paper, "base_url", config.base_url.as_ref())?;
        let api_key = required(Mode::Paper, "api_key", config.api_key.as_ref())?;
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(GatewayError::configuration(format!(
                "base_url must start with http:// or https://, got '{base_url}'"
            )));
        }
        let timeout_ms = config.timeout_ms()?;

        Ok(Box::new(PaperAdapter::new(
            Arc::clone(&self.http),
            base_url,
            api_key,
            timeout_ms,
        )))
    }

    fn prod_backend(&self, config: &GatewayConfig) -> GatewayResult<Box<dyn Backend>> {
        let exchange_id = required(Mode::Prod, "exchange_id", config.exchange_id.as_ref())?;
        let api_key = required(Mode::Prod, "api_key", config.api_key.as_ref())?;
        let secret = required(Mode::Prod, "secret", config.secret.as_ref())?;
        let timeout_ms = config.timeout_ms()?;

        let credentials = VenueCredentials::new(api_key, secret)
            .with_sandbox(config.sandbox.unwrap_or(false))
            .with_timeout(Duration::from_millis(timeout_ms));
        let client = self
            .connector
            .connect(exchange_id, credentials)
            .map_err(|error| venue_error(exchange_id, error))?;

        Ok(Box::new(LiveAdapter::new(client)))
    }
}

/// Pairs a backend with its table after checking the backend serves every enabled operation.
pub(crate) fn assemble(
    backend: Box<dyn Backend>,
    capabilities: CapabilityTable,
) -> GatewayResult<Gateway> {
    if backend.mode() != capabilities.mode() {
        return Err(GatewayError::configuration(format!(
            "{} adapter cannot serve the {} capability table",
            backend.mode(),
            capabilities.mode()
        )));
    }

    let served = backend.operations();
    let missing = capabilities
        .enabled()
        .filter(|operation| !served.contains(operation))
        .map(|operation| operation.as_str())
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        return Err(GatewayError::configuration(format!(
            "{} adapter does not implement enabled operations: {}",
            capabilities.mode(),
            missing.join(", ")
        )));
    }

    Ok(Gateway::new(backend, capabilities))
}

/// Builds a gateway for `mode` with the default transports.
pub fn create_gateway(mode: &str, config: &GatewayConfig) -> GatewayResult<Gateway> {
    GatewayFactory::default().create(mode, config)
}

pub fn create_paper_gateway(
    base_url: &str,
    api_key: &str,
    timeout: Option<Duration>,
) -> GatewayResult<Gateway> {
    let mut config = GatewayConfig::paper(base_url, api_key);
    if let Some(timeout) = timeout {
        config.timeout_ms = Some(duration_millis(timeout)?);
    }
    GatewayFactory::default().create_for(Mode::Paper, &config)
}

pub fn create_prod_gateway(
    exchange_id: &str,
    api_key: &str,
    secret: &str,
    sandbox: Option<bool>,
) -> GatewayResult<Gateway> {
    let mut config = GatewayConfig::prod(exchange_id, api_key, secret);
    config.sandbox = sandbox;
    GatewayFactory::default().create_for(Mode::Prod, &config)
}

fn duration_millis(timeout: Duration) -> GatewayResult<u64> {
    u64::try_from(timeout.as_millis())
        .ok()
        .filter(|millis| *millis > 0)
        .ok_or_else(|| {
            GatewayError::configuration(format!(
                "timeout must be between 1ms and u64::MAX ms, got {timeout:?}"
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::SimVenue;
    use crate::ErrorKind;

    fn offline() -> GatewayFactory {
        GatewayFactory::new().with_http_client(Arc::new(SimVenue::new()))
    }

    #[test]
    fn paper_requires_url_and_key() {
        let missing_key = GatewayConfig {
            base_url: Some(String::from("http://localhost:8000")),
            ..GatewayConfig::default()
        };
        let error = offline().create("paper", &missing_key).expect_err("no api key");
        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert!(error.message().contains("api_key"));

        let blank_url = GatewayConfig::paper("  ", "key");
        let error = offline().create("paper", &blank_url).expect_err("blank url");
        assert!(error.message().contains("base_url"));
    }

    #[test]
    fn paper_rejects_non_http_urls_and_zero_timeouts() {
        let ftp = GatewayConfig::paper("ftp://venue", "key");
        assert_eq!(
            offline().create("paper", &ftp).expect_err("scheme").kind(),
            ErrorKind::Configuration
        );

        let zero = GatewayConfig::paper("http://venue", "key").with_timeout_ms(0);
        assert_eq!(
            offline().create("paper", &zero).expect_err("zero timeout").kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn unknown_modes_are_unsupported() {
        let error = offline()
            .create("backtest", &GatewayConfig::paper("http://venue", "key"))
            .expect_err("backtest is not a mode");
        assert_eq!(error.kind(), ErrorKind::UnsupportedMode);
    }

    #[test]
    fn modes_parse_case_insensitively() {
        let gateway = offline()
            .create(" PAPER ", &GatewayConfig::paper("http://venue/", "key"))
            .expect("paper gateway");
        assert_eq!(gateway.mode(), Mode::Paper);
        assert_eq!(gateway.target(), "http://venue");
    }

    #[test]
    fn prod_requires_credentials() {
        let config = GatewayConfig {
            exchange_id: Some(String::from("binance")),
            api_key: Some(String::from("key")),
            ..GatewayConfig::default()
        };
        let error = offline().create("prod", &config).expect_err("no secret");
        assert_eq!(error.kind(), ErrorKind::Configuration);
        assert!(error.message().contains("secret"));
    }

    #[test]
    fn unknown_exchanges_are_configuration_errors() {
        let error = offline()
            .create("prod", &GatewayConfig::prod("kraken", "key", "secret"))
            .expect_err("no kraken connector");
        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn backends_must_cover_every_enabled_operation() {
        let paper = PaperAdapter::new(Arc::new(SimVenue::new()), "http://venue", "key", 1_000);
        let prod_table = CapabilityTable::for_mode(Mode::Prod).expect("static table is valid");

        let error = assemble(Box::new(paper), prod_table).expect_err("mode mismatch");

        assert_eq!(error.kind(), ErrorKind::Configuration);
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = GatewayConfig::prod("binance", "live-key", "live-secret");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("live-key"));
        assert!(!rendered.contains("live-secret"));
        assert!(rendered.contains("binance"));
    }

    #[test]
    fn durations_convert_to_positive_millis() {
        assert_eq!(duration_millis(Duration::from_secs(2)), Ok(2_000));
        assert!(duration_millis(Duration::from_micros(10)).is_err());
    }
}
