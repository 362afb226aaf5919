use std::fmt::{Display, Formatter};

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Input validation failures for canonical value types.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("symbol cannot be empty")]
    EmptySymbol,

    #[error("symbol '{value}' must have the form BASE/QUOTE")]
    SymbolNotPair { value: String },

    #[error("symbol '{value}' contains invalid character '{ch}'")]
    SymbolInvalidChar { value: String, ch: char },

    #[error("timestamp {millis} is outside the supported range")]
    TimestampOutOfRange { millis: i64 },

    #[error("unknown {field} '{value}'")]
    UnknownVariant { field: &'static str, value: String },
}

/// Normalized failure categories shared by every backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Exchange,
    Authentication,
    BadRequest,
    InsufficientFunds,
    InvalidOrder,
    OrderNotFound,
    NotSupported,
    Network,
    Mapping,
    Configuration,
    UnsupportedMode,
}

impl ErrorKind {
    pub const ALL: [Self; 11] = [
        Self::Exchange,
        Self::Authentication,
        Self::BadRequest,
        Self::InsufficientFunds,
        Self::InvalidOrder,
        Self::OrderNotFound,
        Self::NotSupported,
        Self::Network,
        Self::Mapping,
        Self::Configuration,
        Self::UnsupportedMode,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Exchange => "ExchangeError",
            Self::Authentication => "AuthenticationError",
            Self::BadRequest => "BadRequest",
            Self::InsufficientFunds => "InsufficientFunds",
            Self::InvalidOrder => "InvalidOrder",
            Self::OrderNotFound => "OrderNotFound",
            Self::NotSupported => "NotSupported",
            Self::Network => "NetworkError",
            Self::Mapping => "MappingError",
            Self::Configuration => "ConfigurationError",
            Self::UnsupportedMode => "UnsupportedModeError",
        }
    }

    /// Stable machine-readable code, e.g. `gateway.insufficient_funds`.
    pub const fn code(self) -> &'static str {
        match self {
            Self::Exchange => "gateway.exchange",
            Self::Authentication => "gateway.authentication",
            Self::BadRequest => "gateway.bad_request",
            Self::InsufficientFunds => "gateway.insufficient_funds",
            Self::InvalidOrder => "gateway.invalid_order",
            Self::OrderNotFound => "gateway.order_not_found",
            Self::NotSupported => "gateway.not_supported",
            Self::Network => "gateway.network",
            Self::Mapping => "gateway.mapping",
            Self::Configuration => "gateway.configuration",
            Self::UnsupportedMode => "gateway.unsupported_mode",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The one error type callers see from a gateway.
///
/// `info` carries the raw backend payload (response body, venue error fields) when one exists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GatewayError {
    kind: ErrorKind,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    info: Option<Value>,
}

impl GatewayError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            info: None,
        }
    }

    pub fn exchange(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Exchange, message)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Authentication, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn insufficient_funds(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InsufficientFunds, message)
    }

    pub fn invalid_order(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidOrder, message)
    }

    pub fn order_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::OrderNotFound, message)
    }

    /// `{operation} not supported in mode={mode}`.
    pub fn not_supported(operation: &str, mode: &str) -> Self {
        Self::new(
            ErrorKind::NotSupported,
            format!("{operation} not supported in mode={mode}"),
        )
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Network, message)
    }

    pub fn mapping(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Mapping, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    pub fn unsupported_mode(mode: &str) -> Self {
        Self::new(
            ErrorKind::UnsupportedMode,
            format!("unsupported mode '{mode}', expected 'paper' or 'prod'"),
        )
    }

    pub fn with_info(mut self, info: Value) -> Self {
        self.info = Some(info);
        self
    }

    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn info(&self) -> Option<&Value> {
        self.info.as_ref()
    }

    pub const fn code(&self) -> &'static str {
        self.kind.code()
    }

    /// Hint for callers that implement their own retry policy. The gateway never retries.
    pub const fn retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Network)
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for GatewayError {}

impl From<ValidationError> for GatewayError {
    fn from(value: ValidationError) -> Self {
        Self::bad_request(value.to_string())
    }
}

pub type GatewayResult<T> = Result<T, GatewayError>;

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn codes_are_unique_per_kind() {
        let mut codes = ErrorKind::ALL.iter().map(|kind| kind.code()).collect::<Vec<_>>();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), ErrorKind::ALL.len());
    }

    #[test]
    fn not_supported_names_operation_and_mode() {
        let error = GatewayError::not_supported("fetchOHLCV", "paper");
        assert_eq!(error.kind(), ErrorKind::NotSupported);
        assert_eq!(error.to_string(), "fetchOHLCV not supported in mode=paper");
        assert!(!error.retryable());
    }

    #[test]
    fn info_is_carried_and_serialized() {
        let error = GatewayError::exchange("HTTP 500: boom").with_info(json!({"error": "boom"}));
        let rendered = serde_json::to_value(&error).expect("serializes");

        assert_eq!(rendered["kind"], "exchange");
        assert_eq!(rendered["info"]["error"], "boom");
        assert_eq!(error.info(), Some(&json!({"error": "boom"})));
    }

    #[test]
    fn validation_errors_become_bad_requests() {
        let error = GatewayError::from(ValidationError::EmptySymbol);
        assert_eq!(error.kind(), ErrorKind::BadRequest);
        assert_eq!(error.code(), "gateway.bad_request");
    }
}
