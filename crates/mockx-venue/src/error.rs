use thiserror::Error;

/// Failures reported by venue clients.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VenueError {
    #[error("authentication failed: {message}")]
    Authentication { message: String },

    #[error("permission denied: {message}")]
    PermissionDenied { message: String },

    #[error("insufficient balance: {message}")]
    InsufficientBalance { message: String },

    #[error("invalid order: {message}")]
    InvalidOrder { message: String },

    #[error("order not found: {message}")]
    OrderNotFound { message: String },

    #[error("bad symbol: {message}")]
    BadSymbol { message: String },

    #[error("bad request: {message}")]
    BadRequest { message: String },

    #[error("rate limited: {message}")]
    RateLimited { message: String },

    #[error("request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("network error: {message}")]
    Network { message: String },

    #[error("exchange unavailable: {message}")]
    Unavailable { message: String },

    #[error("{operation} is not supported by {exchange}")]
    NotSupported { exchange: String, operation: String },

    #[error("failed to decode response: {message}")]
    Decode { message: String },

    #[error("unknown exchange: {exchange_id}")]
    UnknownExchange { exchange_id: String },

    #[error("exchange error {code}: {message}")]
    Exchange { code: i64, message: String },
}

impl VenueError {
    /// Venue-assigned error code, when the venue reported one.
    pub const fn code(&self) -> Option<i64> {
        match self {
            Self::Exchange { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. }
                | Self::Timeout { .. }
                | Self::Network { .. }
                | Self::Unavailable { .. }
        )
    }

    pub(crate) fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }
}
