use mockx_core::{ErrorKind, GatewayError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("{}: {}", .0.kind().as_str(), .0)]
    Gateway(#[from] GatewayError),

    #[error("settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("invalid setting {key}: {message}")]
    InvalidSetting { key: &'static str, message: String },

    #[error("invalid argument: {0}")]
    Argument(String),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Gateway(error) => match error.kind() {
                ErrorKind::BadRequest
                | ErrorKind::InvalidOrder
                | ErrorKind::Configuration
                | ErrorKind::UnsupportedMode => 2,
                ErrorKind::Authentication => 3,
                ErrorKind::NotSupported => 4,
                ErrorKind::InsufficientFunds | ErrorKind::OrderNotFound => 5,
                ErrorKind::Network => 6,
                ErrorKind::Exchange | ErrorKind::Mapping => 10,
            },
            Self::Settings(_) | Self::InvalidSetting { .. } | Self::Argument(_) => 2,
            Self::Serialization(_) | Self::Io(_) => 10,
        }
    }
}
