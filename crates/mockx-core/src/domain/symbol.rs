use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Quote assets recognized in concatenated input such as `BTCUSDT`, longest first.
const KNOWN_QUOTES: [&str; 11] = [
    "FDUSD", "USDT", "USDC", "BUSD", "TUSD", "BTC", "ETH", "BNB", "EUR", "USD", "TRY",
];

/// Canonical `BASE/QUOTE` market identifier.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a pair to uppercase `BASE/QUOTE`.
    ///
    /// Concatenated input is split on a known quote asset, so `btcusdt` becomes `BTC/USDT`.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let normalized = trimmed.to_ascii_uppercase();
        if let Some(ch) = normalized
            .chars()
            .find(|ch| !(ch.is_ascii_alphanumeric() || *ch == '/'))
        {
            return Err(ValidationError::SymbolInvalidChar {
                value: normalized,
                ch,
            });
        }

        let (base, quote) = match normalized.split_once('/') {
            Some((base, quote)) => (base.to_owned(), quote.to_owned()),
            None => split_concatenated(&normalized).ok_or_else(|| {
                ValidationError::SymbolNotPair {
                    value: normalized.clone(),
                }
            })?,
        };

        if base.is_empty() || quote.is_empty() || quote.contains('/') {
            return Err(ValidationError::SymbolNotPair { value: normalized });
        }

        Ok(Self(format!("{base}/{quote}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn base(&self) -> &str {
        self.0.split_once('/').map(|(base, _)| base).unwrap_or(&self.0)
    }

    pub fn quote(&self) -> &str {
        self.0.split_once('/').map(|(_, quote)| quote).unwrap_or("")
    }
}

fn split_concatenated(value: &str) -> Option<(String, String)> {
    KNOWN_QUOTES.iter().find_map(|quote| {
        value
            .strip_suffix(quote)
            .filter(|base| !base.is_empty())
            .map(|base| (base.to_owned(), (*quote).to_owned()))
    })
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}
