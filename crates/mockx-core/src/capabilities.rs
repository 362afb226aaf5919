//! Per-mode operation availability.
//!
//! Tables are declared as plain `(name, flag)` pairs, the same camelCase names callers see
//! through [`crate::Gateway::has`], and validated once against [`Operation`] when a gateway is
//! built.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use crate::GatewayError;

/// Execution target of a gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    Paper,
    Prod,
}

impl Mode {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Paper => "paper",
            Self::Prod => "prod",
        }
    }
}

impl Display for Mode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "paper" => Ok(Self::Paper),
            "prod" => Ok(Self::Prod),
            _ => Err(GatewayError::unsupported_mode(value.trim())),
        }
    }
}

/// Every operation the gateway contract names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    LoadMarkets,
    FetchMarkets,
    FetchTicker,
    FetchTickers,
    FetchOhlcv,
    FetchOrderBook,
    FetchTrades,
    FetchBalance,
    FetchBalanceList,
    CreateOrder,
    CreateMarketOrder,
    CreateLimitOrder,
    CanExecuteOrder,
    FetchOrder,
    FetchOrders,
    FetchOpenOrders,
    FetchClosedOrders,
    CancelOrder,
    FetchMyTrades,
    Deposit,
    Withdraw,
}

impl Operation {
    pub const ALL: [Self; 21] = [
        Self::LoadMarkets,
        Self::FetchMarkets,
        Self::FetchTicker,
        Self::FetchTickers,
        Self::FetchOhlcv,
        Self::FetchOrderBook,
        Self::FetchTrades,
        Self::FetchBalance,
        Self::FetchBalanceList,
        Self::CreateOrder,
        Self::CreateMarketOrder,
        Self::CreateLimitOrder,
        Self::CanExecuteOrder,
        Self::FetchOrder,
        Self::FetchOrders,
        Self::FetchOpenOrders,
        Self::FetchClosedOrders,
        Self::CancelOrder,
        Self::FetchMyTrades,
        Self::Deposit,
        Self::Withdraw,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::LoadMarkets => "loadMarkets",
            Self::FetchMarkets => "fetchMarkets",
            Self::FetchTicker => "fetchTicker",
            Self::FetchTickers => "fetchTickers",
            Self::FetchOhlcv => "fetchOHLCV",
            Self::FetchOrderBook => "fetchOrderBook",
            Self::FetchTrades => "fetchTrades",
            Self::FetchBalance => "fetchBalance",
            Self::FetchBalanceList => "fetchBalanceList",
            Self::CreateOrder => "createOrder",
            Self::CreateMarketOrder => "createMarketOrder",
            Self::CreateLimitOrder => "createLimitOrder",
            Self::CanExecuteOrder => "canExecuteOrder",
            Self::FetchOrder => "fetchOrder",
            Self::FetchOrders => "fetchOrders",
            Self::FetchOpenOrders => "fetchOpenOrders",
            Self::FetchClosedOrders => "fetchClosedOrders",
            Self::CancelOrder => "cancelOrder",
            Self::FetchMyTrades => "fetchMyTrades",
            Self::Deposit => "deposit",
            Self::Withdraw => "withdraw",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|operation| operation.as_str() == value)
            .ok_or_else(|| GatewayError::configuration(format!("unknown operation '{value}'")))
    }
}

/// Simulated venue: no public market history, no trade history; balance management extensions.
pub const PAPER_CAPABILITIES: [(&str, bool); 21] = [
    ("loadMarkets", true),
    ("fetchMarkets", true),
    ("fetchTicker", true),
    ("fetchTickers", true),
    ("fetchOHLCV", false),
    ("fetchOrderBook", false),
    ("fetchTrades", false),
    ("fetchBalance", true),
    ("fetchBalanceList", true),
    ("createOrder", true),
    ("createMarketOrder", true),
    ("createLimitOrder", true),
    ("canExecuteOrder", true),
    ("fetchOrder", true),
    ("fetchOrders", true),
    ("fetchOpenOrders", true),
    ("fetchClosedOrders", true),
    ("cancelOrder", true),
    ("fetchMyTrades", false),
    ("deposit", true),
    ("withdraw", true),
];

/// Live venue: the standard surface, without the simulated-only extensions.
pub const PROD_CAPABILITIES: [(&str, bool); 21] = [
    ("loadMarkets", true),
    ("fetchMarkets", true),
    ("fetchTicker", true),
    ("fetchTickers", true),
    ("fetchOHLCV", true),
    ("fetchOrderBook", true),
    ("fetchTrades", true),
    ("fetchBalance", true),
    ("fetchBalanceList", false),
    ("createOrder", true),
    ("createMarketOrder", true),
    ("createLimitOrder", true),
    ("canExecuteOrder", false),
    ("fetchOrder", true),
    ("fetchOrders", true),
    ("fetchOpenOrders", true),
    ("fetchClosedOrders", true),
    ("cancelOrder", true),
    ("fetchMyTrades", true),
    ("deposit", false),
    ("withdraw", false),
];

/// Immutable `{operationName -> bool}` map for one mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapabilityTable {
    mode: Mode,
    flags: BTreeMap<Operation, bool>,
}

impl CapabilityTable {
    /// Builds a table from named flags. Unknown, duplicated or missing operation names fail
    /// with a configuration error.
    pub fn from_entries<'a>(
        mode: Mode,
        entries: impl IntoIterator<Item = (&'a str, bool)>,
    ) -> Result<Self, GatewayError> {
        let mut flags = BTreeMap::new();
        for (name, supported) in entries {
            let operation = name.parse::<Operation>()?;
            if flags.insert(operation, supported).is_some() {
                return Err(GatewayError::configuration(format!(
                    "operation '{name}' is declared twice in the {mode} capability table"
                )));
            }
        }

        let missing = Operation::ALL
            .iter()
            .filter(|operation| !flags.contains_key(*operation))
            .map(|operation| operation.as_str())
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(GatewayError::configuration(format!(
                "{mode} capability table does not declare: {}",
                missing.join(", ")
            )));
        }

        Ok(Self { mode, flags })
    }

    /// The static table for `mode`.
    pub fn for_mode(mode: Mode) -> Result<Self, GatewayError> {
        match mode {
            Mode::Paper => Self::from_entries(mode, PAPER_CAPABILITIES),
            Mode::Prod => Self::from_entries(mode, PROD_CAPABILITIES),
        }
    }

    pub const fn mode(&self) -> Mode {
        self.mode
    }

    pub fn supports(&self, operation: Operation) -> bool {
        self.flags.get(&operation).copied().unwrap_or(false)
    }

    /// Lookup by camelCase name; `None` for names outside the contract.
    pub fn get(&self, name: &str) -> Option<bool> {
        name.parse::<Operation>()
            .ok()
            .map(|operation| self.supports(operation))
    }

    /// Fails with `NotSupported` naming the operation and mode when the flag is off.
    pub fn require(&self, operation: Operation) -> Result<(), GatewayError> {
        if self.supports(operation) {
            Ok(())
        } else {
            Err(GatewayError::not_supported(
                operation.as_str(),
                self.mode.as_str(),
            ))
        }
    }

    pub fn enabled(&self) -> impl Iterator<Item = Operation> + '_ {
        self.flags
            .iter()
            .filter(|(_, supported)| **supported)
            .map(|(operation, _)| *operation)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.flags
            .iter()
            .map(|(operation, supported)| (operation.as_str(), *supported))
    }

    pub fn to_map(&self) -> BTreeMap<&'static str, bool> {
        self.iter().collect()
    }
}

impl Serialize for CapabilityTable {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.flags.len()))?;
        for (name, supported) in self.iter() {
            map.serialize_entry(name, &supported)?;
        }
        map.end()
    }
}
