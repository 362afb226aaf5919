use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{Symbol, UtcDateTime};
use crate::{GatewayError, ValidationError};

/// Extra backend-specific order or transfer fields, forwarded as-is.
pub type Params = BTreeMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "market",
            Self::Limit => "limit",
        }
    }
}

impl Display for OrderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderType {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "market" => Ok(Self::Market),
            "limit" => Ok(Self::Limit),
            other => Err(ValidationError::UnknownVariant {
                field: "order type",
                value: other.to_owned(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl Display for OrderSide {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderSide {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            other => Err(ValidationError::UnknownVariant {
                field: "order side",
                value: other.to_owned(),
            }),
        }
    }
}

/// Canonical order lifecycle states. Backend vocabularies are translated into these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Open,
    PartiallyFilled,
    Closed,
    Canceled,
    Expired,
    Rejected,
    Pending,
}

impl OrderStatus {
    pub const ALL: [Self; 7] = [
        Self::Open,
        Self::PartiallyFilled,
        Self::Closed,
        Self::Canceled,
        Self::Expired,
        Self::Rejected,
        Self::Pending,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::PartiallyFilled => "partially_filled",
            Self::Closed => "closed",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::Rejected => "rejected",
            Self::Pending => "pending",
        }
    }

    /// Resting on the book: `open` or `partially_filled`.
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open | Self::PartiallyFilled)
    }

    /// Terminal states reported by `fetch_closed_orders`.
    pub const fn is_closed(self) -> bool {
        matches!(
            self,
            Self::Closed | Self::Canceled | Self::Expired | Self::Rejected
        )
    }
}

impl Display for OrderStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or(ValidationError::UnknownVariant {
                field: "order status",
                value: normalized,
            })
    }
}

/// Canonical order. `status` is never a backend-native string.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub symbol: Symbol,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    pub side: OrderSide,
    pub amount: f64,
    pub price: Option<f64>,
    pub status: OrderStatus,
    pub filled: f64,
    pub remaining: f64,
    pub cost: Option<f64>,
    pub timestamp: Option<i64>,
    pub datetime: Option<UtcDateTime>,
    pub last_trade_timestamp: Option<i64>,
    pub info: Value,
}

/// A validated order submission.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRequest {
    pub symbol: Symbol,
    pub order_type: OrderType,
    pub side: OrderSide,
    pub amount: f64,
    pub price: Option<f64>,
    pub params: Params,
}

impl OrderRequest {
    /// Rejects non-positive amounts and prices, and limit orders without a price.
    pub fn new(
        symbol: Symbol,
        order_type: OrderType,
        side: OrderSide,
        amount: f64,
        price: Option<f64>,
        params: Params,
    ) -> Result<Self, GatewayError> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(GatewayError::invalid_order(format!(
                "amount must be a positive number, got {amount}"
            )));
        }

        if let Some(price) = price {
            if !price.is_finite() || price <= 0.0 {
                return Err(GatewayError::invalid_order(format!(
                    "price must be a positive number, got {price}"
                )));
            }
        }

        if order_type == OrderType::Limit && price.is_none() {
            return Err(GatewayError::invalid_order("limit orders require a price"));
        }

        Ok(Self {
            symbol,
            order_type,
            side,
            amount,
            price,
            params,
        })
    }
}

/// Filters for `fetch_orders`. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderFilter {
    pub symbol: Option<Symbol>,
    pub status: Option<OrderStatus>,
    pub side: Option<OrderSide>,
    pub limit: Option<u32>,
}

impl OrderFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_symbol(mut self, symbol: Symbol) -> Self {
        self.symbol = Some(symbol);
        self
    }

    pub fn with_status(mut self, status: OrderStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_side(mut self, side: OrderSide) -> Self {
        self.side = Some(side);
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Dry-run verdict from the simulated venue.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionCheck {
    pub can_execute: bool,
    pub reason: Option<String>,
    pub info: Value,
}
