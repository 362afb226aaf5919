use serde::Serialize;
use serde_json::Value;

use crate::domain::{OrderSide, Symbol, UtcDateTime};

/// Canonical ticker snapshot. `info` keeps the untouched backend payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    pub symbol: Symbol,
    pub last: Option<f64>,
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub bid_volume: Option<f64>,
    pub ask_volume: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub base_volume: Option<f64>,
    pub quote_volume: Option<f64>,
    pub change: Option<f64>,
    pub percentage: Option<f64>,
    pub timestamp: Option<i64>,
    pub datetime: Option<UtcDateTime>,
    pub info: Value,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MarketPrecision {
    pub amount: Option<u32>,
    pub price: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketLimits {
    pub amount_min: Option<f64>,
    pub amount_max: Option<f64>,
    pub cost_min: Option<f64>,
}

/// Spot market metadata, keyed by symbol in the gateway's market cache.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Market {
    pub id: String,
    pub symbol: Symbol,
    pub base: String,
    pub quote: String,
    pub active: bool,
    #[serde(rename = "type")]
    pub market_type: &'static str,
    pub precision: MarketPrecision,
    pub limits: MarketLimits,
    pub info: Value,
}

impl Market {
    /// A spot market with no precision or limit metadata.
    pub fn spot(id: impl Into<String>, symbol: Symbol, info: Value) -> Self {
        Self {
            id: id.into(),
            base: symbol.base().to_owned(),
            quote: symbol.quote().to_owned(),
            symbol,
            active: true,
            market_type: "spot",
            precision: MarketPrecision::default(),
            limits: MarketLimits::default(),
            info,
        }
    }
}

/// One OHLCV row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Candle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Price levels as `[price, amount]`; bids descending, asks ascending.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderBook {
    pub symbol: Symbol,
    pub bids: Vec<[f64; 2]>,
    pub asks: Vec<[f64; 2]>,
    pub timestamp: Option<i64>,
    pub datetime: Option<UtcDateTime>,
    pub nonce: Option<u64>,
}

impl OrderBook {
    pub fn best_bid(&self) -> Option<[f64; 2]> {
        self.bids.first().copied()
    }

    pub fn best_ask(&self) -> Option<[f64; 2]> {
        self.asks.first().copied()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    pub id: String,
    pub symbol: Symbol,
    pub order: Option<String>,
    pub side: Option<OrderSide>,
    pub price: f64,
    pub amount: f64,
    pub cost: f64,
    pub taker_or_maker: Option<String>,
    pub timestamp: Option<i64>,
    pub datetime: Option<UtcDateTime>,
    pub info: Value,
}
