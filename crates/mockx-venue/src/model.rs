use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Market metadata as listed by a venue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueMarket {
    pub id: String,
    pub symbol: String,
    pub base: String,
    pub quote: String,
    pub active: bool,
    pub amount_precision: Option<u32>,
    pub price_precision: Option<u32>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    pub min_cost: Option<f64>,
    pub info: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueTicker {
    pub symbol: String,
    pub timestamp: Option<i64>,
    pub last: Option<f64>,
    pub bid: Option<f64>,
    pub bid_volume: Option<f64>,
    pub ask: Option<f64>,
    pub ask_volume: Option<f64>,
    pub high: Option<f64>,
    pub low: Option<f64>,
    pub open: Option<f64>,
    pub close: Option<f64>,
    pub base_volume: Option<f64>,
    pub quote_volume: Option<f64>,
    pub change: Option<f64>,
    pub percentage: Option<f64>,
    pub info: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VenueCandle {
    pub timestamp: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueOrderBook {
    pub symbol: String,
    pub bids: Vec<(f64, f64)>,
    pub asks: Vec<(f64, f64)>,
    pub timestamp: Option<i64>,
    pub nonce: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueTrade {
    pub id: String,
    pub order_id: Option<String>,
    pub symbol: String,
    pub side: Option<String>,
    pub price: f64,
    pub amount: f64,
    pub cost: Option<f64>,
    pub timestamp: Option<i64>,
    pub taker_or_maker: Option<String>,
    pub info: Value,
}

/// One asset's balance. Venues may omit any of the three figures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VenueBalanceEntry {
    pub free: Option<f64>,
    pub used: Option<f64>,
    pub total: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueBalances {
    pub assets: BTreeMap<String, VenueBalanceEntry>,
    pub timestamp: Option<i64>,
    pub info: Value,
}

/// An order as the venue reports it. `status` uses the unified vocabulary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueOrder {
    pub id: String,
    pub client_order_id: Option<String>,
    pub symbol: String,
    pub order_type: String,
    pub side: String,
    pub amount: Option<f64>,
    pub price: Option<f64>,
    pub status: Option<String>,
    pub filled: Option<f64>,
    pub remaining: Option<f64>,
    pub cost: Option<f64>,
    pub timestamp: Option<i64>,
    pub last_trade_timestamp: Option<i64>,
    pub info: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueOrderRequest {
    pub symbol: String,
    pub order_type: String,
    pub side: String,
    pub amount: f64,
    pub price: Option<f64>,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

impl VenueOrderRequest {
    pub fn new(
        symbol: impl Into<String>,
        order_type: impl Into<String>,
        side: impl Into<String>,
        amount: f64,
        price: Option<f64>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            order_type: order_type.into(),
            side: side.into(),
            amount,
            price,
            params: BTreeMap::new(),
        }
    }

    pub fn with_params(mut self, params: BTreeMap<String, Value>) -> Self {
        self.params = params;
        self
    }
}
