//! Live venue library shapes.

use std::collections::BTreeMap;

use mockx_venue::{
    VenueBalances, VenueCandle, VenueMarket, VenueOrder, VenueOrderBook, VenueTicker, VenueTrade,
};

use super::{datetime_of, derive_balance_entry};
use crate::domain::{
    Balance, Candle, Market, MarketLimits, MarketPrecision, Order, OrderBook, OrderSide,
    OrderStatus, OrderType, Symbol, Ticker, Trade,
};
use crate::GatewayError;

fn symbol_of(raw: &str) -> Result<Symbol, GatewayError> {
    Symbol::parse(raw)
        .map_err(|error| GatewayError::mapping(format!("venue symbol '{raw}': {error}")))
}

pub fn market(raw: VenueMarket) -> Result<Market, GatewayError> {
    let symbol = symbol_of(&raw.symbol)?;
    Ok(Market {
        id: raw.id,
        base: raw.base,
        quote: raw.quote,
        symbol,
        active: raw.active,
        market_type: "spot",
        precision: MarketPrecision {
            amount: raw.amount_precision,
            price: raw.price_precision,
        },
        limits: MarketLimits {
            amount_min: raw.min_amount,
            amount_max: raw.max_amount,
            cost_min: raw.min_cost,
        },
        info: raw.info,
    })
}

pub fn ticker(raw: VenueTicker) -> Result<Ticker, GatewayError> {
    Ok(Ticker {
        symbol: symbol_of(&raw.symbol)?,
        last: raw.last,
        bid: raw.bid,
        ask: raw.ask,
        bid_volume: raw.bid_volume,
        ask_volume: raw.ask_volume,
        high: raw.high,
        low: raw.low,
        open: raw.open,
        close: raw.close.or(raw.last),
        base_volume: raw.base_volume,
        quote_volume: raw.quote_volume,
        change: raw.change,
        percentage: raw.percentage,
        timestamp: raw.timestamp,
        datetime: datetime_of(raw.timestamp)?,
        info: raw.info,
    })
}

pub fn tickers(
    raw: BTreeMap<String, VenueTicker>,
) -> Result<BTreeMap<Symbol, Ticker>, GatewayError> {
    raw.into_values()
        .map(|entry| ticker(entry).map(|mapped| (mapped.symbol.clone(), mapped)))
        .collect()
}

/// Unified venue status to canonical. An `open` order with fills is `partially_filled`.
pub fn order_status(native: Option<&str>, filled: f64) -> Result<OrderStatus, GatewayError> {
    let native = native.ok_or_else(|| GatewayError::mapping("venue order has no status"))?;
    let status = match native.trim().to_ascii_lowercase().as_str() {
        "open" if filled > 0.0 => OrderStatus::PartiallyFilled,
        "open" => OrderStatus::Open,
        "partially_filled" => OrderStatus::PartiallyFilled,
        "closed" => OrderStatus::Closed,
        "canceled" => OrderStatus::Canceled,
        "expired" => OrderStatus::Expired,
        "rejected" => OrderStatus::Rejected,
        "pending" => OrderStatus::Pending,
        other => {
            return Err(GatewayError::mapping(format!(
                "unknown venue order status '{other}'"
            )))
        }
    };
    Ok(status)
}

pub fn order(raw: VenueOrder) -> Result<Order, GatewayError> {
    let reject = |error: GatewayError| error.with_info(raw.info.clone());

    let symbol = symbol_of(&raw.symbol).map_err(reject)?;
    let order_type = raw
        .order_type
        .parse::<OrderType>()
        .map_err(|error| reject(GatewayError::mapping(error.to_string())))?;
    let side = raw
        .side
        .parse::<OrderSide>()
        .map_err(|error| reject(GatewayError::mapping(error.to_string())))?;

    let amount = match (raw.amount, raw.filled, raw.remaining) {
        (Some(amount), _, _) => amount,
        (None, Some(filled), Some(remaining)) => filled + remaining,
        _ => {
            return Err(reject(GatewayError::mapping(format!(
                "venue order {} reports no amount",
                raw.id
            ))))
        }
    };
    let filled = raw
        .filled
        .or_else(|| raw.remaining.map(|remaining| (amount - remaining).max(0.0)))
        .unwrap_or(0.0);
    let remaining = raw.remaining.unwrap_or_else(|| (amount - filled).max(0.0));
    let status = order_status(raw.status.as_deref(), filled).map_err(reject)?;
    let datetime = datetime_of(raw.timestamp).map_err(reject)?;

    Ok(Order {
        id: raw.id,
        symbol,
        order_type,
        side,
        amount,
        price: raw.price,
        status,
        filled,
        remaining,
        cost: raw.cost,
        timestamp: raw.timestamp,
        datetime,
        last_trade_timestamp: raw.last_trade_timestamp,
        info: raw.info,
    })
}

pub fn orders(raw: Vec<VenueOrder>) -> Result<Vec<Order>, GatewayError> {
    raw.into_iter().map(order).collect()
}

pub fn balance(raw: VenueBalances) -> Result<Balance, GatewayError> {
    let mut assets = BTreeMap::new();
    for (asset, entry) in &raw.assets {
        let asset = asset.to_ascii_uppercase();
        let mapped = derive_balance_entry(&asset, entry.free, entry.used, entry.total)
            .map_err(|error| error.with_info(raw.info.clone()))?;
        assets.insert(asset, mapped);
    }
    let datetime = datetime_of(raw.timestamp)?;
    Ok(Balance::new(assets, raw.timestamp, datetime, raw.info))
}

pub fn candle(raw: VenueCandle) -> Candle {
    Candle {
        timestamp: raw.timestamp,
        open: raw.open,
        high: raw.high,
        low: raw.low,
        close: raw.close,
        volume: raw.volume,
    }
}

pub fn order_book(raw: VenueOrderBook) -> Result<OrderBook, GatewayError> {
    let levels = |side: Vec<(f64, f64)>| {
        side.into_iter()
            .map(|(price, amount)| [price, amount])
            .collect::<Vec<_>>()
    };
    Ok(OrderBook {
        symbol: symbol_of(&raw.symbol)?,
        bids: levels(raw.bids),
        asks: levels(raw.asks),
        timestamp: raw.timestamp,
        datetime: datetime_of(raw.timestamp)?,
        nonce: raw.nonce,
    })
}

pub fn trade(raw: VenueTrade) -> Result<Trade, GatewayError> {
    let side = raw
        .side
        .as_deref()
        .map(str::parse::<OrderSide>)
        .transpose()
        .map_err(|error| GatewayError::mapping(error.to_string()).with_info(raw.info.clone()))?;

    Ok(Trade {
        symbol: symbol_of(&raw.symbol)?,
        order: raw.order_id,
        side,
        price: raw.price,
        amount: raw.amount,
        cost: raw.cost.unwrap_or(raw.price * raw.amount),
        taker_or_maker: raw.taker_or_maker,
        timestamp: raw.timestamp,
        datetime: datetime_of(raw.timestamp)?,
        id: raw.id,
        info: raw.info,
    })
}

pub fn trades(raw: Vec<VenueTrade>) -> Result<Vec<Trade>, GatewayError> {
    raw.into_iter().map(trade).collect()
}
