//! Binance spot REST payloads and their conversion into native venue shapes.

use serde::Deserialize;
use serde_json::Value;

use crate::error::VenueError;
use crate::model::{
    VenueBalanceEntry, VenueBalances, VenueCandle, VenueMarket, VenueOrder, VenueOrderBook,
    VenueTicker, VenueTrade,
};

#[derive(Debug, Deserialize)]
pub(crate) struct ApiError {
    pub code: i64,
    pub msg: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExchangeInfo {
    pub symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SymbolInfo {
    pub symbol: String,
    pub status: String,
    pub base_asset: String,
    pub quote_asset: String,
    #[serde(default)]
    pub filters: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Ticker24h {
    pub symbol: String,
    pub price_change: Option<String>,
    pub price_change_percent: Option<String>,
    pub last_price: Option<String>,
    pub bid_price: Option<String>,
    pub bid_qty: Option<String>,
    pub ask_price: Option<String>,
    pub ask_qty: Option<String>,
    pub open_price: Option<String>,
    pub high_price: Option<String>,
    pub low_price: Option<String>,
    pub volume: Option<String>,
    pub quote_volume: Option<String>,
    pub close_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Depth {
    pub last_update_id: u64,
    pub bids: Vec<(String, String)>,
    pub asks: Vec<(String, String)>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PublicTrade {
    pub id: u64,
    pub price: String,
    pub qty: String,
    pub quote_qty: Option<String>,
    pub time: i64,
    pub is_buyer_maker: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Account {
    pub update_time: Option<i64>,
    pub balances: Vec<AccountBalance>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AccountBalance {
    pub asset: String,
    pub free: String,
    pub locked: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Order {
    pub symbol: String,
    pub order_id: u64,
    pub client_order_id: Option<String>,
    pub price: String,
    pub orig_qty: String,
    pub executed_qty: String,
    pub cummulative_quote_qty: Option<String>,
    pub status: String,
    #[serde(rename = "type")]
    pub order_type: String,
    pub side: String,
    pub time: Option<i64>,
    pub transact_time: Option<i64>,
    pub update_time: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct MyTrade {
    pub id: u64,
    pub order_id: u64,
    pub price: String,
    pub qty: String,
    pub quote_qty: Option<String>,
    pub time: i64,
    pub is_buyer: bool,
    pub is_maker: bool,
}

pub(crate) fn decode<T>(value: Value, what: &str) -> Result<T, VenueError>
where
    T: for<'de> Deserialize<'de>,
{
    serde_json::from_value(value)
        .map_err(|error| VenueError::decode(format!("{what}: {error}")))
}

/// Maps a Binance error code to a venue error.
pub(crate) fn error_from_code(code: i64, msg: &str, http_status: u16) -> VenueError {
    let message = msg.to_owned();
    match code {
        -1002 | -2014 | -2015 => VenueError::Authentication { message },
        -2010 if msg.to_ascii_lowercase().contains("insufficient") => {
            VenueError::InsufficientBalance { message }
        }
        -2010 | -1013 | -1111 | -1115 | -1116 | -1117 | -2026 => {
            VenueError::InvalidOrder { message }
        }
        -1121 => VenueError::BadSymbol { message },
        -2011 | -2013 => VenueError::OrderNotFound { message },
        -1003 => VenueError::RateLimited { message },
        -1001 => VenueError::Unavailable { message },
        -1021 | -1022 => VenueError::Network { message },
        -1106..=-1100 => VenueError::BadRequest { message },
        _ => error_from_status(http_status, msg).unwrap_or(VenueError::Exchange { code, message }),
    }
}

/// Maps an HTTP status when the body carries no Binance error code.
pub(crate) fn error_from_status(http_status: u16, body: &str) -> Option<VenueError> {
    let message = if body.trim().is_empty() {
        format!("HTTP {http_status}")
    } else {
        body.to_owned()
    };
    match http_status {
        401 | 403 => Some(VenueError::Authentication { message }),
        418 | 429 => Some(VenueError::RateLimited { message }),
        500..=599 => Some(VenueError::Unavailable { message }),
        _ => None,
    }
}

/// Translates Binance order statuses into the unified vocabulary.
pub(crate) fn unified_status(raw: &str) -> String {
    match raw {
        "NEW" | "PARTIALLY_FILLED" => "open",
        "FILLED" => "closed",
        "CANCELED" => "canceled",
        "PENDING_CANCEL" | "PENDING_NEW" => "pending",
        "REJECTED" => "rejected",
        "EXPIRED" | "EXPIRED_IN_MATCH" => "expired",
        other => return other.to_ascii_lowercase(),
    }
    .to_owned()
}

pub(crate) fn number(raw: &str, field: &str) -> Result<f64, VenueError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| VenueError::decode(format!("field '{field}' is not a number: {raw}")))
}

fn optional_number(raw: Option<&String>, field: &str) -> Result<Option<f64>, VenueError> {
    raw.map(|value| number(value, field)).transpose()
}

/// Number of decimals a step size such as `0.00010000` allows.
fn decimals_of(step: &str) -> Option<u32> {
    let trimmed = step.trim_end_matches('0');
    let (_, fraction) = trimmed.split_once('.')?;
    u32::try_from(fraction.len()).ok()
}

fn filter<'a>(filters: &'a [Value], filter_type: &str) -> Option<&'a Value> {
    filters
        .iter()
        .find(|entry| entry.get("filterType").and_then(Value::as_str) == Some(filter_type))
}

fn filter_number(entry: Option<&Value>, key: &str) -> Option<f64> {
    entry
        .and_then(|value| value.get(key))
        .and_then(Value::as_str)
        .and_then(|raw| raw.parse::<f64>().ok())
}

pub(crate) fn market(info: SymbolInfo, raw: Value) -> VenueMarket {
    let lot_size = filter(&info.filters, "LOT_SIZE");
    let price_filter = filter(&info.filters, "PRICE_FILTER");
    let notional =
        filter(&info.filters, "NOTIONAL").or_else(|| filter(&info.filters, "MIN_NOTIONAL"));

    VenueMarket {
        symbol: format!("{}/{}", info.base_asset, info.quote_asset),
        id: info.symbol,
        active: info.status == "TRADING",
        amount_precision: lot_size
            .and_then(|value| value.get("stepSize"))
            .and_then(Value::as_str)
            .and_then(decimals_of),
        price_precision: price_filter
            .and_then(|value| value.get("tickSize"))
            .and_then(Value::as_str)
            .and_then(decimals_of),
        min_amount: filter_number(lot_size, "minQty"),
        max_amount: filter_number(lot_size, "maxQty"),
        min_cost: filter_number(notional, "minNotional"),
        base: info.base_asset,
        quote: info.quote_asset,
        info: raw,
    }
}

pub(crate) fn ticker(
    symbol: String,
    wire: Ticker24h,
    raw: Value,
) -> Result<VenueTicker, VenueError> {
    let last = optional_number(wire.last_price.as_ref(), "lastPrice")?;
    Ok(VenueTicker {
        symbol,
        timestamp: wire.close_time,
        last,
        bid: optional_number(wire.bid_price.as_ref(), "bidPrice")?,
        bid_volume: optional_number(wire.bid_qty.as_ref(), "bidQty")?,
        ask: optional_number(wire.ask_price.as_ref(), "askPrice")?,
        ask_volume: optional_number(wire.ask_qty.as_ref(), "askQty")?,
        high: optional_number(wire.high_price.as_ref(), "highPrice")?,
        low: optional_number(wire.low_price.as_ref(), "lowPrice")?,
        open: optional_number(wire.open_price.as_ref(), "openPrice")?,
        close: last,
        base_volume: optional_number(wire.volume.as_ref(), "volume")?,
        quote_volume: optional_number(wire.quote_volume.as_ref(), "quoteVolume")?,
        change: optional_number(wire.price_change.as_ref(), "priceChange")?,
        percentage: optional_number(wire.price_change_percent.as_ref(), "priceChangePercent")?,
        info: raw,
    })
}

pub(crate) fn candle(row: &[Value]) -> Result<VenueCandle, VenueError> {
    let timestamp = row
        .first()
        .and_then(Value::as_i64)
        .ok_or_else(|| VenueError::decode("kline row has no open time"))?;
    let column = |index: usize, name: &str| -> Result<f64, VenueError> {
        let raw = row
            .get(index)
            .and_then(Value::as_str)
            .ok_or_else(|| VenueError::decode(format!("kline row has no {name}")))?;
        number(raw, name)
    };

    Ok(VenueCandle {
        timestamp,
        open: column(1, "open")?,
        high: column(2, "high")?,
        low: column(3, "low")?,
        close: column(4, "close")?,
        volume: column(5, "volume")?,
    })
}

pub(crate) fn order_book(symbol: String, wire: Depth) -> Result<VenueOrderBook, VenueError> {
    let levels = |side: Vec<(String, String)>| -> Result<Vec<(f64, f64)>, VenueError> {
        side.iter()
            .map(|(price, amount)| Ok((number(price, "price")?, number(amount, "amount")?)))
            .collect()
    };

    Ok(VenueOrderBook {
        symbol,
        bids: levels(wire.bids)?,
        asks: levels(wire.asks)?,
        timestamp: None,
        nonce: Some(wire.last_update_id),
    })
}

pub(crate) fn public_trade(
    symbol: &str,
    wire: PublicTrade,
    raw: Value,
) -> Result<VenueTrade, VenueError> {
    let price = number(&wire.price, "price")?;
    let amount = number(&wire.qty, "qty")?;
    Ok(VenueTrade {
        id: wire.id.to_string(),
        order_id: None,
        symbol: symbol.to_owned(),
        // a maker buyer means the aggressor sold
        side: Some(String::from(if wire.is_buyer_maker { "sell" } else { "buy" })),
        price,
        amount,
        cost: optional_number(wire.quote_qty.as_ref(), "quoteQty")?.or(Some(price * amount)),
        timestamp: Some(wire.time),
        taker_or_maker: None,
        info: raw,
    })
}

pub(crate) fn my_trade(symbol: &str, wire: MyTrade, raw: Value) -> Result<VenueTrade, VenueError> {
    let price = number(&wire.price, "price")?;
    let amount = number(&wire.qty, "qty")?;
    Ok(VenueTrade {
        id: wire.id.to_string(),
        order_id: Some(wire.order_id.to_string()),
        symbol: symbol.to_owned(),
        side: Some(String::from(if wire.is_buyer { "buy" } else { "sell" })),
        price,
        amount,
        cost: optional_number(wire.quote_qty.as_ref(), "quoteQty")?.or(Some(price * amount)),
        timestamp: Some(wire.time),
        taker_or_maker: Some(String::from(if wire.is_maker { "maker" } else { "taker" })),
        info: raw,
    })
}

pub(crate) fn balances(wire: Account, raw: Value) -> Result<VenueBalances, VenueError> {
    let mut assets = std::collections::BTreeMap::new();
    for balance in wire.balances {
        let entry = VenueBalanceEntry {
            free: Some(number(&balance.free, "free")?),
            used: Some(number(&balance.locked, "locked")?),
            total: None,
        };
        assets.insert(balance.asset, entry);
    }

    Ok(VenueBalances {
        assets,
        timestamp: wire.update_time,
        info: raw,
    })
}

pub(crate) fn order(symbol: String, wire: Order, raw: Value) -> Result<VenueOrder, VenueError> {
    let amount = number(&wire.orig_qty, "origQty")?;
    let filled = number(&wire.executed_qty, "executedQty")?;
    let cost = optional_number(wire.cummulative_quote_qty.as_ref(), "cummulativeQuoteQty")?;
    let limit_price = number(&wire.price, "price")?;
    // market orders report price 0; fall back to the average fill price
    let price = if limit_price > 0.0 {
        Some(limit_price)
    } else {
        cost.filter(|_| filled > 0.0).map(|cost| cost / filled)
    };

    Ok(VenueOrder {
        id: wire.order_id.to_string(),
        client_order_id: wire.client_order_id,
        symbol,
        order_type: wire.order_type.to_ascii_lowercase(),
        side: wire.side.to_ascii_lowercase(),
        amount: Some(amount),
        price,
        status: Some(unified_status(&wire.status)),
        filled: Some(filled),
        remaining: Some((amount - filled).max(0.0)),
        cost,
        timestamp: wire.time.or(wire.transact_time),
        last_trade_timestamp: wire.update_time,
        info: raw,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn maps_documented_error_codes() {
        assert!(matches!(
            error_from_code(-2010, "Account has insufficient balance for requested action.", 400),
            VenueError::InsufficientBalance { .. }
        ));
        assert!(matches!(
            error_from_code(-2010, "Order would immediately match and take.", 400),
            VenueError::InvalidOrder { .. }
        ));
        assert!(matches!(
            error_from_code(-2013, "Order does not exist.", 400),
            VenueError::OrderNotFound { .. }
        ));
        assert!(matches!(
            error_from_code(-2015, "Invalid API-key, IP, or permissions for action.", 401),
            VenueError::Authentication { .. }
        ));
        assert!(matches!(
            error_from_code(-1121, "Invalid symbol.", 400),
            VenueError::BadSymbol { .. }
        ));
        assert!(matches!(
            error_from_code(-1102, "Mandatory parameter 'quantity' was not sent.", 400),
            VenueError::BadRequest { .. }
        ));
        assert_eq!(
            error_from_code(-9999, "odd", 400),
            VenueError::Exchange {
                code: -9999,
                message: String::from("odd")
            }
        );
    }

    #[test]
    fn unknown_codes_fall_back_to_http_status() {
        assert!(matches!(
            error_from_code(-9999, "busy", 503),
            VenueError::Unavailable { .. }
        ));
        assert!(matches!(
            error_from_status(429, ""),
            Some(VenueError::RateLimited { .. })
        ));
        assert_eq!(error_from_status(400, "nope"), None);
    }

    #[test]
    fn partially_filled_orders_stay_open_with_fill_progress() {
        let raw = json!({
            "symbol": "BTCUSDT",
            "orderId": 28,
            "clientOrderId": "abc",
            "price": "30000.00",
            "origQty": "2.00000000",
            "executedQty": "0.50000000",
            "cummulativeQuoteQty": "15000.00",
            "status": "PARTIALLY_FILLED",
            "type": "LIMIT",
            "side": "BUY",
            "time": 1_700_000_000_000_i64,
            "updateTime": 1_700_000_000_500_i64
        });
        let wire: Order = decode(raw.clone(), "order").expect("order decodes");

        let order = order(String::from("BTC/USDT"), wire, raw).expect("order converts");

        assert_eq!(order.id, "28");
        assert_eq!(order.status.as_deref(), Some("open"));
        assert_eq!(order.filled, Some(0.5));
        assert_eq!(order.remaining, Some(1.5));
        assert_eq!(order.order_type, "limit");
        assert_eq!(order.side, "buy");
        assert_eq!(order.timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn market_orders_report_average_fill_price() {
        let raw = json!({
            "symbol": "ETHUSDT",
            "orderId": 7,
            "price": "0.00000000",
            "origQty": "2.0",
            "executedQty": "2.0",
            "cummulativeQuoteQty": "4000.0",
            "status": "FILLED",
            "type": "MARKET",
            "side": "SELL",
            "transactTime": 1_700_000_000_000_i64
        });
        let wire: Order = decode(raw.clone(), "order").expect("order decodes");

        let order = order(String::from("ETH/USDT"), wire, raw).expect("order converts");

        assert_eq!(order.price, Some(2000.0));
        assert_eq!(order.status.as_deref(), Some("closed"));
        assert_eq!(order.timestamp, Some(1_700_000_000_000));
    }

    #[test]
    fn market_filters_become_precision_and_limits() {
        let raw = json!({
            "symbol": "BTCUSDT",
            "status": "TRADING",
            "baseAsset": "BTC",
            "quoteAsset": "USDT",
            "filters": [
                {"filterType": "PRICE_FILTER", "tickSize": "0.01000000"},
                {"filterType": "LOT_SIZE", "minQty": "0.00001000", "maxQty": "9000.00000000", "stepSize": "0.00001000"},
                {"filterType": "NOTIONAL", "minNotional": "5.00000000"}
            ]
        });
        let info: SymbolInfo = decode(raw.clone(), "symbol").expect("symbol decodes");

        let market = market(info, raw);

        assert_eq!(market.symbol, "BTC/USDT");
        assert_eq!(market.id, "BTCUSDT");
        assert!(market.active);
        assert_eq!(market.amount_precision, Some(5));
        assert_eq!(market.price_precision, Some(2));
        assert_eq!(market.min_amount, Some(0.00001));
        assert_eq!(market.min_cost, Some(5.0));
    }

    #[test]
    fn balances_leave_total_for_the_caller_to_derive() {
        let raw = json!({
            "updateTime": 123,
            "balances": [{"asset": "BTC", "free": "1.5", "locked": "0.5"}]
        });
        let wire: Account = decode(raw.clone(), "account").expect("account decodes");

        let balances = balances(wire, raw).expect("balances convert");

        let btc = balances.assets.get("BTC").expect("BTC present");
        assert_eq!(btc.free, Some(1.5));
        assert_eq!(btc.used, Some(0.5));
        assert_eq!(btc.total, None);
        assert_eq!(balances.timestamp, Some(123));
    }

    #[test]
    fn kline_rows_need_numeric_columns() {
        let row = vec![
            json!(1_000),
            json!("1"),
            json!("2"),
            json!("0.5"),
            json!("1.5"),
            json!("10"),
        ];
        let candle = candle(&row).expect("row converts");
        assert_eq!(candle.high, 2.0);
        assert_eq!(candle.volume, 10.0);

        let broken = vec![json!(1_000), json!("x")];
        assert!(matches!(candle_err(&broken), VenueError::Decode { .. }));
    }

    fn candle_err(row: &[Value]) -> VenueError {
        candle(row).expect_err("row should not convert")
    }
}
