//! Simulated-venue payloads.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use super::fields::Fields;
use super::{datetime_of, derive_balance_entry, map_native_status};
use crate::domain::{
    Balance, BalanceList, ExecutionCheck, Market, Order, OrderSide, OrderStatus, OrderType,
    Symbol, Ticker, TransferReceipt,
};
use crate::GatewayError;

fn symbol_of(raw: &str) -> Result<Symbol, GatewayError> {
    Symbol::parse(raw)
        .map_err(|error| GatewayError::mapping(format!("backend symbol '{raw}': {error}")))
}

/// The venue's symbol universe from `GET /tickers`: bare strings or objects with a `symbol`.
pub fn symbol_universe(body: &Value) -> Result<Vec<Symbol>, GatewayError> {
    let entries = body.as_array().ok_or_else(|| {
        GatewayError::mapping("ticker listing is not a JSON array").with_info(body.clone())
    })?;

    let mut seen = BTreeSet::new();
    let mut symbols = Vec::with_capacity(entries.len());
    for entry in entries {
        let raw = match entry {
            Value::String(raw) => raw.as_str(),
            other => Fields::new("ticker listing entry", other)?.str("symbol")?,
        };
        let symbol = symbol_of(raw)?;
        if seen.insert(symbol.clone()) {
            symbols.push(symbol);
        }
    }
    Ok(symbols)
}

/// Markets derived from the symbol universe; the venue publishes no further metadata.
pub fn markets(symbols: &[Symbol]) -> BTreeMap<Symbol, Market> {
    symbols
        .iter()
        .map(|symbol| {
            let info = serde_json::json!({ "symbol": symbol.as_str() });
            (symbol.clone(), Market::spot(symbol.as_str(), symbol.clone(), info))
        })
        .collect()
}

/// Maps one ticker body. `fallback` names the symbol when the body omits it.
pub fn ticker(raw: &Value, fallback: Option<&Symbol>) -> Result<Ticker, GatewayError> {
    let fields = Fields::new("ticker", raw)?;
    let symbol = match (fields.opt_str("symbol")?, fallback) {
        (Some(raw_symbol), _) => symbol_of(raw_symbol)?,
        (None, Some(symbol)) => symbol.clone(),
        (None, None) => {
            return Err(GatewayError::mapping("ticker payload has no 'symbol' field")
                .with_info(raw.clone()))
        }
    };
    let timestamp = fields.opt_millis("timestamp")?;
    let last = fields.opt_f64("last")?;

    Ok(Ticker {
        symbol,
        last,
        bid: fields.opt_f64("bid")?,
        ask: fields.opt_f64("ask")?,
        bid_volume: fields.opt_f64("bid_volume")?,
        ask_volume: fields.opt_f64("ask_volume")?,
        high: fields.opt_f64("high")?,
        low: fields.opt_f64("low")?,
        open: fields.opt_f64("open")?,
        close: fields.opt_f64("close")?.or(last),
        base_volume: fields.opt_f64("base_volume")?,
        quote_volume: fields.opt_f64("quote_volume")?,
        change: fields.opt_f64("change")?,
        percentage: fields.opt_f64("percentage")?,
        timestamp,
        datetime: datetime_of(timestamp)?,
        info: raw.clone(),
    })
}

/// A single-ticker response, which may be the body itself or `{symbol: body}`.
pub fn single_ticker(requested: &Symbol, body: &Value) -> Result<Ticker, GatewayError> {
    match body.get(requested.as_str()) {
        Some(inner) if inner.is_object() => ticker(inner, Some(requested)),
        _ => ticker(body, Some(requested)),
    }
}

/// A one-symbol batch is answered by the single-ticker route with an unkeyed body.
fn is_bare_ticker(body: &Value) -> bool {
    body.get("symbol").is_some_and(Value::is_string)
        || body
            .as_object()
            .is_some_and(|entries| !entries.values().all(Value::is_object))
}

/// A batched ticker response keyed by symbol. Every requested symbol must be present.
pub fn ticker_batch(
    requested: &[Symbol],
    body: &Value,
) -> Result<BTreeMap<Symbol, Ticker>, GatewayError> {
    let mut tickers = BTreeMap::new();
    match body {
        Value::Object(_) if is_bare_ticker(body) => {
            let fallback = match requested {
                [only] => Some(only),
                _ => None,
            };
            let mapped = ticker(body, fallback)?;
            tickers.insert(mapped.symbol.clone(), mapped);
        }
        Value::Object(entries) => {
            for (key, inner) in entries {
                let key_symbol = symbol_of(key)?;
                let mapped = ticker(inner, Some(&key_symbol))?;
                tickers.insert(mapped.symbol.clone(), mapped);
            }
        }
        Value::Array(entries) => {
            for inner in entries {
                let mapped = ticker(inner, None)?;
                tickers.insert(mapped.symbol.clone(), mapped);
            }
        }
        other => {
            return Err(GatewayError::mapping("ticker batch is neither an object nor an array")
                .with_info(other.clone()))
        }
    }

    let mut missing = requested
        .iter()
        .filter(|symbol| !tickers.contains_key(*symbol))
        .map(Symbol::as_str)
        .collect::<Vec<_>>();
    if !missing.is_empty() {
        missing.sort_unstable();
        missing.dedup();
        return Err(GatewayError::bad_request(format!(
            "unknown symbol(s): {}",
            missing.join(", ")
        ))
        .with_info(body.clone()));
    }

    // keep only what was asked for
    tickers.retain(|symbol, _| requested.contains(symbol));
    Ok(tickers)
}

/// The native status string of an order body, used for the open-orders filter.
pub fn native_status(raw: &Value) -> Result<&str, GatewayError> {
    Fields::new("order", raw)?.str("status")
}

pub fn order(raw: &Value) -> Result<Order, GatewayError> {
    let fields = Fields::new("order", raw)?;
    let id = match fields.opt_id("id")? {
        Some(id) => id,
        None => fields
            .opt_id("oid")?
            .ok_or_else(|| {
                GatewayError::mapping("order payload has no 'id' field").with_info(raw.clone())
            })?,
    };
    let symbol = symbol_of(fields.str("symbol")?)?;
    let side = fields
        .str("side")?
        .parse::<OrderSide>()
        .map_err(|error| GatewayError::mapping(error.to_string()).with_info(raw.clone()))?;
    let order_type = fields
        .str("type")?
        .parse::<OrderType>()
        .map_err(|error| GatewayError::mapping(error.to_string()).with_info(raw.clone()))?;
    let status = map_native_status(fields.str("status")?)
        .map_err(|error| error.with_info(raw.clone()))?;
    let amount = fields.f64("amount")?;
    let (filled, remaining) = fill_progress(
        status,
        amount,
        fields.opt_f64("filled")?,
        fields.opt_f64("remaining")?,
    )
    .map_err(|error| error.with_info(raw.clone()))?;
    let timestamp = fields.opt_millis("created_at")?;

    Ok(Order {
        id,
        symbol,
        order_type,
        side,
        amount,
        price: fields.first_f64(&["price", "limit_price"])?,
        status,
        filled,
        remaining,
        cost: fields.opt_f64("cost")?,
        timestamp,
        datetime: datetime_of(timestamp)?,
        last_trade_timestamp: fields.opt_millis("updated_at")?,
        info: raw.clone(),
    })
}

fn fill_progress(
    status: OrderStatus,
    amount: f64,
    filled: Option<f64>,
    remaining: Option<f64>,
) -> Result<(f64, f64), GatewayError> {
    match (filled, remaining) {
        (Some(filled), Some(remaining)) => Ok((filled, remaining)),
        (Some(filled), None) => Ok((filled, (amount - filled).max(0.0))),
        (None, Some(remaining)) => Ok(((amount - remaining).max(0.0), remaining)),
        (None, None) if status == OrderStatus::Open => Ok((0.0, amount)),
        (None, None) => Err(GatewayError::mapping(format!(
            "{status} order reports neither filled nor remaining"
        ))),
    }
}

/// Cancel responses may wrap the order as `{canceled_order: body}`.
pub fn canceled_order(body: &Value) -> Result<Order, GatewayError> {
    match body.get("canceled_order") {
        Some(inner) if inner.is_object() => order(inner),
        _ => order(body),
    }
}

/// Order listings may be an array, `{orders: [...]}`, or a single order object.
pub fn order_rows(body: &Value) -> Result<Vec<Value>, GatewayError> {
    match body {
        Value::Array(rows) => Ok(rows.clone()),
        Value::Object(object) => match object.get("orders") {
            Some(Value::Array(rows)) => Ok(rows.clone()),
            _ => Ok(vec![body.clone()]),
        },
        other => Err(GatewayError::mapping("order listing is not JSON").with_info(other.clone())),
    }
}

/// `{timestamp?, assets: [{asset, free?, used?, total?}]}` or a single asset record.
pub fn balance(body: &Value) -> Result<Balance, GatewayError> {
    let fields = Fields::new("balance", body)?;
    let timestamp = fields.opt_millis("timestamp")?;

    let rows: Vec<&Value> = match body.get("assets") {
        Some(Value::Array(rows)) => rows.iter().collect(),
        Some(other) => {
            return Err(GatewayError::mapping("balance 'assets' is not an array")
                .with_info(other.clone()))
        }
        None if body.get("asset").is_some() => vec![body],
        None => Vec::new(),
    };

    let mut assets = BTreeMap::new();
    for row in rows {
        let entry_fields = Fields::new("balance entry", row)?;
        let asset = entry_fields.str("asset")?.to_ascii_uppercase();
        let entry = derive_balance_entry(
            &asset,
            entry_fields.opt_f64("free")?,
            entry_fields.opt_f64("used")?,
            entry_fields.opt_f64("total")?,
        )
        .map_err(|error| error.with_info(row.clone()))?;
        assets.insert(asset, entry);
    }

    Ok(Balance::new(
        assets,
        timestamp,
        datetime_of(timestamp)?,
        body.clone(),
    ))
}

pub fn balance_list(body: &Value) -> Result<BalanceList, GatewayError> {
    let rows = match body {
        Value::Array(rows) => rows,
        other => match other.get("assets") {
            Some(Value::Array(rows)) => rows,
            _ => {
                return Err(GatewayError::mapping("balance list has no 'assets' array")
                    .with_info(body.clone()))
            }
        },
    };

    let assets = rows
        .iter()
        .map(|row| match row {
            Value::String(asset) => Ok(asset.to_ascii_uppercase()),
            other => Fields::new("balance list entry", other)?
                .str("asset")
                .map(str::to_ascii_uppercase),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(BalanceList {
        assets,
        info: body.clone(),
    })
}

pub fn execution_check(body: &Value) -> Result<ExecutionCheck, GatewayError> {
    let fields = Fields::new("execution check", body)?;
    let can_execute = fields
        .opt_bool("can_execute")?
        .ok_or_else(|| {
            GatewayError::mapping("execution check has no 'can_execute' field")
                .with_info(body.clone())
        })?;

    Ok(ExecutionCheck {
        can_execute,
        reason: fields.opt_str("reason")?.map(str::to_owned),
        info: body.clone(),
    })
}

pub fn transfer_receipt(asset: &str, amount: f64, body: &Value) -> TransferReceipt {
    TransferReceipt {
        asset: asset.to_ascii_uppercase(),
        amount,
        info: body.clone(),
    }
}
