//! In-memory simulated venue.
//!
//! [`SimVenue`] implements [`HttpClient`] and answers the simulated venue's REST routes from
//! process memory, so a paper gateway can run with no server at all. Market orders fill at the
//! ticker's last price; limit orders fill when marketable and otherwise rest with their funds
//! reserved. The quote asset `USDT` starts funded with 10 000. Every request is recorded.
//!
//! Time is a logical clock starting at 2024-01-01T00:00:00Z and advancing one second per
//! state change, which keeps payloads reproducible.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde_json::{json, Map, Value};

use crate::http_client::{HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse};

const START_MILLIS: i64 = 1_704_067_200_000;
const TICK_MILLIS: i64 = 1_000;
const FUNDED_ASSET: &str = "USDT";
const FUNDED_AMOUNT: f64 = 10_000.0;

#[derive(Debug, Clone)]
struct SimTicker {
    last: f64,
    bid: f64,
    ask: f64,
    timestamp: i64,
}

#[derive(Debug, Clone, Copy, Default)]
struct Holding {
    free: f64,
    used: f64,
}

#[derive(Debug, Clone)]
struct SimOrder {
    id: u64,
    symbol: String,
    side: String,
    order_type: String,
    status: String,
    price: Option<f64>,
    amount: f64,
    filled: f64,
    cost: f64,
    created_at: i64,
    updated_at: i64,
}

impl SimOrder {
    fn remaining(&self) -> f64 {
        (self.amount - self.filled).max(0.0)
    }

    fn is_resting(&self) -> bool {
        matches!(self.status.as_str(), "new" | "partially_filled")
    }

    fn to_json(&self) -> Value {
        json!({
            "id": self.id.to_string(),
            "symbol": self.symbol,
            "side": self.side,
            "type": self.order_type,
            "status": self.status,
            "price": self.price,
            "amount": self.amount,
            "filled": self.filled,
            "remaining": self.remaining(),
            "cost": self.cost,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        })
    }
}

#[derive(Debug)]
struct SimState {
    clock: i64,
    next_order_id: u64,
    tickers: BTreeMap<String, SimTicker>,
    holdings: BTreeMap<String, Holding>,
    orders: BTreeMap<u64, SimOrder>,
    injected: Vec<Result<HttpResponse, HttpError>>,
}

impl SimState {
    fn tick(&mut self) -> i64 {
        self.clock += TICK_MILLIS;
        self.clock
    }

    fn holding(&mut self, asset: &str) -> &mut Holding {
        self.holdings.entry(asset.to_owned()).or_default()
    }

    fn free(&self, asset: &str) -> f64 {
        self.holdings.get(asset).map_or(0.0, |holding| holding.free)
    }
}

/// A simulated venue served from memory. See the module docs for its behavior.
#[derive(Debug)]
pub struct SimVenue {
    api_key: Option<String>,
    state: Mutex<SimState>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl Default for SimVenue {
    fn default() -> Self {
        Self::new()
    }
}

impl SimVenue {
    /// A venue that accepts any API key.
    pub fn new() -> Self {
        let mut holdings = BTreeMap::new();
        holdings.insert(
            String::from(FUNDED_ASSET),
            Holding {
                free: FUNDED_AMOUNT,
                used: 0.0,
            },
        );
        Self {
            api_key: None,
            state: Mutex::new(SimState {
                clock: START_MILLIS,
                next_order_id: 1,
                tickers: BTreeMap::new(),
                holdings,
                orders: BTreeMap::new(),
                injected: Vec::new(),
            }),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Rejects requests whose `x-api-key` header differs from `api_key` with 401.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Seeds a ticker quoted at `last` on both sides. Registers the market.
    pub fn set_ticker(&self, symbol: &str, last: f64) {
        self.set_quote(symbol, last, last, last);
    }

    pub fn set_quote(&self, symbol: &str, last: f64, bid: f64, ask: f64) {
        let mut state = self.state();
        let timestamp = state.tick();
        state.tickers.insert(
            symbol.to_owned(),
            SimTicker {
                last,
                bid,
                ask,
                timestamp,
            },
        );
    }

    pub fn set_balance(&self, asset: &str, free: f64, used: f64) {
        let mut state = self.state();
        *state.holding(asset) = Holding { free, used };
    }

    /// Fills `amount` more of a resting order at its limit price.
    pub fn fill_order(&self, id: &str, amount: f64) -> bool {
        let mut state = self.state();
        let now = state.tick();
        let Some(order) = id
            .parse::<u64>()
            .ok()
            .and_then(|id| state.orders.get(&id))
            .filter(|order| order.is_resting())
            .cloned()
        else {
            return false;
        };

        let amount = amount.min(order.remaining());
        let price = order.price.unwrap_or(0.0);
        let (base, quote) = split_pair(&order.symbol);
        if order.side == "buy" {
            state.holding(quote).used -= amount * price;
            state.holding(base).free += amount;
        } else {
            state.holding(base).used -= amount;
            state.holding(quote).free += amount * price;
        }

        let mut updated = order;
        updated.filled += amount;
        updated.cost += amount * price;
        updated.updated_at = now;
        updated.status = if updated.remaining() <= f64::EPSILON {
            String::from("filled")
        } else {
            String::from("partially_filled")
        };
        state.orders.insert(updated.id, updated);
        true
    }

    /// Overwrites an order's native status verbatim, including values the venue never emits.
    pub fn set_order_status(&self, id: &str, status: &str) -> bool {
        let mut state = self.state();
        let Ok(key) = id.parse::<u64>() else {
            return false;
        };
        match state.orders.get_mut(&key) {
            Some(order) => {
                order.status = status.to_owned();
                true
            }
            None => false,
        }
    }

    /// Queues a canned outcome returned (and recorded) ahead of the routed response.
    pub fn inject(&self, outcome: Result<HttpResponse, HttpError>) {
        self.state().injected.push(outcome);
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn handle(&self, request: &HttpRequest) -> Result<HttpResponse, HttpError> {
        if let Some(expected) = &self.api_key {
            if request.headers.get("x-api-key") != Some(expected) {
                return Ok(reply(401, json!({"detail": "invalid API key"})));
            }
        }

        let mut state = self.state();
        if !state.injected.is_empty() {
            return state.injected.remove(0);
        }

        let (path, query) = split_query(request.path());
        let segments = path
            .trim_matches('/')
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                urlencoding::decode(segment)
                    .map(|decoded| decoded.into_owned())
                    .unwrap_or_else(|_| segment.to_owned())
            })
            .collect::<Vec<_>>();
        let segments = segments.iter().map(String::as_str).collect::<Vec<_>>();
        let body = request
            .body
            .as_deref()
            .and_then(|body| serde_json::from_str::<Value>(body).ok())
            .unwrap_or(Value::Null);

        let response = match (request.method, segments.as_slice()) {
            (HttpMethod::Get, ["tickers"]) => list_tickers(&state),
            (HttpMethod::Get, ["tickers", rest @ ..]) => get_tickers(&state, &rest.join("/")),
            (HttpMethod::Get, ["balance"]) => full_balance(&state),
            (HttpMethod::Get, ["balance", "list"]) => balance_list(&state),
            (HttpMethod::Get, ["balance", asset]) => asset_balance(&state, asset),
            (HttpMethod::Post, ["balance", asset, "deposit"]) => {
                transfer(&mut state, asset, &body, true)
            }
            (HttpMethod::Post, ["balance", asset, "withdrawal"]) => {
                transfer(&mut state, asset, &body, false)
            }
            (HttpMethod::Get, ["orders"]) => list_orders(&state, &query),
            (HttpMethod::Post, ["orders"]) => create_order(&mut state, &body),
            (HttpMethod::Post, ["orders", "can_execute"]) => can_execute(&state, &body),
            (HttpMethod::Get, ["orders", id]) => match find_order(&state, id) {
                Some(order) => reply(200, order.to_json()),
                None => not_found(format!("order {id} not found")),
            },
            (HttpMethod::Post, ["orders", id, "cancel"]) => cancel_order(&mut state, id),
            _ => not_found(format!("no route for {} {path}", request.method.as_str())),
        };
        Ok(response)
    }
}

impl HttpClient for SimVenue {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            let outcome = self.handle(&request);
            self.requests
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(request);
            outcome
        })
    }
}

fn reply(status: u16, body: Value) -> HttpResponse {
    HttpResponse::new(status, body.to_string())
}

fn not_found(detail: String) -> HttpResponse {
    reply(404, json!({ "detail": detail }))
}

fn bad_request(detail: String) -> HttpResponse {
    reply(400, json!({ "detail": detail }))
}

fn split_query(path: &str) -> (&str, BTreeMap<String, String>) {
    let Some((path, query)) = path.split_once('?') else {
        return (path, BTreeMap::new());
    };
    let pairs = query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(key, value)| {
            let value = urlencoding::decode(value)
                .map(|decoded| decoded.into_owned())
                .unwrap_or_else(|_| value.to_owned());
            (key.to_owned(), value)
        })
        .collect();
    (path, pairs)
}

fn split_pair(symbol: &str) -> (&str, &str) {
    symbol.split_once('/').unwrap_or((symbol, FUNDED_ASSET))
}

fn ticker_json(symbol: &str, ticker: &SimTicker) -> Value {
    json!({
        "symbol": symbol,
        "timestamp": ticker.timestamp,
        "bid": ticker.bid,
        "bid_volume": 1.0,
        "ask": ticker.ask,
        "ask_volume": 1.0,
        "last": ticker.last,
    })
}

fn list_tickers(state: &SimState) -> HttpResponse {
    reply(200, json!(state.tickers.keys().collect::<Vec<_>>()))
}

fn get_tickers(state: &SimState, requested: &str) -> HttpResponse {
    if !requested.contains(',') {
        return match state.tickers.get(requested) {
            Some(ticker) => reply(200, ticker_json(requested, ticker)),
            None => not_found(format!("ticker {requested} not found")),
        };
    }

    let batch = requested
        .split(',')
        .filter_map(|symbol| {
            state
                .tickers
                .get(symbol)
                .map(|ticker| (symbol.to_owned(), ticker_json(symbol, ticker)))
        })
        .collect::<Map<_, _>>();
    reply(200, Value::Object(batch))
}

fn holding_json(asset: &str, holding: Holding) -> Value {
    json!({
        "asset": asset,
        "free": holding.free,
        "used": holding.used,
        "total": holding.free + holding.used,
    })
}

fn full_balance(state: &SimState) -> HttpResponse {
    let assets = state
        .holdings
        .iter()
        .map(|(asset, holding)| holding_json(asset, *holding))
        .collect::<Vec<_>>();
    reply(200, json!({"timestamp": state.clock, "assets": assets}))
}

fn balance_list(state: &SimState) -> HttpResponse {
    let assets = state.holdings.keys().collect::<Vec<_>>();
    reply(200, json!({"length": assets.len(), "assets": assets}))
}

fn asset_balance(state: &SimState, asset: &str) -> HttpResponse {
    match state.holdings.get(asset) {
        Some(holding) => reply(200, holding_json(asset, *holding)),
        None => not_found(format!("asset {asset} not found")),
    }
}

fn positive_amount(body: &Value) -> Option<f64> {
    body.get("amount")
        .and_then(Value::as_f64)
        .filter(|amount| amount.is_finite() && *amount > 0.0)
}

fn transfer(state: &mut SimState, asset: &str, body: &Value, deposit: bool) -> HttpResponse {
    let Some(amount) = positive_amount(body) else {
        return bad_request(String::from("amount must be a positive number"));
    };
    state.tick();
    let holding = state.holding(asset);
    if deposit {
        holding.free += amount;
    } else if holding.free < amount {
        let free = holding.free;
        return reply(
            422,
            json!({"detail": format!("insufficient {asset}: need {amount}, have {free}")}),
        );
    } else {
        holding.free -= amount;
    }
    let snapshot = *holding;
    reply(200, holding_json(asset, snapshot))
}

struct Submission {
    symbol: String,
    side: String,
    order_type: String,
    amount: f64,
    limit_price: Option<f64>,
}

fn submission(state: &SimState, body: &Value) -> Result<(Submission, SimTicker), HttpResponse> {
    let text = |key: &str| body.get(key).and_then(Value::as_str).map(str::to_owned);
    let (Some(symbol), Some(side), Some(order_type)) = (text("symbol"), text("side"), text("type"))
    else {
        return Err(bad_request(String::from("symbol, side and type are required")));
    };
    let Some(amount) = positive_amount(body) else {
        return Err(bad_request(String::from("amount must be a positive number")));
    };
    if !matches!(side.as_str(), "buy" | "sell")
        || !matches!(order_type.as_str(), "market" | "limit")
    {
        return Err(bad_request(format!("unsupported order {order_type}/{side}")));
    }
    let limit_price = body.get("limit_price").and_then(Value::as_f64);
    if order_type == "limit" && limit_price.is_none() {
        return Err(bad_request(String::from("limit orders require limit_price")));
    }
    let Some(ticker) = state.tickers.get(&symbol).cloned() else {
        return Err(bad_request(format!("unknown symbol {symbol}")));
    };

    Ok((
        Submission {
            symbol,
            side,
            order_type,
            amount,
            limit_price,
        },
        ticker,
    ))
}

/// (marketable, execution price, funds needed, funds asset, free funds)
fn assess(
    state: &SimState,
    order: &Submission,
    ticker: &SimTicker,
) -> (bool, f64, f64, String, f64) {
    let (base, quote) = split_pair(&order.symbol);
    let buy = order.side == "buy";
    let marketable = match order.limit_price {
        None => true,
        Some(limit) if buy => limit >= ticker.ask,
        Some(limit) => limit <= ticker.bid,
    };
    let price = order.limit_price.unwrap_or(ticker.last);
    if buy {
        (marketable, price, order.amount * price, quote.to_owned(), state.free(quote))
    } else {
        (marketable, price, order.amount, base.to_owned(), state.free(base))
    }
}

fn can_execute(state: &SimState, body: &Value) -> HttpResponse {
    let (order, ticker) = match submission(state, body) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    let (_, _, needed, asset, free) = assess(state, &order, &ticker);
    if free + f64::EPSILON < needed {
        reply(
            200,
            json!({
                "can_execute": false,
                "reason": format!("insufficient {asset}: need {needed}, have {free}"),
            }),
        )
    } else {
        reply(200, json!({"can_execute": true}))
    }
}

fn create_order(state: &mut SimState, body: &Value) -> HttpResponse {
    let (order, ticker) = match submission(state, body) {
        Ok(parsed) => parsed,
        Err(response) => return response,
    };
    let (marketable, price, needed, asset, free) = assess(state, &order, &ticker);
    if free + f64::EPSILON < needed {
        return reply(
            422,
            json!({"detail": format!("insufficient {asset}: need {needed}, have {free}")}),
        );
    }

    let now = state.tick();
    let id = state.next_order_id;
    state.next_order_id += 1;
    let (base, quote) = split_pair(&order.symbol);
    let (base, quote) = (base.to_owned(), quote.to_owned());
    let buy = order.side == "buy";

    if marketable {
        let cost = order.amount * price;
        if buy {
            state.holding(&quote).free -= cost;
            state.holding(&base).free += order.amount;
        } else {
            state.holding(&base).free -= order.amount;
            state.holding(&quote).free += cost;
        }
    } else {
        let holding = state.holding(&asset);
        holding.free -= needed;
        holding.used += needed;
    }

    let record = SimOrder {
        id,
        symbol: order.symbol,
        side: order.side,
        order_type: order.order_type,
        status: String::from(if marketable { "filled" } else { "new" }),
        price: Some(price),
        amount: order.amount,
        filled: if marketable { order.amount } else { 0.0 },
        cost: if marketable { order.amount * price } else { 0.0 },
        created_at: now,
        updated_at: now,
    };
    let rendered = record.to_json();
    state.orders.insert(id, record);
    reply(200, rendered)
}

fn find_order<'a>(state: &'a SimState, id: &str) -> Option<&'a SimOrder> {
    id.parse::<u64>().ok().and_then(|id| state.orders.get(&id))
}

fn list_orders(state: &SimState, query: &BTreeMap<String, String>) -> HttpResponse {
    let symbol = query.get("symbol");
    let side = query.get("side");
    let mut rows = state
        .orders
        .values()
        .filter(|order| symbol.map_or(true, |symbol| &order.symbol == symbol))
        .filter(|order| side.map_or(true, |side| &order.side == side))
        .map(SimOrder::to_json)
        .collect::<Vec<_>>();
    if let Some(tail) = query.get("tail").and_then(|tail| tail.parse::<usize>().ok()) {
        let skip = rows.len().saturating_sub(tail);
        rows.drain(..skip);
    }
    reply(200, Value::Array(rows))
}

fn cancel_order(state: &mut SimState, id: &str) -> HttpResponse {
    let Some(order) = find_order(state, id).cloned() else {
        return not_found(format!("order {id} not found"));
    };
    if !order.is_resting() {
        return bad_request(format!("order {id} is already {}", order.status));
    }

    let now = state.tick();
    let remaining = order.remaining();
    let (base, quote) = split_pair(&order.symbol);
    let (asset, released) = if order.side == "buy" {
        (quote.to_owned(), remaining * order.price.unwrap_or(0.0))
    } else {
        (base.to_owned(), remaining)
    };
    let holding = state.holding(&asset);
    holding.used -= released;
    holding.free += released;

    let mut canceled = order;
    canceled.status = String::from(if canceled.filled > 0.0 {
        "partially_canceled"
    } else {
        "canceled"
    });
    canceled.updated_at = now;
    let rendered = canceled.to_json();
    state.orders.insert(canceled.id, canceled);
    reply(200, json!({ "canceled_order": rendered }))
}
