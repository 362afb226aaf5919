//! Binance spot REST connector.

mod wire;

use std::collections::{BTreeMap, HashMap};
use std::num::NonZeroU32;
use std::sync::{Arc, RwLock};
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use hmac::{Hmac, Mac};
use reqwest::Method;
use serde_json::Value;
use sha2::Sha256;

use crate::client::VenueClient;
use crate::credentials::VenueCredentials;
use crate::error::VenueError;
use crate::model::{
    VenueBalances, VenueCandle, VenueMarket, VenueOrder, VenueOrderBook, VenueOrderRequest,
    VenueTicker, VenueTrade,
};
use crate::symbols::{join_symbol, split_symbol};

pub const MAINNET_URL: &str = "https://api.binance.com";
pub const TESTNET_URL: &str = "https://testnet.binance.vision";

const EXCHANGE_ID: &str = "binance";
const RECV_WINDOW_MS: u64 = 5_000;
const REQUESTS_PER_SECOND: u32 = 20;
const INTERVALS: [&str; 16] = [
    "1s", "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w",
    "1M",
];

type HmacSha256 = Hmac<Sha256>;
type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Binance spot client. Sandbox credentials target the public testnet.
pub struct BinanceSpot {
    credentials: VenueCredentials,
    base_url: String,
    http: reqwest::Client,
    limiter: Arc<DirectRateLimiter>,
    // venue id (BTCUSDT) -> unified symbol (BTC/USDT)
    symbols: RwLock<HashMap<String, String>>,
}

impl BinanceSpot {
    pub fn new(credentials: VenueCredentials) -> Result<Self, VenueError> {
        let base_url = if credentials.sandbox {
            TESTNET_URL
        } else {
            MAINNET_URL
        };
        Self::with_base_url(credentials, base_url)
    }

    /// Points the client at an arbitrary REST root, e.g. a local stub server.
    pub fn with_base_url(
        credentials: VenueCredentials,
        base_url: impl Into<String>,
    ) -> Result<Self, VenueError> {
        let http = reqwest::Client::builder()
            .timeout(credentials.timeout)
            .build()
            .map_err(|error| VenueError::Network {
                message: format!("failed to build http client: {error}"),
            })?;
        let per_second = NonZeroU32::new(REQUESTS_PER_SECOND).unwrap_or(NonZeroU32::MIN);

        Ok(Self {
            credentials,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            http,
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(per_second))),
            symbols: RwLock::new(HashMap::new()),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn sign(&self, query: &str) -> Result<String, VenueError> {
        let mut mac = HmacSha256::new_from_slice(self.credentials.secret.as_bytes()).map_err(
            |error| VenueError::Authentication {
                message: format!("unusable secret: {error}"),
            },
        )?;
        mac.update(query.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn build_query(params: &[(&str, String)]) -> String {
        params
            .iter()
            .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
    }

    async fn request(
        &self,
        method: Method,
        path: &str,
        mut params: Vec<(&str, String)>,
        signed: bool,
    ) -> Result<Value, VenueError> {
        self.limiter.until_ready().await;

        if signed {
            params.push(("recvWindow", RECV_WINDOW_MS.to_string()));
            params.push(("timestamp", now_ms().to_string()));
        }
        let mut query = Self::build_query(&params);
        if signed {
            let signature = self.sign(&query)?;
            query = if query.is_empty() {
                format!("signature={signature}")
            } else {
                format!("{query}&signature={signature}")
            };
        }

        let url = if query.is_empty() {
            format!("{}{path}", self.base_url)
        } else {
            format!("{}{path}?{query}", self.base_url)
        };
        tracing::debug!(method = %method, path, signed, "binance request");

        let mut builder = self.http.request(method, url);
        if signed {
            builder = builder.header("X-MBX-APIKEY", &self.credentials.api_key);
        }
        let response = builder.send().await.map_err(|error| self.transport_error(error))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|error| self.transport_error(error))?;

        if (200..300).contains(&status) {
            return serde_json::from_str(&body)
                .map_err(|error| VenueError::decode(format!("{path}: {error}")));
        }

        let error = match serde_json::from_str::<wire::ApiError>(&body) {
            Ok(api_error) => wire::error_from_code(api_error.code, &api_error.msg, status),
            Err(_) => wire::error_from_status(status, &body).unwrap_or(VenueError::Exchange {
                code: i64::from(status),
                message: body,
            }),
        };
        tracing::warn!(path, status, error = %error, "binance request failed");
        Err(error)
    }

    fn transport_error(&self, error: reqwest::Error) -> VenueError {
        if error.is_timeout() {
            let timeout_ms =
                u64::try_from(self.credentials.timeout.as_millis()).unwrap_or(u64::MAX);
            VenueError::Timeout { timeout_ms }
        } else {
            VenueError::Network {
                message: error.to_string(),
            }
        }
    }

    /// Unified symbol for a venue id, preferring loaded market metadata.
    fn unify(&self, venue_symbol: &str) -> Option<String> {
        let cached = match self.symbols.read() {
            Ok(symbols) => symbols.get(venue_symbol).cloned(),
            Err(_) => None,
        };
        cached.or_else(|| split_symbol(venue_symbol).map(|(base, quote)| format!("{base}/{quote}")))
    }

    fn has_markets(&self) -> bool {
        self.symbols
            .read()
            .map(|symbols| !symbols.is_empty())
            .unwrap_or(false)
    }

    fn require_symbol<'a>(symbol: Option<&'a str>, operation: &str) -> Result<&'a str, VenueError> {
        symbol.ok_or_else(|| VenueError::BadRequest {
            message: format!("{EXCHANGE_ID} {operation} requires a symbol argument"),
        })
    }

    fn orders_from(
        &self,
        value: Value,
        fallback_symbol: Option<&str>,
    ) -> Result<Vec<VenueOrder>, VenueError> {
        let rows = match value {
            Value::Array(rows) => rows,
            other => {
                return Err(VenueError::decode(format!(
                    "expected an order list, got {other}"
                )))
            }
        };
        rows.into_iter()
            .map(|raw| self.order_from(raw, fallback_symbol))
            .collect()
    }

    fn order_from(
        &self,
        raw: Value,
        fallback_symbol: Option<&str>,
    ) -> Result<VenueOrder, VenueError> {
        let parsed: wire::Order = wire::decode(raw.clone(), "order")?;
        let symbol = self
            .unify(&parsed.symbol)
            .or_else(|| fallback_symbol.map(str::to_owned))
            .unwrap_or_else(|| parsed.symbol.clone());
        wire::order(symbol, parsed, raw)
    }
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or_default()
}

fn format_amount(value: f64) -> String {
    // f64 Display never uses exponent notation
    value.to_string()
}

fn param_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[async_trait]
impl VenueClient for BinanceSpot {
    fn exchange_id(&self) -> &str {
        EXCHANGE_ID
    }

    fn sandbox(&self) -> bool {
        self.credentials.sandbox
    }

    async fn load_markets(&self) -> Result<Vec<VenueMarket>, VenueError> {
        let value = self
            .request(Method::GET, "/api/v3/exchangeInfo", Vec::new(), false)
            .await?;
        let raw_symbols = value
            .get("symbols")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut markets = Vec::with_capacity(raw_symbols.len());
        for raw in raw_symbols {
            let info: wire::SymbolInfo = wire::decode(raw.clone(), "exchangeInfo symbol")?;
            markets.push(wire::market(info, raw));
        }

        if let Ok(mut symbols) = self.symbols.write() {
            symbols.clear();
            symbols.extend(
                markets
                    .iter()
                    .map(|market| (market.id.clone(), market.symbol.clone())),
            );
        }
        tracing::debug!(count = markets.len(), "binance markets loaded");
        Ok(markets)
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<VenueTicker, VenueError> {
        let raw = self
            .request(
                Method::GET,
                "/api/v3/ticker/24hr",
                vec![("symbol", join_symbol(symbol))],
                false,
            )
            .await?;
        let parsed: wire::Ticker24h = wire::decode(raw.clone(), "ticker")?;
        wire::ticker(symbol.to_ascii_uppercase(), parsed, raw)
    }

    async fn fetch_tickers(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, VenueTicker>, VenueError> {
        let params = match symbols {
            Some(symbols) => {
                let ids = symbols
                    .iter()
                    .map(|symbol| format!("\"{}\"", join_symbol(symbol)))
                    .collect::<Vec<_>>()
                    .join(",");
                vec![("symbols", format!("[{ids}]"))]
            }
            None => {
                if !self.has_markets() {
                    self.load_markets().await?;
                }
                Vec::new()
            }
        };

        let value = self
            .request(Method::GET, "/api/v3/ticker/24hr", params, false)
            .await?;
        let rows = match value {
            Value::Array(rows) => rows,
            other => return Err(VenueError::decode(format!("expected a ticker list, got {other}"))),
        };

        let mut tickers = BTreeMap::new();
        for raw in rows {
            let parsed: wire::Ticker24h = wire::decode(raw.clone(), "ticker")?;
            let Some(symbol) = self.unify(&parsed.symbol) else {
                continue;
            };
            let ticker = wire::ticker(symbol.clone(), parsed, raw)?;
            tickers.insert(symbol, ticker);
        }
        Ok(tickers)
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<VenueCandle>, VenueError> {
        if !INTERVALS.contains(&timeframe) {
            return Err(VenueError::BadRequest {
                message: format!("unsupported timeframe '{timeframe}'"),
            });
        }

        let mut params = vec![
            ("symbol", join_symbol(symbol)),
            ("interval", timeframe.to_owned()),
        ];
        if let Some(since) = since {
            params.push(("startTime", since.to_string()));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }

        let value = self.request(Method::GET, "/api/v3/klines", params, false).await?;
        let rows = match value {
            Value::Array(rows) => rows,
            other => return Err(VenueError::decode(format!("expected kline rows, got {other}"))),
        };
        rows.iter()
            .map(|row| match row {
                Value::Array(columns) => wire::candle(columns),
                other => Err(VenueError::decode(format!("expected a kline row, got {other}"))),
            })
            .collect()
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<VenueOrderBook, VenueError> {
        let mut params = vec![("symbol", join_symbol(symbol))];
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        let value = self.request(Method::GET, "/api/v3/depth", params, false).await?;
        let depth: wire::Depth = wire::decode(value, "depth")?;
        wire::order_book(symbol.to_ascii_uppercase(), depth)
    }

    async fn fetch_trades(
        &self,
        symbol: &str,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<VenueTrade>, VenueError> {
        let mut params = vec![("symbol", join_symbol(symbol))];
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        let value = self.request(Method::GET, "/api/v3/trades", params, false).await?;
        let rows = match value {
            Value::Array(rows) => rows,
            other => return Err(VenueError::decode(format!("expected a trade list, got {other}"))),
        };

        let unified = symbol.to_ascii_uppercase();
        let mut trades = Vec::with_capacity(rows.len());
        for raw in rows {
            let parsed: wire::PublicTrade = wire::decode(raw.clone(), "trade")?;
            if since.is_some_and(|since| parsed.time < since) {
                continue;
            }
            trades.push(wire::public_trade(&unified, parsed, raw)?);
        }
        Ok(trades)
    }

    async fn fetch_balance(&self) -> Result<VenueBalances, VenueError> {
        let raw = self
            .request(
                Method::GET,
                "/api/v3/account",
                vec![("omitZeroBalances", String::from("true"))],
                true,
            )
            .await?;
        let account: wire::Account = wire::decode(raw.clone(), "account")?;
        wire::balances(account, raw)
    }

    async fn create_order(&self, request: &VenueOrderRequest) -> Result<VenueOrder, VenueError> {
        let order_type = request.order_type.to_ascii_uppercase();
        let mut params = vec![
            ("symbol", join_symbol(&request.symbol)),
            ("side", request.side.to_ascii_uppercase()),
            ("type", order_type.clone()),
            ("quantity", format_amount(request.amount)),
            ("newOrderRespType", String::from("RESULT")),
        ];

        if order_type == "LIMIT" {
            let price = request.price.ok_or_else(|| VenueError::InvalidOrder {
                message: String::from("limit orders require a price"),
            })?;
            params.push(("price", format_amount(price)));
            let time_in_force = request
                .params
                .get("timeInForce")
                .map(param_to_string)
                .unwrap_or_else(|| String::from("GTC"));
            params.push(("timeInForce", time_in_force));
        }

        let client_order_id = request
            .params
            .get("clientOrderId")
            .map(param_to_string)
            .unwrap_or_else(|| format!("mockx-{}", uuid::Uuid::new_v4().simple()));
        params.push(("newClientOrderId", client_order_id));

        let raw = self.request(Method::POST, "/api/v3/order", params, true).await?;
        self.order_from(raw, Some(&request.symbol))
    }

    async fn fetch_order(&self, id: &str, symbol: Option<&str>) -> Result<VenueOrder, VenueError> {
        let symbol = Self::require_symbol(symbol, "fetchOrder")?;
        let raw = self
            .request(
                Method::GET,
                "/api/v3/order",
                vec![("symbol", join_symbol(symbol)), ("orderId", id.to_owned())],
                true,
            )
            .await?;
        self.order_from(raw, Some(symbol))
    }

    async fn fetch_orders(
        &self,
        symbol: Option<&str>,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<VenueOrder>, VenueError> {
        let symbol = Self::require_symbol(symbol, "fetchOrders")?;
        let mut params = vec![("symbol", join_symbol(symbol))];
        if let Some(since) = since {
            params.push(("startTime", since.to_string()));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        let value = self.request(Method::GET, "/api/v3/allOrders", params, true).await?;
        self.orders_from(value, Some(symbol))
    }

    async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<VenueOrder>, VenueError> {
        let params = symbol
            .map(|symbol| vec![("symbol", join_symbol(symbol))])
            .unwrap_or_default();
        let value = self
            .request(Method::GET, "/api/v3/openOrders", params, true)
            .await?;
        self.orders_from(value, symbol)
    }

    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<VenueOrder, VenueError> {
        let symbol = Self::require_symbol(symbol, "cancelOrder")?;
        let raw = self
            .request(
                Method::DELETE,
                "/api/v3/order",
                vec![("symbol", join_symbol(symbol)), ("orderId", id.to_owned())],
                true,
            )
            .await?;
        self.order_from(raw, Some(symbol))
    }

    async fn fetch_my_trades(
        &self,
        symbol: Option<&str>,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<VenueTrade>, VenueError> {
        let symbol = Self::require_symbol(symbol, "fetchMyTrades")?;
        let mut params = vec![("symbol", join_symbol(symbol))];
        if let Some(since) = since {
            params.push(("startTime", since.to_string()));
        }
        if let Some(limit) = limit {
            params.push(("limit", limit.to_string()));
        }
        let value = self.request(Method::GET, "/api/v3/myTrades", params, true).await?;
        let rows = match value {
            Value::Array(rows) => rows,
            other => return Err(VenueError::decode(format!("expected a trade list, got {other}"))),
        };

        let unified = symbol.to_ascii_uppercase();
        rows.into_iter()
            .map(|raw| {
                let parsed: wire::MyTrade = wire::decode(raw.clone(), "trade")?;
                wire::my_trade(&unified, parsed, raw)
            })
            .collect()
    }

    fn close(&self) {
        if let Ok(mut symbols) = self.symbols.write() {
            symbols.clear();
        }
        tracing::debug!("binance client closed");
    }
}
