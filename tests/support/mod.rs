//! Shared fakes for the gateway integration tests.
#![allow(dead_code)]

use std::collections::{BTreeMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use mockx_core::{
    Gateway, GatewayConfig, GatewayFactory, HttpClient, HttpError, HttpRequest, HttpResponse,
    SimVenue, VenueConnector,
};
use mockx_venue::{
    VenueBalanceEntry, VenueBalances, VenueCandle, VenueClient, VenueCredentials, VenueError,
    VenueMarket, VenueOrder, VenueOrderBook, VenueOrderRequest, VenueTicker, VenueTrade,
};
use serde_json::{json, Value};

pub const BASE_URL: &str = "http://paper.test";
pub const API_KEY: &str = "test-key";

/// HTTP transport that replays queued responses and records every request.
#[derive(Debug, Default)]
pub struct ScriptedHttp {
    replies: Mutex<VecDeque<Result<HttpResponse, HttpError>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttp {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(&self, status: u16, body: impl Into<String>) -> &Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Ok(HttpResponse::new(status, body)));
        self
    }

    pub fn reply_json(&self, body: Value) -> &Self {
        self.reply(200, body.to_string())
    }

    pub fn fail(&self, error: HttpError) -> &Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Err(error));
        self
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub fn paths(&self) -> Vec<String> {
        self.requests()
            .iter()
            .map(|request| request.path().to_owned())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }
}

impl HttpClient for ScriptedHttp {
    fn execute<'a>(
        &'a self,
        request: HttpRequest,
    ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
        Box::pin(async move {
            self.requests.lock().expect("requests lock").push(request);
            self.replies
                .lock()
                .expect("replies lock")
                .pop_front()
                .unwrap_or_else(|| Ok(HttpResponse::new(500, r#"{"detail":"no scripted reply"}"#)))
        })
    }
}

/// In-memory live venue returning fixed native shapes and recording calls by name.
#[derive(Debug, Default)]
pub struct FakeVenue {
    pub markets: Vec<VenueMarket>,
    pub tickers: BTreeMap<String, VenueTicker>,
    pub balances: Option<VenueBalances>,
    pub orders: Vec<VenueOrder>,
    pub trades: Vec<VenueTrade>,
    pub failure: Mutex<Option<VenueError>>,
    pub calls: Mutex<Vec<String>>,
    pub closed: Mutex<bool>,
}

impl FakeVenue {
    pub fn fail_next(&self, error: VenueError) {
        *self.failure.lock().expect("failure lock") = Some(error);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub fn closed(&self) -> bool {
        *self.closed.lock().expect("closed lock")
    }

    fn enter(&self, name: &str) -> Result<(), VenueError> {
        self.calls.lock().expect("calls lock").push(name.to_owned());
        match self.failure.lock().expect("failure lock").take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn order_by_id(&self, id: &str) -> Result<VenueOrder, VenueError> {
        self.orders
            .iter()
            .find(|order| order.id == id)
            .cloned()
            .ok_or_else(|| VenueError::OrderNotFound {
                message: format!("order {id} does not exist"),
            })
    }
}

#[async_trait]
impl VenueClient for FakeVenue {
    fn exchange_id(&self) -> &str {
        "binance"
    }

    fn sandbox(&self) -> bool {
        true
    }

    async fn load_markets(&self) -> Result<Vec<VenueMarket>, VenueError> {
        self.enter("load_markets")?;
        Ok(self.markets.clone())
    }

    async fn fetch_ticker(&self, symbol: &str) -> Result<VenueTicker, VenueError> {
        self.enter("fetch_ticker")?;
        self.tickers
            .get(symbol)
            .cloned()
            .ok_or_else(|| VenueError::BadSymbol {
                message: format!("{symbol} is not listed"),
            })
    }

    async fn fetch_tickers(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, VenueTicker>, VenueError> {
        self.enter("fetch_tickers")?;
        Ok(match symbols {
            Some(symbols) => self
                .tickers
                .iter()
                .filter(|(symbol, _)| symbols.contains(symbol))
                .map(|(symbol, ticker)| (symbol.clone(), ticker.clone()))
                .collect(),
            None => self.tickers.clone(),
        })
    }

    async fn fetch_ohlcv(
        &self,
        _symbol: &str,
        _timeframe: &str,
        _since: Option<i64>,
        _limit: Option<u32>,
    ) -> Result<Vec<VenueCandle>, VenueError> {
        self.enter("fetch_ohlcv")?;
        Ok(vec![VenueCandle {
            timestamp: 1_704_067_200_000,
            open: 42_000.0,
            high: 42_500.0,
            low: 41_800.0,
            close: 42_250.0,
            volume: 12.5,
        }])
    }

    async fn fetch_order_book(
        &self,
        symbol: &str,
        _limit: Option<u32>,
    ) -> Result<VenueOrderBook, VenueError> {
        self.enter("fetch_order_book")?;
        Ok(VenueOrderBook {
            symbol: symbol.to_owned(),
            bids: vec![(41_999.0, 0.5), (41_998.0, 1.0)],
            asks: vec![(42_001.0, 0.25)],
            timestamp: Some(1_704_067_200_000),
            nonce: Some(7),
        })
    }

    async fn fetch_trades(
        &self,
        _symbol: &str,
        _since: Option<i64>,
        _limit: Option<u32>,
    ) -> Result<Vec<VenueTrade>, VenueError> {
        self.enter("fetch_trades")?;
        Ok(self.trades.clone())
    }

    async fn fetch_balance(&self) -> Result<VenueBalances, VenueError> {
        self.enter("fetch_balance")?;
        self.balances.clone().ok_or_else(|| VenueError::Exchange {
            code: -1,
            message: String::from("no balances configured"),
        })
    }

    async fn create_order(&self, request: &VenueOrderRequest) -> Result<VenueOrder, VenueError> {
        self.enter("create_order")?;
        Ok(VenueOrder {
            id: String::from("9001"),
            client_order_id: None,
            symbol: request.symbol.clone(),
            order_type: request.order_type.clone(),
            side: request.side.clone(),
            amount: Some(request.amount),
            price: request.price,
            status: Some(String::from("open")),
            filled: Some(0.0),
            remaining: Some(request.amount),
            cost: Some(0.0),
            timestamp: Some(1_704_067_200_000),
            last_trade_timestamp: None,
            info: json!({"orderId": 9001, "status": "NEW"}),
        })
    }

    async fn fetch_order(&self, id: &str, _symbol: Option<&str>) -> Result<VenueOrder, VenueError> {
        self.enter("fetch_order")?;
        self.order_by_id(id)
    }

    async fn fetch_orders(
        &self,
        symbol: Option<&str>,
        _since: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<VenueOrder>, VenueError> {
        self.enter("fetch_orders")?;
        let mut orders = self
            .orders
            .iter()
            .filter(|order| symbol.map_or(true, |symbol| order.symbol == symbol))
            .cloned()
            .collect::<Vec<_>>();
        if let Some(limit) = limit {
            let skip = orders.len().saturating_sub(limit as usize);
            orders.drain(..skip);
        }
        Ok(orders)
    }

    async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<VenueOrder>, VenueError> {
        self.enter("fetch_open_orders")?;
        Ok(self
            .orders
            .iter()
            .filter(|order| order.status.as_deref() == Some("open"))
            .filter(|order| symbol.map_or(true, |symbol| order.symbol == symbol))
            .cloned()
            .collect())
    }

    async fn cancel_order(
        &self,
        id: &str,
        _symbol: Option<&str>,
    ) -> Result<VenueOrder, VenueError> {
        self.enter("cancel_order")?;
        let mut order = self.order_by_id(id)?;
        order.status = Some(String::from("canceled"));
        Ok(order)
    }

    async fn fetch_my_trades(
        &self,
        _symbol: Option<&str>,
        _since: Option<i64>,
        _limit: Option<u32>,
    ) -> Result<Vec<VenueTrade>, VenueError> {
        self.enter("fetch_my_trades")?;
        Ok(self.trades.clone())
    }

    fn close(&self) {
        *self.closed.lock().expect("closed lock") = true;
    }
}

/// Hands out one prepared client for any exchange id and keeps the credentials it was given.
pub struct FixedConnector {
    client: Arc<FakeVenue>,
    pub seen: Mutex<Vec<(String, VenueCredentials)>>,
}

impl FixedConnector {
    pub fn new(client: Arc<FakeVenue>) -> Self {
        Self {
            client,
            seen: Mutex::new(Vec::new()),
        }
    }
}

impl VenueConnector for FixedConnector {
    fn connect(
        &self,
        exchange_id: &str,
        credentials: VenueCredentials,
    ) -> Result<Arc<dyn VenueClient>, VenueError> {
        self.seen
            .lock()
            .expect("seen lock")
            .push((exchange_id.to_owned(), credentials));
        let client: Arc<dyn VenueClient> = self.client.clone();
        Ok(client)
    }
}

pub fn venue_order(
    id: &str,
    symbol: &str,
    status: Option<&str>,
    amount: f64,
    filled: f64,
) -> VenueOrder {
    VenueOrder {
        id: id.to_owned(),
        client_order_id: None,
        symbol: symbol.to_owned(),
        order_type: String::from("limit"),
        side: String::from("buy"),
        amount: Some(amount),
        price: Some(100.0),
        status: status.map(str::to_owned),
        filled: Some(filled),
        remaining: Some(amount - filled),
        cost: Some(filled * 100.0),
        timestamp: Some(1_704_067_200_000),
        last_trade_timestamp: None,
        info: json!({"orderId": id}),
    }
}

pub fn venue_ticker(symbol: &str, last: f64) -> VenueTicker {
    VenueTicker {
        symbol: symbol.to_owned(),
        timestamp: Some(1_704_067_200_000),
        last: Some(last),
        bid: Some(last - 1.0),
        bid_volume: None,
        ask: Some(last + 1.0),
        ask_volume: None,
        high: None,
        low: None,
        open: None,
        close: None,
        base_volume: Some(10.0),
        quote_volume: None,
        change: None,
        percentage: None,
        info: json!({"symbol": symbol.replace('/', "")}),
    }
}

pub fn venue_market(symbol: &str) -> VenueMarket {
    let (base, quote) = symbol.split_once('/').expect("pair symbol");
    VenueMarket {
        id: format!("{base}{quote}"),
        symbol: symbol.to_owned(),
        base: base.to_owned(),
        quote: quote.to_owned(),
        active: true,
        amount_precision: Some(5),
        price_precision: Some(2),
        min_amount: Some(0.0001),
        max_amount: None,
        min_cost: Some(5.0),
        info: json!({"symbol": format!("{base}{quote}")}),
    }
}

pub fn balances(entries: &[(&str, Option<f64>, Option<f64>, Option<f64>)]) -> VenueBalances {
    VenueBalances {
        assets: entries
            .iter()
            .map(|(asset, free, used, total)| {
                (
                    (*asset).to_owned(),
                    VenueBalanceEntry {
                        free: *free,
                        used: *used,
                        total: *total,
                    },
                )
            })
            .collect(),
        timestamp: Some(1_704_067_200_000),
        info: json!({"accountType": "SPOT"}),
    }
}

/// A populated live venue: two markets, tickers, balances and a mixed order history.
pub fn stocked_venue() -> FakeVenue {
    let mut tickers = BTreeMap::new();
    tickers.insert(String::from("BTC/USDT"), venue_ticker("BTC/USDT", 42_000.0));
    tickers.insert(String::from("ETH/USDT"), venue_ticker("ETH/USDT", 2_500.0));
    FakeVenue {
        markets: vec![venue_market("BTC/USDT"), venue_market("ETH/USDT")],
        tickers,
        balances: Some(balances(&[
            ("BTC", Some(0.5), Some(0.1), Some(0.6)),
            ("USDT", Some(1_000.0), None, Some(1_250.0)),
        ])),
        orders: vec![
            venue_order("1", "BTC/USDT", Some("closed"), 1.0, 1.0),
            venue_order("2", "BTC/USDT", Some("open"), 2.0, 0.0),
            venue_order("3", "ETH/USDT", Some("open"), 2.0, 0.5),
            venue_order("4", "ETH/USDT", Some("canceled"), 1.0, 0.0),
        ],
        trades: Vec::new(),
        ..FakeVenue::default()
    }
}

pub fn paper_gateway(http: Arc<dyn HttpClient>) -> Gateway {
    GatewayFactory::new()
        .with_http_client(http)
        .create("paper", &GatewayConfig::paper(BASE_URL, API_KEY))
        .expect("paper gateway")
}

pub fn sim_gateway() -> (Arc<SimVenue>, Gateway) {
    let sim = Arc::new(SimVenue::new().with_api_key(API_KEY));
    let gateway = paper_gateway(sim.clone());
    (sim, gateway)
}

pub fn prod_gateway(venue: Arc<FakeVenue>) -> Gateway {
    GatewayFactory::new()
        .with_venue_connector(Arc::new(FixedConnector::new(venue)))
        .create("prod", &GatewayConfig::prod("binance", "key", "secret"))
        .expect("prod gateway")
}
