use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{last_n, Backend, COMMON_OPERATIONS};
use crate::capabilities::{Mode, Operation};
use crate::domain::{
    Balance, BalanceList, ExecutionCheck, Market, Order, OrderFilter, OrderRequest, Params,
    Symbol, Ticker, TransferReceipt,
};
use crate::http_client::{HttpAuth, HttpClient, HttpErrorKind, HttpMethod, HttpRequest};
use crate::mapping::{is_open_native_status, paper as map};
use crate::{GatewayError, GatewayResult};

/// Adapter for the simulated venue's REST surface.
#[derive(Clone)]
pub struct PaperAdapter {
    http: Arc<dyn HttpClient>,
    base_url: String,
    auth: HttpAuth,
    timeout_ms: u64,
}

impl PaperAdapter {
    /// `base_url` is used as given apart from trailing slashes.
    pub fn new(
        http: Arc<dyn HttpClient>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout_ms: u64,
    ) -> Self {
        let base_url = base_url.into();
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_owned(),
            auth: HttpAuth::ApiKey(api_key.into()),
            timeout_ms,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub const fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    async fn get(&self, path: &str) -> GatewayResult<Value> {
        self.send(HttpMethod::Get, path, None).await
    }

    async fn post(&self, path: &str, body: Option<Value>) -> GatewayResult<Value> {
        self.send(HttpMethod::Post, path, body).await
    }

    async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Value>,
    ) -> GatewayResult<Value> {
        let mut request = HttpRequest::new(method, format!("{}{path}", self.base_url))
            .with_auth(&self.auth)
            .with_header("Content-Type", "application/json")
            .with_timeout_ms(self.timeout_ms);
        if let Some(body) = body {
            request = request.with_body(body.to_string());
        }

        debug!(method = method.as_str(), path, "paper request");

        let response = self.http.execute(request).await.map_err(|error| {
            warn!(method = method.as_str(), path, error = %error, "paper transport failure");
            match error.kind() {
                HttpErrorKind::Timeout => GatewayError::network(format!(
                    "request timed out after {}ms: {path}",
                    self.timeout_ms
                )),
                HttpErrorKind::Connect => {
                    GatewayError::network(format!("connection error: {}", error.message()))
                }
                HttpErrorKind::Other => {
                    GatewayError::network(format!("network error: {}", error.message()))
                }
            }
        })?;

        if !response.is_success() {
            let error = status_error(response.status, &response.body, path);
            warn!(
                method = method.as_str(),
                path,
                status = response.status,
                kind = %error.kind(),
                "paper request rejected"
            );
            return Err(error);
        }

        if response.body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&response.body).map_err(|error| {
            GatewayError::exchange(format!("invalid JSON response: {error}"))
                .with_info(Value::String(response.body.clone()))
        })
    }

    async fn symbol_universe(&self) -> GatewayResult<Vec<Symbol>> {
        let body = self.get("/tickers").await?;
        logged(map::symbol_universe(&body))
    }

    async fn order_rows(
        &self,
        filter: &OrderFilter,
        send_tail: bool,
    ) -> GatewayResult<Vec<Value>> {
        let mut query = Vec::new();
        if let Some(symbol) = &filter.symbol {
            query.push(("symbol", symbol.as_str().to_owned()));
        }
        if let Some(side) = filter.side {
            query.push(("side", side.as_str().to_owned()));
        }
        if let (true, Some(limit)) = (send_tail, filter.limit) {
            query.push(("tail", limit.to_string()));
        }

        let body = self.get(&with_query("/orders", &query)).await?;
        logged(map::order_rows(&body))
    }

    async fn transfer(
        &self,
        route: &str,
        asset: &str,
        amount: f64,
        params: &Params,
    ) -> GatewayResult<TransferReceipt> {
        if !amount.is_finite() || amount <= 0.0 {
            return Err(GatewayError::bad_request(format!(
                "transfer amount must be a positive number, got {amount}"
            )));
        }
        let asset = asset.trim().to_ascii_uppercase();
        if asset.is_empty() {
            return Err(GatewayError::bad_request("asset cannot be empty"));
        }

        let mut body = Map::new();
        body.insert(String::from("amount"), Value::from(amount));
        for (key, value) in params {
            body.insert(key.clone(), value.clone());
        }

        let path = format!("/balance/{}/{route}", urlencoding::encode(&asset));
        let response = self.post(&path, Some(Value::Object(body))).await?;
        Ok(map::transfer_receipt(&asset, amount, &response))
    }
}

#[async_trait]
impl Backend for PaperAdapter {
    fn mode(&self) -> Mode {
        Mode::Paper
    }

    fn operations(&self) -> BTreeSet<Operation> {
        COMMON_OPERATIONS
            .into_iter()
            .chain([
                Operation::FetchBalanceList,
                Operation::CanExecuteOrder,
                Operation::Deposit,
                Operation::Withdraw,
            ])
            .collect()
    }

    fn target(&self) -> String {
        self.base_url.clone()
    }

    async fn load_markets(&self) -> GatewayResult<BTreeMap<Symbol, Market>> {
        let symbols = self.symbol_universe().await?;
        Ok(map::markets(&symbols))
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> GatewayResult<Ticker> {
        let body = self.get(&format!("/tickers/{symbol}")).await?;
        logged(map::single_ticker(symbol, &body))
    }

    async fn fetch_tickers(
        &self,
        symbols: Option<&[Symbol]>,
    ) -> GatewayResult<BTreeMap<Symbol, Ticker>> {
        let requested = match symbols {
            Some(symbols) => symbols.to_vec(),
            None => self.symbol_universe().await?,
        };
        if requested.is_empty() {
            return Ok(BTreeMap::new());
        }

        let joined = requested
            .iter()
            .map(Symbol::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let body = self.get(&format!("/tickers/{joined}")).await?;
        logged(map::ticker_batch(&requested, &body))
    }

    async fn fetch_balance(&self, asset: Option<&str>) -> GatewayResult<Balance> {
        let path = match asset {
            Some(asset) => format!(
                "/balance/{}",
                urlencoding::encode(&asset.trim().to_ascii_uppercase())
            ),
            None => String::from("/balance"),
        };
        let body = self.get(&path).await?;
        logged(map::balance(&body))
    }

    async fn fetch_balance_list(&self) -> GatewayResult<BalanceList> {
        let body = self.get("/balance/list").await?;
        logged(map::balance_list(&body))
    }

    async fn create_order(&self, request: &OrderRequest) -> GatewayResult<Order> {
        let body = self.post("/orders", Some(order_body(request))).await?;
        logged(map::order(&body))
    }

    async fn can_execute_order(&self, request: &OrderRequest) -> GatewayResult<ExecutionCheck> {
        let body = self
            .post("/orders/can_execute", Some(order_body(request)))
            .await?;
        logged(map::execution_check(&body))
    }

    async fn fetch_order(&self, id: &str, _symbol: Option<&Symbol>) -> GatewayResult<Order> {
        let body = self
            .get(&format!("/orders/{}", urlencoding::encode(id)))
            .await?;
        logged(map::order(&body))
    }

    async fn fetch_orders(&self, filter: &OrderFilter) -> GatewayResult<Vec<Order>> {
        let rows = self.order_rows(filter, filter.status.is_none()).await?;
        let mut orders = logged(rows.iter().map(map::order).collect::<Result<Vec<_>, _>>())?;

        if let Some(side) = filter.side {
            orders.retain(|order| order.side == side);
        }
        if let Some(status) = filter.status {
            orders.retain(|order| order.status == status);
        }
        Ok(last_n(orders, filter.limit))
    }

    async fn fetch_open_orders(&self, symbol: Option<&Symbol>) -> GatewayResult<Vec<Order>> {
        let filter = OrderFilter {
            symbol: symbol.cloned(),
            ..OrderFilter::default()
        };
        let rows = self.order_rows(&filter, false).await?;

        let mut open = Vec::new();
        for row in &rows {
            let native = logged(map::native_status(row))?;
            if is_open_native_status(native) {
                open.push(logged(map::order(row))?);
            }
        }
        Ok(open)
    }

    async fn cancel_order(&self, id: &str, _symbol: Option<&Symbol>) -> GatewayResult<Order> {
        let body = self
            .post(&format!("/orders/{}/cancel", urlencoding::encode(id)), None)
            .await?;
        logged(map::canceled_order(&body))
    }

    async fn deposit(
        &self,
        asset: &str,
        amount: f64,
        params: &Params,
    ) -> GatewayResult<TransferReceipt> {
        self.transfer("deposit", asset, amount, params).await
    }

    async fn withdraw(
        &self,
        asset: &str,
        amount: f64,
        params: &Params,
    ) -> GatewayResult<TransferReceipt> {
        self.transfer("withdrawal", asset, amount, params).await
    }
}

fn order_body(request: &OrderRequest) -> Value {
    let mut body = Map::new();
    body.insert(String::from("symbol"), Value::from(request.symbol.as_str()));
    body.insert(String::from("type"), Value::from(request.order_type.as_str()));
    body.insert(String::from("side"), Value::from(request.side.as_str()));
    body.insert(String::from("amount"), Value::from(request.amount));
    if let Some(price) = request.price {
        body.insert(String::from("limit_price"), Value::from(price));
    }
    for (key, value) in &request.params {
        body.insert(key.clone(), value.clone());
    }
    Value::Object(body)
}

fn with_query(path: &str, query: &[(&str, String)]) -> String {
    if query.is_empty() {
        return path.to_owned();
    }
    let encoded = query
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&");
    format!("{path}?{encoded}")
}

fn logged<T>(result: GatewayResult<T>) -> GatewayResult<T> {
    result.inspect_err(|error| warn!(error = %error, "paper payload mapping failed"))
}

/// Maps a non-2xx simulated-venue response into the taxonomy.
pub(crate) fn status_error(status: u16, body: &str, path: &str) -> GatewayError {
    let parsed = serde_json::from_str::<Value>(body).ok();
    let message = parsed
        .as_ref()
        .and_then(|value| {
            ["message", "error", "detail"]
                .iter()
                .find_map(|key| value.get(*key).and_then(Value::as_str))
        })
        .map(str::to_owned)
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_owned()));
    let info = parsed.unwrap_or_else(|| Value::String(body.to_owned()));
    let described = || message.clone().unwrap_or_else(|| format!("HTTP {status}"));

    let error = match status {
        400 => GatewayError::bad_request(described()),
        401 | 403 => GatewayError::authentication(described()),
        404 if path.starts_with("/orders") => GatewayError::order_not_found(described()),
        404 => GatewayError::bad_request(described()),
        422 => GatewayError::insufficient_funds(described()),
        _ => match &message {
            Some(message) => GatewayError::exchange(format!("HTTP {status}: {message}")),
            None => GatewayError::exchange(format!("HTTP {status}")),
        },
    };
    error.with_info(info)
}
