//! The public facade.
//!
//! Every method checks the capability table first and fails with `NotSupported` without
//! touching the backend when the operation is off for the active mode. Supported calls validate
//! their input, delegate to the adapter and return its result unchanged.

use std::collections::BTreeMap;

use tracing::info;

use crate::adapters::{last_n, Backend};
use crate::capabilities::{CapabilityTable, Mode, Operation};
use crate::domain::{
    Balance, BalanceList, Candle, ExecutionCheck, Market, Order, OrderBook, OrderFilter,
    OrderRequest, OrderSide, OrderType, Params, Symbol, Ticker, Trade, TransferReceipt,
};
use crate::{GatewayError, GatewayResult};

/// One normalized trading surface over a simulated or live backend.
///
/// Built by [`crate::GatewayFactory`]; owns its adapter and capability table for its whole
/// lifetime. The only local state is the market cache filled by [`Gateway::load_markets`].
pub struct Gateway {
    backend: Box<dyn Backend>,
    capabilities: CapabilityTable,
    markets: BTreeMap<Symbol, Market>,
    released: bool,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("mode", &self.capabilities.mode())
            .field("target", &self.backend.target())
            .field("markets", &self.markets.len())
            .finish()
    }
}

fn symbol_arg(raw: &str) -> GatewayResult<Symbol> {
    Symbol::parse(raw).map_err(GatewayError::from)
}

fn id_arg(raw: &str) -> GatewayResult<&str> {
    let id = raw.trim();
    if id.is_empty() {
        return Err(GatewayError::bad_request("order id cannot be empty"));
    }
    Ok(id)
}

impl Gateway {
    pub(crate) fn new(backend: Box<dyn Backend>, capabilities: CapabilityTable) -> Self {
        Self {
            backend,
            capabilities,
            markets: BTreeMap::new(),
            released: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.capabilities.mode()
    }

    /// Read-only view of the capability table, keyed by camelCase operation name.
    pub fn has(&self) -> &CapabilityTable {
        &self.capabilities
    }

    pub fn supports(&self, operation: Operation) -> bool {
        self.capabilities.supports(operation)
    }

    /// Base URL or exchange id the gateway talks to.
    pub fn target(&self) -> String {
        self.backend.target()
    }

    /// Cached markets; empty until [`Gateway::load_markets`] succeeds.
    pub fn markets(&self) -> &BTreeMap<Symbol, Market> {
        &self.markets
    }

    pub fn market(&self, symbol: &str) -> GatewayResult<&Market> {
        if self.markets.is_empty() {
            return Err(GatewayError::exchange(
                "markets not loaded; call load_markets first",
            ));
        }
        let symbol = symbol_arg(symbol)?;
        self.markets
            .get(&symbol)
            .ok_or_else(|| GatewayError::bad_request(format!("unknown market {symbol}")))
    }

    /// Fills the market cache. A non-empty cache is reused unless `reload` is set.
    pub async fn load_markets(&mut self, reload: bool) -> GatewayResult<&BTreeMap<Symbol, Market>> {
        self.capabilities.require(Operation::LoadMarkets)?;
        if reload || self.markets.is_empty() {
            self.markets = self.backend.load_markets().await?;
        }
        Ok(&self.markets)
    }

    /// Fresh market listing; does not touch the cache.
    pub async fn fetch_markets(&self) -> GatewayResult<Vec<Market>> {
        self.capabilities.require(Operation::FetchMarkets)?;
        Ok(self.backend.load_markets().await?.into_values().collect())
    }

    pub async fn fetch_ticker(&self, symbol: &str) -> GatewayResult<Ticker> {
        self.capabilities.require(Operation::FetchTicker)?;
        let symbol = symbol_arg(symbol)?;
        self.backend.fetch_ticker(&symbol).await
    }

    /// Tickers keyed by symbol. `None` returns every symbol the backend lists.
    pub async fn fetch_tickers(
        &self,
        symbols: Option<&[&str]>,
    ) -> GatewayResult<BTreeMap<Symbol, Ticker>> {
        self.capabilities.require(Operation::FetchTickers)?;
        match symbols {
            Some(raw) => {
                let mut parsed = Vec::with_capacity(raw.len());
                for symbol in raw {
                    let symbol = symbol_arg(symbol)?;
                    if !parsed.contains(&symbol) {
                        parsed.push(symbol);
                    }
                }
                self.backend.fetch_tickers(Some(&parsed)).await
            }
            None => self.backend.fetch_tickers(None).await,
        }
    }

    pub async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<Candle>> {
        self.capabilities.require(Operation::FetchOhlcv)?;
        let symbol = symbol_arg(symbol)?;
        if timeframe.trim().is_empty() {
            return Err(GatewayError::bad_request("timeframe cannot be empty"));
        }
        self.backend
            .fetch_ohlcv(&symbol, timeframe.trim(), since, limit)
            .await
    }

    pub async fn fetch_order_book(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> GatewayResult<OrderBook> {
        self.capabilities.require(Operation::FetchOrderBook)?;
        let symbol = symbol_arg(symbol)?;
        self.backend.fetch_order_book(&symbol, limit).await
    }

    pub async fn fetch_trades(
        &self,
        symbol: &str,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<Trade>> {
        self.capabilities.require(Operation::FetchTrades)?;
        let symbol = symbol_arg(symbol)?;
        self.backend.fetch_trades(&symbol, since, limit).await
    }

    /// Full balance, or one asset's when `asset` is given.
    pub async fn fetch_balance(&self, asset: Option<&str>) -> GatewayResult<Balance> {
        self.capabilities.require(Operation::FetchBalance)?;
        let asset = asset.map(str::trim);
        if asset.is_some_and(str::is_empty) {
            return Err(GatewayError::bad_request("asset cannot be empty"));
        }
        self.backend.fetch_balance(asset).await
    }

    pub async fn fetch_balance_list(&self) -> GatewayResult<BalanceList> {
        self.capabilities.require(Operation::FetchBalanceList)?;
        self.backend.fetch_balance_list().await
    }

    pub async fn create_order(
        &self,
        symbol: &str,
        order_type: OrderType,
        side: OrderSide,
        amount: f64,
        price: Option<f64>,
        params: Option<Params>,
    ) -> GatewayResult<Order> {
        self.capabilities.require(Operation::CreateOrder)?;
        let request = OrderRequest::new(
            symbol_arg(symbol)?,
            order_type,
            side,
            amount,
            price,
            params.unwrap_or_default(),
        )?;
        self.backend.create_order(&request).await
    }

    pub async fn create_market_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: f64,
        params: Option<Params>,
    ) -> GatewayResult<Order> {
        self.capabilities.require(Operation::CreateMarketOrder)?;
        let request = OrderRequest::new(
            symbol_arg(symbol)?,
            OrderType::Market,
            side,
            amount,
            None,
            params.unwrap_or_default(),
        )?;
        self.backend.create_order(&request).await
    }

    pub async fn create_limit_order(
        &self,
        symbol: &str,
        side: OrderSide,
        amount: f64,
        price: f64,
        params: Option<Params>,
    ) -> GatewayResult<Order> {
        self.capabilities.require(Operation::CreateLimitOrder)?;
        let request = OrderRequest::new(
            symbol_arg(symbol)?,
            OrderType::Limit,
            side,
            amount,
            Some(price),
            params.unwrap_or_default(),
        )?;
        self.backend.create_order(&request).await
    }

    /// Dry run against the simulated venue's funds check.
    pub async fn can_execute_order(
        &self,
        symbol: &str,
        order_type: OrderType,
        side: OrderSide,
        amount: f64,
        price: Option<f64>,
        params: Option<Params>,
    ) -> GatewayResult<ExecutionCheck> {
        self.capabilities.require(Operation::CanExecuteOrder)?;
        let request = OrderRequest::new(
            symbol_arg(symbol)?,
            order_type,
            side,
            amount,
            price,
            params.unwrap_or_default(),
        )?;
        self.backend.can_execute_order(&request).await
    }

    pub async fn fetch_order(&self, id: &str, symbol: Option<&str>) -> GatewayResult<Order> {
        self.capabilities.require(Operation::FetchOrder)?;
        let id = id_arg(id)?;
        let symbol = symbol.map(symbol_arg).transpose()?;
        self.backend.fetch_order(id, symbol.as_ref()).await
    }

    pub async fn fetch_orders(&self, filter: &OrderFilter) -> GatewayResult<Vec<Order>> {
        self.capabilities.require(Operation::FetchOrders)?;
        self.backend.fetch_orders(filter).await
    }

    /// Orders still resting on the book.
    pub async fn fetch_open_orders(&self, symbol: Option<&str>) -> GatewayResult<Vec<Order>> {
        self.capabilities.require(Operation::FetchOpenOrders)?;
        let symbol = symbol.map(symbol_arg).transpose()?;
        self.backend.fetch_open_orders(symbol.as_ref()).await
    }

    /// Orders in a terminal state: closed, canceled, expired or rejected.
    pub async fn fetch_closed_orders(
        &self,
        symbol: Option<&str>,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<Order>> {
        self.capabilities.require(Operation::FetchClosedOrders)?;
        let filter = OrderFilter {
            symbol: symbol.map(symbol_arg).transpose()?,
            ..OrderFilter::default()
        };
        let mut orders = self.backend.fetch_orders(&filter).await?;
        orders.retain(|order| order.status.is_closed());
        Ok(last_n(orders, limit))
    }

    pub async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> GatewayResult<Order> {
        self.capabilities.require(Operation::CancelOrder)?;
        let id = id_arg(id)?;
        let symbol = symbol.map(symbol_arg).transpose()?;
        self.backend.cancel_order(id, symbol.as_ref()).await
    }

    pub async fn fetch_my_trades(
        &self,
        symbol: Option<&str>,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<Trade>> {
        self.capabilities.require(Operation::FetchMyTrades)?;
        let symbol = symbol.map(symbol_arg).transpose()?;
        self.backend
            .fetch_my_trades(symbol.as_ref(), since, limit)
            .await
    }

    pub async fn deposit(
        &self,
        asset: &str,
        amount: f64,
        params: Option<Params>,
    ) -> GatewayResult<TransferReceipt> {
        self.capabilities.require(Operation::Deposit)?;
        self.backend
            .deposit(asset, amount, &params.unwrap_or_default())
            .await
    }

    pub async fn withdraw(
        &self,
        asset: &str,
        amount: f64,
        params: Option<Params>,
    ) -> GatewayResult<TransferReceipt> {
        self.capabilities.require(Operation::Withdraw)?;
        self.backend
            .withdraw(asset, amount, &params.unwrap_or_default())
            .await
    }

    /// Releases the backend handle. Dropping the gateway does the same.
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.backend.close();
        info!(
            mode = %self.capabilities.mode(),
            target = %self.backend.target(),
            "gateway closed"
        );
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.release();
    }
}
