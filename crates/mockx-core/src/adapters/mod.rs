//! Backend adapters behind the gateway facade.
//!
//! An adapter owns exactly one backend handle and translates in one direction: backend payloads
//! and failures in, canonical values and [`GatewayError`]s out. Operations an adapter does not
//! serve keep the default bodies, which fail with `NotSupported`; the set it does serve is
//! declared by [`Backend::operations`] and checked against the capability table when a gateway
//! is built.

mod live;
mod paper;

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;

pub use live::{venue_error, LiveAdapter};
pub use paper::PaperAdapter;

use crate::capabilities::{Mode, Operation};
use crate::domain::{
    Balance, BalanceList, Candle, ExecutionCheck, Market, Order, OrderBook, OrderFilter,
    OrderRequest, Params, Symbol, Ticker, Trade, TransferReceipt,
};
use crate::{GatewayError, GatewayResult};

/// Inputs reaching a backend are already validated by the facade.
#[async_trait]
pub trait Backend: Send + Sync {
    fn mode(&self) -> Mode;

    /// Operations this adapter implements, including those the facade derives from them.
    fn operations(&self) -> BTreeSet<Operation>;

    /// Human-readable target for logs: a base URL or an exchange id.
    fn target(&self) -> String;

    async fn load_markets(&self) -> GatewayResult<BTreeMap<Symbol, Market>>;

    async fn fetch_ticker(&self, symbol: &Symbol) -> GatewayResult<Ticker>;

    /// `None` means every symbol the backend lists.
    async fn fetch_tickers(
        &self,
        symbols: Option<&[Symbol]>,
    ) -> GatewayResult<BTreeMap<Symbol, Ticker>>;

    async fn fetch_ohlcv(
        &self,
        symbol: &Symbol,
        timeframe: &str,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<Candle>> {
        let _ = (symbol, timeframe, since, limit);
        Err(self.unsupported(Operation::FetchOhlcv))
    }

    async fn fetch_order_book(
        &self,
        symbol: &Symbol,
        limit: Option<u32>,
    ) -> GatewayResult<OrderBook> {
        let _ = (symbol, limit);
        Err(self.unsupported(Operation::FetchOrderBook))
    }

    async fn fetch_trades(
        &self,
        symbol: &Symbol,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<Trade>> {
        let _ = (symbol, since, limit);
        Err(self.unsupported(Operation::FetchTrades))
    }

    async fn fetch_balance(&self, asset: Option<&str>) -> GatewayResult<Balance>;

    async fn fetch_balance_list(&self) -> GatewayResult<BalanceList> {
        Err(self.unsupported(Operation::FetchBalanceList))
    }

    async fn create_order(&self, request: &OrderRequest) -> GatewayResult<Order>;

    async fn can_execute_order(&self, request: &OrderRequest) -> GatewayResult<ExecutionCheck> {
        let _ = request;
        Err(self.unsupported(Operation::CanExecuteOrder))
    }

    async fn fetch_order(&self, id: &str, symbol: Option<&Symbol>) -> GatewayResult<Order>;

    async fn fetch_orders(&self, filter: &OrderFilter) -> GatewayResult<Vec<Order>>;

    async fn fetch_open_orders(&self, symbol: Option<&Symbol>) -> GatewayResult<Vec<Order>>;

    async fn cancel_order(&self, id: &str, symbol: Option<&Symbol>) -> GatewayResult<Order>;

    async fn fetch_my_trades(
        &self,
        symbol: Option<&Symbol>,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<Trade>> {
        let _ = (symbol, since, limit);
        Err(self.unsupported(Operation::FetchMyTrades))
    }

    async fn deposit(
        &self,
        asset: &str,
        amount: f64,
        params: &Params,
    ) -> GatewayResult<TransferReceipt> {
        let _ = (asset, amount, params);
        Err(self.unsupported(Operation::Deposit))
    }

    async fn withdraw(
        &self,
        asset: &str,
        amount: f64,
        params: &Params,
    ) -> GatewayResult<TransferReceipt> {
        let _ = (asset, amount, params);
        Err(self.unsupported(Operation::Withdraw))
    }

    /// Releases the backend handle.
    fn close(&self) {}

    fn unsupported(&self, operation: Operation) -> GatewayError {
        GatewayError::not_supported(operation.as_str(), self.mode().as_str())
    }
}

/// Operations every adapter serves, plus those the facade builds on top of them.
pub(crate) const COMMON_OPERATIONS: [Operation; 13] = [
    Operation::LoadMarkets,
    Operation::FetchMarkets,
    Operation::FetchTicker,
    Operation::FetchTickers,
    Operation::FetchBalance,
    Operation::CreateOrder,
    Operation::CreateMarketOrder,
    Operation::CreateLimitOrder,
    Operation::FetchOrder,
    Operation::FetchOrders,
    Operation::FetchOpenOrders,
    Operation::FetchClosedOrders,
    Operation::CancelOrder,
];

/// The last `limit` items, oldest first.
pub(crate) fn last_n<T>(mut items: Vec<T>, limit: Option<u32>) -> Vec<T> {
    if let Some(limit) = limit {
        let keep = usize::try_from(limit).unwrap_or(usize::MAX);
        let skip = items.len().saturating_sub(keep);
        items.drain(..skip);
    }
    items
}
