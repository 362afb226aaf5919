use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::VenueError;
use crate::model::{
    VenueBalances, VenueCandle, VenueMarket, VenueOrder, VenueOrderBook, VenueOrderRequest,
    VenueTicker, VenueTrade,
};

/// Unified method set every venue connector implements.
///
/// Operations a venue cannot serve return [`VenueError::NotSupported`]; operations that need
/// an argument the venue requires (for example a symbol) return [`VenueError::BadRequest`].
#[async_trait]
pub trait VenueClient: Send + Sync {
    fn exchange_id(&self) -> &str;

    fn sandbox(&self) -> bool;

    async fn load_markets(&self) -> Result<Vec<VenueMarket>, VenueError>;

    async fn fetch_ticker(&self, symbol: &str) -> Result<VenueTicker, VenueError>;

    /// Tickers keyed by unified symbol. `None` asks for every listed market.
    async fn fetch_tickers(
        &self,
        symbols: Option<&[String]>,
    ) -> Result<BTreeMap<String, VenueTicker>, VenueError>;

    async fn fetch_ohlcv(
        &self,
        symbol: &str,
        timeframe: &str,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<VenueCandle>, VenueError>;

    async fn fetch_order_book(
        &self,
        symbol: &str,
        limit: Option<u32>,
    ) -> Result<VenueOrderBook, VenueError>;

    async fn fetch_trades(
        &self,
        symbol: &str,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<VenueTrade>, VenueError>;

    async fn fetch_balance(&self) -> Result<VenueBalances, VenueError>;

    async fn create_order(&self, request: &VenueOrderRequest) -> Result<VenueOrder, VenueError>;

    async fn fetch_order(&self, id: &str, symbol: Option<&str>) -> Result<VenueOrder, VenueError>;

    async fn fetch_orders(
        &self,
        symbol: Option<&str>,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<VenueOrder>, VenueError>;

    async fn fetch_open_orders(&self, symbol: Option<&str>) -> Result<Vec<VenueOrder>, VenueError>;

    async fn cancel_order(&self, id: &str, symbol: Option<&str>) -> Result<VenueOrder, VenueError>;

    async fn fetch_my_trades(
        &self,
        symbol: Option<&str>,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> Result<Vec<VenueTrade>, VenueError>;

    /// Releases pooled connections. Further calls may still succeed by reconnecting.
    fn close(&self) {}
}
