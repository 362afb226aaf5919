use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use async_trait::async_trait;
use mockx_venue::{VenueClient, VenueError, VenueOrderRequest};
use serde_json::json;
use tracing::warn;

use super::{last_n, Backend, COMMON_OPERATIONS};
use crate::capabilities::{Mode, Operation};
use crate::domain::{
    Balance, Candle, Market, Order, OrderBook, OrderFilter, OrderRequest, Symbol, Ticker, Trade,
};
use crate::mapping::live as map;
use crate::{ErrorKind, GatewayError, GatewayResult};

/// Adapter over a live venue client. It only reshapes the client's values and failures.
#[derive(Clone)]
pub struct LiveAdapter {
    client: Arc<dyn VenueClient>,
}

impl LiveAdapter {
    pub fn new(client: Arc<dyn VenueClient>) -> Self {
        Self { client }
    }

    pub fn exchange_id(&self) -> &str {
        self.client.exchange_id()
    }

    pub fn sandbox(&self) -> bool {
        self.client.sandbox()
    }

    fn venue_failure(&self, operation: Operation, error: VenueError) -> GatewayError {
        let mapped = venue_error(self.client.exchange_id(), error);
        warn!(
            exchange = self.client.exchange_id(),
            operation = operation.as_str(),
            kind = %mapped.kind(),
            error = %mapped,
            "venue call failed"
        );
        mapped
    }

    /// A batch the venue rejected for a bad symbol. Names the requested symbols missing from
    /// the venue's listing, or every requested symbol when the listing does not explain it.
    async fn unlisted_symbols(&self, symbols: &[Symbol], message: String) -> GatewayError {
        let listed = match self.client.load_markets().await {
            Ok(markets) => markets
                .iter()
                .filter_map(|market| Symbol::parse(&market.symbol).ok())
                .collect::<BTreeSet<_>>(),
            Err(error) => {
                warn!(
                    exchange = self.client.exchange_id(),
                    error = %error,
                    "market listing unavailable while resolving unknown symbols"
                );
                BTreeSet::new()
            }
        };
        let mut missing = symbols
            .iter()
            .filter(|symbol| !listed.contains(*symbol))
            .map(Symbol::as_str)
            .collect::<Vec<_>>();
        if missing.is_empty() {
            missing = symbols.iter().map(Symbol::as_str).collect();
        }
        unknown_symbols(missing).with_info(json!({
            "exchange": self.client.exchange_id(),
            "error": message,
        }))
    }
}

fn unknown_symbols(mut missing: Vec<&str>) -> GatewayError {
    missing.sort_unstable();
    missing.dedup();
    GatewayError::bad_request(format!("unknown symbol(s): {}", missing.join(", ")))
}

/// Translates a venue library failure. The venue's fields are kept in `info`.
pub fn venue_error(exchange_id: &str, error: VenueError) -> GatewayError {
    let info = json!({
        "exchange": exchange_id,
        "error": error.to_string(),
        "code": error.code(),
        "transient": error.is_transient(),
    });
    let message = error.to_string();
    let kind = match &error {
        VenueError::Authentication { .. } | VenueError::PermissionDenied { .. } => {
            ErrorKind::Authentication
        }
        VenueError::InsufficientBalance { .. } => ErrorKind::InsufficientFunds,
        VenueError::InvalidOrder { .. } => ErrorKind::InvalidOrder,
        VenueError::OrderNotFound { .. } => ErrorKind::OrderNotFound,
        VenueError::BadSymbol { .. } | VenueError::BadRequest { .. } => ErrorKind::BadRequest,
        VenueError::RateLimited { .. }
        | VenueError::Timeout { .. }
        | VenueError::Network { .. }
        | VenueError::Unavailable { .. } => ErrorKind::Network,
        VenueError::NotSupported { .. } => ErrorKind::NotSupported,
        VenueError::Decode { .. } => ErrorKind::Mapping,
        VenueError::UnknownExchange { .. } => ErrorKind::Configuration,
        VenueError::Exchange { .. } => ErrorKind::Exchange,
    };
    GatewayError::new(kind, message).with_info(info)
}

#[async_trait]
impl Backend for LiveAdapter {
    fn mode(&self) -> Mode {
        Mode::Prod
    }

    fn operations(&self) -> BTreeSet<Operation> {
        COMMON_OPERATIONS
            .into_iter()
            .chain([
                Operation::FetchOhlcv,
                Operation::FetchOrderBook,
                Operation::FetchTrades,
                Operation::FetchMyTrades,
            ])
            .collect()
    }

    fn target(&self) -> String {
        let network = if self.client.sandbox() { "sandbox" } else { "live" };
        format!("{} ({network})", self.client.exchange_id())
    }

    async fn load_markets(&self) -> GatewayResult<BTreeMap<Symbol, Market>> {
        let markets = self
            .client
            .load_markets()
            .await
            .map_err(|error| self.venue_failure(Operation::LoadMarkets, error))?;
        markets
            .into_iter()
            .map(|raw| map::market(raw).map(|market| (market.symbol.clone(), market)))
            .collect()
    }

    async fn fetch_ticker(&self, symbol: &Symbol) -> GatewayResult<Ticker> {
        let raw = self
            .client
            .fetch_ticker(symbol.as_str())
            .await
            .map_err(|error| self.venue_failure(Operation::FetchTicker, error))?;
        map::ticker(raw)
    }

    async fn fetch_tickers(
        &self,
        symbols: Option<&[Symbol]>,
    ) -> GatewayResult<BTreeMap<Symbol, Ticker>> {
        let requested = symbols.map(|symbols| {
            symbols
                .iter()
                .map(|symbol| symbol.as_str().to_owned())
                .collect::<Vec<_>>()
        });
        let raw = match (self.client.fetch_tickers(requested.as_deref()).await, symbols) {
            (Ok(raw), _) => raw,
            (Err(VenueError::BadSymbol { message }), Some(symbols)) => {
                return Err(self.unlisted_symbols(symbols, message).await);
            }
            (Err(error), _) => return Err(self.venue_failure(Operation::FetchTickers, error)),
        };
        let tickers = map::tickers(raw)?;

        if let Some(symbols) = symbols {
            let missing = symbols
                .iter()
                .filter(|symbol| !tickers.contains_key(*symbol))
                .map(Symbol::as_str)
                .collect::<Vec<_>>();
            if !missing.is_empty() {
                return Err(unknown_symbols(missing));
            }
        }
        Ok(tickers)
    }

    async fn fetch_ohlcv(
        &self,
        symbol: &Symbol,
        timeframe: &str,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<Candle>> {
        let candles = self
            .client
            .fetch_ohlcv(symbol.as_str(), timeframe, since, limit)
            .await
            .map_err(|error| self.venue_failure(Operation::FetchOhlcv, error))?;
        Ok(candles.into_iter().map(map::candle).collect())
    }

    async fn fetch_order_book(
        &self,
        symbol: &Symbol,
        limit: Option<u32>,
    ) -> GatewayResult<OrderBook> {
        let book = self
            .client
            .fetch_order_book(symbol.as_str(), limit)
            .await
            .map_err(|error| self.venue_failure(Operation::FetchOrderBook, error))?;
        map::order_book(book)
    }

    async fn fetch_trades(
        &self,
        symbol: &Symbol,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<Trade>> {
        let trades = self
            .client
            .fetch_trades(symbol.as_str(), since, limit)
            .await
            .map_err(|error| self.venue_failure(Operation::FetchTrades, error))?;
        map::trades(trades)
    }

    async fn fetch_balance(&self, asset: Option<&str>) -> GatewayResult<Balance> {
        let raw = self
            .client
            .fetch_balance()
            .await
            .map_err(|error| self.venue_failure(Operation::FetchBalance, error))?;
        let balance = map::balance(raw)?;
        let Some(asset) = asset else {
            return Ok(balance);
        };
        let asset = asset.trim().to_ascii_uppercase();
        if balance.get(&asset).is_none() {
            return Err(GatewayError::bad_request(format!("asset {asset} not found")));
        }
        Ok(balance.only(&asset))
    }

    async fn create_order(&self, request: &OrderRequest) -> GatewayResult<Order> {
        let venue_request = VenueOrderRequest::new(
            request.symbol.as_str(),
            request.order_type.as_str(),
            request.side.as_str(),
            request.amount,
            request.price,
        )
        .with_params(request.params.clone());

        let raw = self
            .client
            .create_order(&venue_request)
            .await
            .map_err(|error| self.venue_failure(Operation::CreateOrder, error))?;
        map::order(raw)
    }

    async fn fetch_order(&self, id: &str, symbol: Option<&Symbol>) -> GatewayResult<Order> {
        let raw = self
            .client
            .fetch_order(id, symbol.map(Symbol::as_str))
            .await
            .map_err(|error| self.venue_failure(Operation::FetchOrder, error))?;
        map::order(raw)
    }

    async fn fetch_orders(&self, filter: &OrderFilter) -> GatewayResult<Vec<Order>> {
        let filtered = filter.status.is_some() || filter.side.is_some();
        let venue_limit = if filtered { None } else { filter.limit };

        let raw = self
            .client
            .fetch_orders(filter.symbol.as_ref().map(Symbol::as_str), None, venue_limit)
            .await
            .map_err(|error| self.venue_failure(Operation::FetchOrders, error))?;
        let mut orders = map::orders(raw)?;

        if !filtered {
            return Ok(orders);
        }
        orders.retain(|order| {
            filter.status.map_or(true, |status| order.status == status)
                && filter.side.map_or(true, |side| order.side == side)
        });
        Ok(last_n(orders, filter.limit))
    }

    async fn fetch_open_orders(&self, symbol: Option<&Symbol>) -> GatewayResult<Vec<Order>> {
        let raw = self
            .client
            .fetch_open_orders(symbol.map(Symbol::as_str))
            .await
            .map_err(|error| self.venue_failure(Operation::FetchOpenOrders, error))?;
        let mut orders = map::orders(raw)?;
        orders.retain(|order| order.status.is_open());
        Ok(orders)
    }

    async fn cancel_order(&self, id: &str, symbol: Option<&Symbol>) -> GatewayResult<Order> {
        let raw = self
            .client
            .cancel_order(id, symbol.map(Symbol::as_str))
            .await
            .map_err(|error| self.venue_failure(Operation::CancelOrder, error))?;
        map::order(raw)
    }

    async fn fetch_my_trades(
        &self,
        symbol: Option<&Symbol>,
        since: Option<i64>,
        limit: Option<u32>,
    ) -> GatewayResult<Vec<Trade>> {
        let trades = self
            .client
            .fetch_my_trades(symbol.map(Symbol::as_str), since, limit)
            .await
            .map_err(|error| self.venue_failure(Operation::FetchMyTrades, error))?;
        map::trades(trades)
    }

    fn close(&self) {
        self.client.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn venue_errors_map_onto_the_taxonomy() {
        let message = || String::from("x");
        let cases = [
            (VenueError::Authentication { message: message() }, ErrorKind::Authentication),
            (VenueError::PermissionDenied { message: message() }, ErrorKind::Authentication),
            (VenueError::InsufficientBalance { message: message() }, ErrorKind::InsufficientFunds),
            (VenueError::InvalidOrder { message: message() }, ErrorKind::InvalidOrder),
            (VenueError::OrderNotFound { message: message() }, ErrorKind::OrderNotFound),
            (VenueError::BadSymbol { message: message() }, ErrorKind::BadRequest),
            (VenueError::BadRequest { message: message() }, ErrorKind::BadRequest),
            (VenueError::RateLimited { message: message() }, ErrorKind::Network),
            (VenueError::Timeout { timeout_ms: 10 }, ErrorKind::Network),
            (VenueError::Network { message: message() }, ErrorKind::Network),
            (VenueError::Unavailable { message: message() }, ErrorKind::Network),
            (
                VenueError::NotSupported {
                    exchange: String::from("binance"),
                    operation: String::from("fetchDeposits"),
                },
                ErrorKind::NotSupported,
            ),
            (VenueError::Decode { message: message() }, ErrorKind::Mapping),
            (
                VenueError::UnknownExchange {
                    exchange_id: String::from("kraken"),
                },
                ErrorKind::Configuration,
            ),
            (
                VenueError::Exchange {
                    code: -1000,
                    message: message(),
                },
                ErrorKind::Exchange,
            ),
        ];

        for (error, kind) in cases {
            let label = error.to_string();
            assert_eq!(venue_error("binance", error).kind(), kind, "{label}");
        }
    }

    #[test]
    fn venue_error_fields_are_kept_in_info() {
        let error = venue_error(
            "binance",
            VenueError::Exchange {
                code: -1000,
                message: String::from("unknown error"),
            },
        );

        let info = error.info().expect("info is attached");
        assert_eq!(info["code"], -1000);
        assert_eq!(info["exchange"], "binance");
        assert_eq!(error.message(), "exchange error -1000: unknown error");
    }

    #[test]
    fn last_n_keeps_the_tail() {
        assert_eq!(last_n(vec![1, 2, 3, 4], Some(2)), vec![3, 4]);
        assert_eq!(last_n(vec![1, 2], Some(5)), vec![1, 2]);
        assert_eq!(last_n(vec![1, 2], None), vec![1, 2]);
    }
}
