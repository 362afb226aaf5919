//! Core contracts for mockx.
//!
//! This crate contains:
//! - Canonical market, account and order models
//! - The per-mode capability tables and the normalized error taxonomy
//! - Paper (simulated REST venue) and prod (live venue library) adapters
//! - The [`Gateway`] facade and the factory that assembles it
//! - An in-memory simulated venue for offline use and tests

pub mod adapters;
pub mod capabilities;
pub mod domain;
mod error;
pub mod factory;
mod gateway;
pub mod http_client;
pub mod mapping;
pub mod sim;

pub use capabilities::{CapabilityTable, Mode, Operation};
pub use domain::{
    Balance, BalanceEntry, BalanceList, Candle, ExecutionCheck, Market, MarketLimits,
    MarketPrecision, Order, OrderBook, OrderFilter, OrderRequest, OrderSide, OrderStatus,
    OrderType, Params, Symbol, Ticker, Trade, TransferReceipt, UtcDateTime,
};
pub use error::{ErrorKind, GatewayError, GatewayResult, ValidationError};
pub use factory::{
    create_gateway, create_paper_gateway, create_prod_gateway, DefaultVenueConnector,
    GatewayConfig, GatewayFactory, VenueConnector,
};
pub use gateway::Gateway;
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpErrorKind, HttpMethod, HttpRequest, HttpResponse,
    ReqwestHttpClient,
};
pub use sim::SimVenue;
