//! Live venue clients for mockx.
//!
//! Each connector speaks one venue's REST protocol (request signing, rate limiting, error
//! codes) and returns the library's native shapes. Symbols are unified `BASE/QUOTE` strings,
//! order sides and types are lowercase strings, and order statuses use the unified vocabulary
//! `open`, `closed`, `canceled`, `expired`, `rejected`, `pending`.
//!
//! ```no_run
//! # async fn demo() -> Result<(), mockx_venue::VenueError> {
//! use mockx_venue::{connect, VenueCredentials};
//!
//! let client = connect("binance", VenueCredentials::new("key", "secret").with_sandbox(true))?;
//! let ticker = client.fetch_ticker("BTC/USDT").await?;
//! println!("{:?}", ticker.last);
//! # Ok(())
//! # }
//! ```

pub mod binance;
mod client;
mod credentials;
mod error;
mod model;
mod symbols;

use std::sync::Arc;

pub use binance::BinanceSpot;
pub use client::VenueClient;
pub use credentials::VenueCredentials;
pub use error::VenueError;
pub use model::{
    VenueBalanceEntry, VenueBalances, VenueCandle, VenueMarket, VenueOrder, VenueOrderBook,
    VenueOrderRequest, VenueTicker, VenueTrade,
};
pub use symbols::{join_symbol, split_symbol};

/// Exchange ids accepted by [`connect`].
pub const SUPPORTED_EXCHANGES: [&str; 1] = ["binance"];

/// Builds a client for `exchange_id`.
pub fn connect(
    exchange_id: &str,
    credentials: VenueCredentials,
) -> Result<Arc<dyn VenueClient>, VenueError> {
    match exchange_id.trim().to_ascii_lowercase().as_str() {
        "binance" => Ok(Arc::new(BinanceSpot::new(credentials)?)),
        other => Err(VenueError::UnknownExchange {
            exchange_id: other.to_owned(),
        }),
    }
}
