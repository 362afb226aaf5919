mod account;
mod market;
mod order;
mod symbol;
mod timestamp;

pub use account::{Balance, BalanceEntry, BalanceList, TransferReceipt};
pub use market::{Candle, Market, MarketLimits, MarketPrecision, OrderBook, Ticker, Trade};
pub use order::{
    ExecutionCheck, Order, OrderFilter, OrderRequest, OrderSide, OrderStatus, OrderType, Params,
};
pub use symbol::Symbol;
pub use timestamp::UtcDateTime;
