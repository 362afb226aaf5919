//! CLI argument definitions for mockx.
//!
//! Every subcommand goes through the same gateway facade, so a command that works against the
//! simulated venue works unchanged against a live one once `--mode prod` is set.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `capabilities` | Print the operation table for the resolved mode |
//! | `markets` | List markets |
//! | `ticker` | Fetch one ticker per symbol |
//! | `tickers` | Fetch tickers for all or some symbols |
//! | `ohlcv` | Fetch candles (prod only) |
//! | `book` | Fetch an order book (prod only) |
//! | `trades` | Fetch public trades (prod only) |
//! | `my-trades` | Fetch account trades (prod only) |
//! | `balance` | Fetch the account balance |
//! | `balance-list` | List funded assets (paper only) |
//! | `order` | Create, inspect, list and cancel orders |
//! | `deposit` / `withdraw` | Move simulated funds (paper only) |
//! | `can-execute` | Dry-run an order against available funds (paper only) |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--mode` | `paper` | Execution target (paper, prod) |
//! | `--config` | `mockx.toml` if present | TOML settings file |
//! | `--offline` | `false` | Serve paper mode from an in-memory venue |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! # Quote two symbols on the paper venue
//! mockx ticker BTC/USDT ETH/USDT --pretty
//!
//! # Place a resting limit order
//! mockx order create BTC/USDT buy 0.1 --type limit --price 40000
//!
//! # Same command against the live venue's sandbox
//! MOCKX_SANDBOX=true mockx --mode prod order open --symbol BTC/USDT
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use mockx_core::{OrderSide, OrderStatus, OrderType};

/// mockx - one trading gateway over a simulated and a live venue
#[derive(Debug, Parser)]
#[command(
    name = "mockx",
    author,
    version,
    about = "Trade against a simulated or live venue through one gateway",
    long_about = "mockx exposes the gateway facade on the command line. Paper mode talks to the \
simulated REST venue (or an in-memory one with --offline); prod mode talks to a live venue.\n\
\n\
Settings resolve from defaults, then mockx.toml, then MOCKEXCHANGE_* and MOCKX_* environment \
variables, then flags.\n\
\n\
Use 'mockx <command> --help' for command-specific help."
)]
pub struct Cli {
    /// Execution target. Overrides the settings file and MOCKX_MODE.
    #[arg(long, global = true)]
    pub mode: Option<String>,

    /// Settings file. Defaults to ./mockx.toml when it exists.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Serve paper mode from an in-memory venue instead of the REST service.
    ///
    /// State lives for one invocation only.
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Pretty-print JSON output.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the operation table of the resolved mode.
    Capabilities,

    /// List markets.
    Markets(MarketsArgs),

    /// Fetch the ticker of each symbol.
    Ticker(TickerArgs),

    /// Fetch tickers keyed by symbol.
    Tickers(TickersArgs),

    /// Fetch OHLCV candles.
    Ohlcv(OhlcvArgs),

    /// Fetch an order book.
    Book(BookArgs),

    /// Fetch public trades.
    Trades(TradesArgs),

    /// Fetch the account's own trades.
    MyTrades(MyTradesArgs),

    /// Fetch the account balance.
    Balance(BalanceArgs),

    /// List the assets held by the account.
    BalanceList,

    /// Order management.
    Order(OrderArgs),

    /// Credit simulated funds.
    Deposit(TransferArgs),

    /// Debit simulated funds.
    Withdraw(TransferArgs),

    /// Check whether an order could execute with the current funds.
    CanExecute(OrderSpec),
}

#[derive(Debug, Clone, Args)]
pub struct MarketsArgs {
    /// Only print these symbols.
    #[arg(long = "symbol", value_name = "SYMBOL")]
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TickerArgs {
    /// Symbols in BASE/QUOTE form.
    #[arg(required = true, num_args = 1.., value_name = "SYMBOL")]
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TickersArgs {
    /// Symbols in BASE/QUOTE form. Omit for every listed symbol.
    #[arg(value_name = "SYMBOL")]
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct OhlcvArgs {
    pub symbol: String,

    #[arg(long, default_value = "1m")]
    pub timeframe: String,

    /// Start time in epoch milliseconds.
    #[arg(long)]
    pub since: Option<i64>,

    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct BookArgs {
    pub symbol: String,

    /// Depth per side.
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct TradesArgs {
    pub symbol: String,

    #[arg(long)]
    pub since: Option<i64>,

    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct MyTradesArgs {
    #[arg(long)]
    pub symbol: Option<String>,

    #[arg(long)]
    pub since: Option<i64>,

    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct BalanceArgs {
    /// Restrict the balance to one asset.
    #[arg(long)]
    pub asset: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct TransferArgs {
    pub asset: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Args)]
pub struct OrderArgs {
    #[command(subcommand)]
    pub action: OrderAction,
}

#[derive(Debug, Clone, Subcommand)]
pub enum OrderAction {
    /// Place an order.
    Create(OrderSpec),

    /// Fetch one order by id.
    Get(OrderRef),

    /// List orders, oldest first.
    List(OrderListArgs),

    /// List orders still on the book.
    Open(SymbolArg),

    /// List orders in a terminal state.
    Closed(ClosedArgs),

    /// Cancel a resting order.
    Cancel(OrderRef),
}

/// Order parameters shared by `order create` and `can-execute`.
#[derive(Debug, Clone, Args)]
pub struct OrderSpec {
    pub symbol: String,

    /// buy or sell.
    pub side: OrderSide,

    pub amount: f64,

    /// market or limit.
    #[arg(long = "type", default_value = "market")]
    pub order_type: OrderType,

    /// Limit price. Required for limit orders.
    #[arg(long)]
    pub price: Option<f64>,

    /// Venue-specific parameter as KEY=VALUE. VALUE is read as JSON when it parses.
    #[arg(long = "param", value_name = "KEY=VALUE")]
    pub params: Vec<String>,
}

#[derive(Debug, Clone, Args)]
pub struct OrderRef {
    pub id: String,

    /// Symbol hint, required by some live venues.
    #[arg(long)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct OrderListArgs {
    #[arg(long)]
    pub symbol: Option<String>,

    #[arg(long)]
    pub status: Option<OrderStatus>,

    #[arg(long)]
    pub side: Option<OrderSide>,

    /// Keep only the last N matches.
    #[arg(long)]
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Args)]
pub struct SymbolArg {
    #[arg(long)]
    pub symbol: Option<String>,
}

#[derive(Debug, Clone, Args)]
pub struct ClosedArgs {
    #[arg(long)]
    pub symbol: Option<String>,

    #[arg(long)]
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use clap::{CommandFactory, Parser};

    use super::*;

    #[test]
    fn definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "mockx", "order", "create", "BTC/USDT", "buy", "0.5", "--type", "limit", "--price",
            "40000", "--offline", "--pretty",
        ])
        .expect("parses");

        assert!(cli.offline);
        assert!(cli.pretty);
        let Command::Order(OrderArgs {
            action: OrderAction::Create(spec),
        }) = cli.command
        else {
            panic!("expected order create");
        };
        assert_eq!(spec.side, OrderSide::Buy);
        assert_eq!(spec.order_type, OrderType::Limit);
        assert_eq!(spec.price, Some(40_000.0));
    }

    #[test]
    fn unknown_sides_are_rejected_by_the_parser() {
        let error = Cli::try_parse_from(["mockx", "can-execute", "BTC/USDT", "hold", "1"])
            .expect_err("hold is not a side");
        assert!(error.to_string().contains("hold"));
    }

    #[test]
    fn ticker_needs_at_least_one_symbol() {
        assert!(Cli::try_parse_from(["mockx", "ticker"]).is_err());
        let cli = Cli::try_parse_from(["mockx", "tickers"]).expect("no symbols is fine");
        let Command::Tickers(args) = cli.command else {
            panic!("expected tickers");
        };
        assert!(args.symbols.is_empty());
    }
}
