mod account;
mod market;
mod orders;

use std::sync::Arc;

use mockx_core::{Gateway, GatewayFactory, Mode, Params, SimVenue};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;
use crate::settings::Settings;

/// Quotes the in-memory venue starts with: symbol, last, bid, ask.
const OFFLINE_QUOTES: [(&str, f64, f64, f64); 3] = [
    ("BTC/USDT", 42_000.0, 41_990.0, 42_010.0),
    ("ETH/USDT", 2_500.0, 2_499.0, 2_501.0),
    ("SOL/USDT", 100.0, 99.9, 100.1),
];

/// Builds the gateway the resolved settings describe.
pub fn connect(cli: &Cli, settings: &Settings) -> Result<Gateway, CliError> {
    if !cli.offline {
        let (mode, config) = settings.gateway_config()?;
        return Ok(GatewayFactory::new().create_for(mode, &config)?);
    }

    let mode = settings.mode()?;
    if mode != Mode::Paper {
        return Err(CliError::Argument(format!(
            "--offline serves paper mode only, resolved mode is {mode}"
        )));
    }
    Ok(GatewayFactory::new()
        .with_http_client(Arc::new(offline_venue()))
        .create_for(Mode::Paper, &settings.offline_config())?)
}

pub async fn run(command: &Command, gateway: &mut Gateway) -> Result<Value, CliError> {
    match command {
        Command::Capabilities => market::capabilities(gateway),
        Command::Markets(args) => market::markets(args, gateway).await,
        Command::Ticker(args) => market::ticker(args, gateway).await,
        Command::Tickers(args) => market::tickers(args, gateway).await,
        Command::Ohlcv(args) => market::ohlcv(args, gateway).await,
        Command::Book(args) => market::book(args, gateway).await,
        Command::Trades(args) => market::trades(args, gateway).await,
        Command::MyTrades(args) => market::my_trades(args, gateway).await,
        Command::Balance(args) => account::balance(args, gateway).await,
        Command::BalanceList => account::balance_list(gateway).await,
        Command::Deposit(args) => account::deposit(args, gateway).await,
        Command::Withdraw(args) => account::withdraw(args, gateway).await,
        Command::Order(args) => orders::run(&args.action, gateway).await,
        Command::CanExecute(spec) => orders::can_execute(spec, gateway).await,
    }
}

fn offline_venue() -> SimVenue {
    let venue = SimVenue::new();
    for (symbol, last, bid, ask) in OFFLINE_QUOTES {
        venue.set_quote(symbol, last, bid, ask);
    }
    venue
}

/// Parses repeated `KEY=VALUE` flags. Values that parse as JSON keep their type.
fn parse_params(raw: &[String]) -> Result<Option<Params>, CliError> {
    if raw.is_empty() {
        return Ok(None);
    }

    let mut params = Params::new();
    for entry in raw {
        let (key, value) = entry
            .split_once('=')
            .ok_or_else(|| CliError::Argument(format!("param '{entry}' must be KEY=VALUE")))?;
        let key = key.trim();
        if key.is_empty() {
            return Err(CliError::Argument(format!("param '{entry}' has an empty key")));
        }
        let value = serde_json::from_str(value)
            .unwrap_or_else(|_| Value::String(value.to_owned()));
        params.insert(key.to_owned(), value);
    }
    Ok(Some(params))
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use serde_json::json;

    use super::*;

    fn offline(args: &[&str]) -> (Cli, Gateway) {
        let cli = Cli::try_parse_from(args).expect("parses");
        let settings = Settings {
            mode: String::from("paper"),
            timeout_ms: 1_000,
            paper: Default::default(),
            prod: Default::default(),
        };
        let gateway = connect(&cli, &settings).expect("offline gateway");
        (cli, gateway)
    }

    #[test]
    fn params_keep_json_types() {
        let raw = [
            String::from("timeInForce=GTC"),
            String::from("postOnly=true"),
            String::from("clientOrderId=\"42\""),
        ];

        let params = parse_params(&raw).expect("parses").expect("some");

        assert_eq!(params["timeInForce"], json!("GTC"));
        assert_eq!(params["postOnly"], json!(true));
        assert_eq!(params["clientOrderId"], json!("42"));
        assert_eq!(parse_params(&[]).expect("empty"), None);
        assert!(parse_params(&[String::from("novalue")]).is_err());
        assert!(parse_params(&[String::from("=1")]).is_err());
    }

    #[test]
    fn offline_refuses_prod_mode() {
        let cli = Cli::try_parse_from(["mockx", "--offline", "capabilities"]).expect("parses");
        let settings = Settings {
            mode: String::from("prod"),
            timeout_ms: 1_000,
            paper: Default::default(),
            prod: Default::default(),
        };

        let error = connect(&cli, &settings).expect_err("offline is paper only");

        assert_eq!(error.exit_code(), 2);
    }

    #[tokio::test]
    async fn offline_capabilities_report_the_paper_table() {
        let (cli, mut gateway) = offline(&["mockx", "--offline", "capabilities"]);

        let value = run(&cli.command, &mut gateway).await.expect("capabilities");

        assert_eq!(value["mode"], "paper");
        assert_eq!(value["has"]["fetchOHLCV"], false);
        assert_eq!(value["has"]["canExecuteOrder"], true);
    }

    #[tokio::test]
    async fn offline_order_flow_runs_against_the_seeded_venue() {
        let (_, mut gateway) = offline(&["mockx", "--offline", "capabilities"]);
        let create = Cli::try_parse_from([
            "mockx", "order", "create", "BTC/USDT", "buy", "0.1", "--type", "limit", "--price",
            "40000",
        ])
        .expect("parses");
        let open = Cli::try_parse_from(["mockx", "order", "open"]).expect("parses");
        let tickers = Cli::try_parse_from(["mockx", "tickers", "ETH/USDT"]).expect("parses");

        let order = run(&create.command, &mut gateway).await.expect("order");
        let listed = run(&open.command, &mut gateway).await.expect("open orders");
        let quoted = run(&tickers.command, &mut gateway).await.expect("tickers");

        assert_eq!(order["status"], "open");
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
        assert_eq!(quoted["ETH/USDT"]["last"], 2_500.0);
    }

    #[tokio::test]
    async fn disabled_operations_surface_as_not_supported() {
        let (cli, mut gateway) = offline(&["mockx", "--offline", "ohlcv", "BTC/USDT"]);

        let error = run(&cli.command, &mut gateway).await.expect_err("disabled");

        assert_eq!(error.exit_code(), 4);
    }
}
