use mockx_core::Gateway;
use serde_json::{json, Value};

use crate::cli::{
    BookArgs, MarketsArgs, MyTradesArgs, OhlcvArgs, TickerArgs, TickersArgs, TradesArgs,
};
use crate::error::CliError;

pub fn capabilities(gateway: &Gateway) -> Result<Value, CliError> {
    Ok(json!({
        "mode": gateway.mode().as_str(),
        "target": gateway.target(),
        "has": serde_json::to_value(gateway.has())?,
    }))
}

pub async fn markets(args: &MarketsArgs, gateway: &mut Gateway) -> Result<Value, CliError> {
    let markets = gateway.load_markets(false).await?;
    if args.symbols.is_empty() {
        return Ok(serde_json::to_value(markets.values().collect::<Vec<_>>())?);
    }

    let mut selected = Vec::with_capacity(args.symbols.len());
    for symbol in &args.symbols {
        selected.push(gateway.market(symbol)?);
    }
    Ok(serde_json::to_value(selected)?)
}

pub async fn ticker(args: &TickerArgs, gateway: &Gateway) -> Result<Value, CliError> {
    let mut tickers = Vec::with_capacity(args.symbols.len());
    for symbol in &args.symbols {
        tickers.push(gateway.fetch_ticker(symbol).await?);
    }
    Ok(serde_json::to_value(tickers)?)
}

pub async fn tickers(args: &TickersArgs, gateway: &Gateway) -> Result<Value, CliError> {
    let symbols = args.symbols.iter().map(String::as_str).collect::<Vec<_>>();
    let selection = (!symbols.is_empty()).then_some(symbols.as_slice());
    Ok(serde_json::to_value(gateway.fetch_tickers(selection).await?)?)
}

pub async fn ohlcv(args: &OhlcvArgs, gateway: &Gateway) -> Result<Value, CliError> {
    let candles = gateway
        .fetch_ohlcv(&args.symbol, &args.timeframe, args.since, args.limit)
        .await?;
    Ok(serde_json::to_value(candles)?)
}

pub async fn book(args: &BookArgs, gateway: &Gateway) -> Result<Value, CliError> {
    Ok(serde_json::to_value(
        gateway.fetch_order_book(&args.symbol, args.limit).await?,
    )?)
}

pub async fn trades(args: &TradesArgs, gateway: &Gateway) -> Result<Value, CliError> {
    let trades = gateway
        .fetch_trades(&args.symbol, args.since, args.limit)
        .await?;
    Ok(serde_json::to_value(trades)?)
}

pub async fn my_trades(args: &MyTradesArgs, gateway: &Gateway) -> Result<Value, CliError> {
    let trades = gateway
        .fetch_my_trades(args.symbol.as_deref(), args.since, args.limit)
        .await?;
    Ok(serde_json::to_value(trades)?)
}
