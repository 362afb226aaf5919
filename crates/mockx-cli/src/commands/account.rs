use mockx_core::Gateway;
use serde_json::Value;
use tracing::info;

use crate::cli::{BalanceArgs, TransferArgs};
use crate::error::CliError;

pub async fn balance(args: &BalanceArgs, gateway: &Gateway) -> Result<Value, CliError> {
    Ok(serde_json::to_value(
        gateway.fetch_balance(args.asset.as_deref()).await?,
    )?)
}

pub async fn balance_list(gateway: &Gateway) -> Result<Value, CliError> {
    Ok(serde_json::to_value(gateway.fetch_balance_list().await?)?)
}

pub async fn deposit(args: &TransferArgs, gateway: &Gateway) -> Result<Value, CliError> {
    let receipt = gateway.deposit(&args.asset, args.amount, None).await?;
    info!(asset = %args.asset, amount = args.amount, "deposit accepted");
    Ok(serde_json::to_value(receipt)?)
}

pub async fn withdraw(args: &TransferArgs, gateway: &Gateway) -> Result<Value, CliError> {
    let receipt = gateway.withdraw(&args.asset, args.amount, None).await?;
    info!(asset = %args.asset, amount = args.amount, "withdrawal accepted");
    Ok(serde_json::to_value(receipt)?)
}
