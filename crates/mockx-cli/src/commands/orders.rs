use mockx_core::{Gateway, GatewayError, OrderFilter, Symbol};
use serde_json::Value;
use tracing::info;

use super::parse_params;
use crate::cli::{OrderAction, OrderListArgs, OrderSpec};
use crate::error::CliError;

pub async fn run(action: &OrderAction, gateway: &Gateway) -> Result<Value, CliError> {
    match action {
        OrderAction::Create(spec) => {
            let order = gateway
                .create_order(
                    &spec.symbol,
                    spec.order_type,
                    spec.side,
                    spec.amount,
                    spec.price,
                    parse_params(&spec.params)?,
                )
                .await?;
            info!(id = %order.id, status = %order.status, "order placed");
            Ok(serde_json::to_value(order)?)
        }
        OrderAction::Get(order) => Ok(serde_json::to_value(
            gateway.fetch_order(&order.id, order.symbol.as_deref()).await?,
        )?),
        OrderAction::List(args) => Ok(serde_json::to_value(
            gateway.fetch_orders(&filter(args)?).await?,
        )?),
        OrderAction::Open(args) => Ok(serde_json::to_value(
            gateway.fetch_open_orders(args.symbol.as_deref()).await?,
        )?),
        OrderAction::Closed(args) => Ok(serde_json::to_value(
            gateway
                .fetch_closed_orders(args.symbol.as_deref(), args.limit)
                .await?,
        )?),
        OrderAction::Cancel(order) => {
            let canceled = gateway
                .cancel_order(&order.id, order.symbol.as_deref())
                .await?;
            info!(id = %canceled.id, status = %canceled.status, "order canceled");
            Ok(serde_json::to_value(canceled)?)
        }
    }
}

pub async fn can_execute(spec: &OrderSpec, gateway: &Gateway) -> Result<Value, CliError> {
    let check = gateway
        .can_execute_order(
            &spec.symbol,
            spec.order_type,
            spec.side,
            spec.amount,
            spec.price,
            parse_params(&spec.params)?,
        )
        .await?;
    Ok(serde_json::to_value(check)?)
}

fn filter(args: &OrderListArgs) -> Result<OrderFilter, CliError> {
    let mut filter = OrderFilter::new();
    if let Some(symbol) = &args.symbol {
        filter = filter.with_symbol(Symbol::parse(symbol).map_err(GatewayError::from)?);
    }
    if let Some(status) = args.status {
        filter = filter.with_status(status);
    }
    if let Some(side) = args.side {
        filter = filter.with_side(side);
    }
    if let Some(limit) = args.limit {
        filter = filter.with_limit(limit);
    }
    Ok(filter)
}
