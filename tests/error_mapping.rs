mod support;

use std::sync::Arc;

use mockx_core::{ErrorKind, HttpError, HttpResponse, OrderFilter, OrderSide, OrderStatus};
use serde_json::json;
use support::{paper_gateway, sim_gateway, ScriptedHttp};

#[tokio::test]
async fn paper_http_statuses_map_to_the_taxonomy() {
    // Given: scripted replies for each status the simulated venue uses
    let http = Arc::new(ScriptedHttp::new());
    http.reply(400, r#"{"detail":"amount must be a positive number"}"#)
        .reply(401, r#"{"detail":"invalid API key"}"#)
        .reply(403, r#"{"message":"forbidden"}"#)
        .reply(404, r#"{"detail":"order 9 not found"}"#)
        .reply(404, r#"{"detail":"asset DOGE not found"}"#)
        .reply(422, r#"{"detail":"insufficient USDT"}"#)
        .reply(503, "maintenance window");
    let gateway = paper_gateway(http.clone());

    // When: one call consumes each reply
    let bad = gateway.fetch_balance_list().await.expect_err("400");
    let unauthorized = gateway.fetch_balance(None).await.expect_err("401");
    let forbidden = gateway.fetch_balance(None).await.expect_err("403");
    let no_order = gateway.fetch_order("9", None).await.expect_err("404 on orders");
    let no_asset = gateway.fetch_balance(Some("DOGE")).await.expect_err("404 elsewhere");
    let funds = gateway.deposit("USDT", 1.0, None).await.expect_err("422");
    let down = gateway.fetch_balance(None).await.expect_err("503");

    // Then: each status lands in its category with the venue's message and raw body
    assert_eq!(bad.kind(), ErrorKind::BadRequest);
    assert_eq!(bad.message(), "amount must be a positive number");
    assert_eq!(unauthorized.kind(), ErrorKind::Authentication);
    assert_eq!(forbidden.kind(), ErrorKind::Authentication);
    assert_eq!(forbidden.message(), "forbidden");
    assert_eq!(no_order.kind(), ErrorKind::OrderNotFound);
    assert_eq!(no_order.info(), Some(&json!({"detail": "order 9 not found"})));
    assert_eq!(no_asset.kind(), ErrorKind::BadRequest);
    assert_eq!(funds.kind(), ErrorKind::InsufficientFunds);
    assert_eq!(down.kind(), ErrorKind::Exchange);
    assert_eq!(down.message(), "HTTP 503: maintenance window");
    assert_eq!(down.info(), Some(&json!("maintenance window")));
    assert_eq!(
        http.paths(),
        [
            "/balance/list",
            "/balance",
            "/balance",
            "/orders/9",
            "/balance/DOGE",
            "/balance/USDT/deposit",
            "/balance",
        ]
    );
}

#[tokio::test]
async fn transport_failures_are_retryable_network_errors() {
    let http = Arc::new(ScriptedHttp::new());
    http.fail(HttpError::timeout("deadline elapsed"))
        .fail(HttpError::connect("connection refused"));
    let gateway = paper_gateway(http);

    let timeout = gateway.fetch_balance(None).await.expect_err("timeout");
    let refused = gateway.fetch_balance(None).await.expect_err("refused");

    assert_eq!(timeout.kind(), ErrorKind::Network);
    assert!(timeout.retryable());
    assert!(timeout.message().contains("timed out"));
    assert_eq!(refused.kind(), ErrorKind::Network);
    assert!(refused.message().contains("connection refused"));
}

#[tokio::test]
async fn injected_venue_failures_precede_normal_routing() {
    // Given: the in-memory venue stalls once, then answers with a server error
    let (sim, gateway) = sim_gateway();
    sim.inject(Err(HttpError::timeout("venue stalled")));
    sim.inject(Ok(HttpResponse::new(500, r#"{"detail":"matching engine restart"}"#)));

    // When: three balance reads follow
    let stalled = gateway.fetch_balance(None).await.expect_err("timeout");
    let restarting = gateway.fetch_balance(None).await.expect_err("500");
    let recovered = gateway.fetch_balance(Some("USDT")).await.expect("routed normally");

    // Then: the canned outcomes come first and every call is recorded
    assert_eq!(stalled.kind(), ErrorKind::Network);
    assert_eq!(restarting.kind(), ErrorKind::Exchange);
    assert_eq!(restarting.message(), "HTTP 500: matching engine restart");
    assert_eq!(recovered.get("USDT").map(|entry| entry.free()), Some(10_000.0));
    assert_eq!(sim.request_count(), 3);
}

#[tokio::test]
async fn malformed_success_bodies_are_reported() {
    // Given: a 200 that is not JSON, then a 200 with an empty body
    let http = Arc::new(ScriptedHttp::new());
    http.reply(200, "<html>proxy</html>").reply(200, "   ");
    let gateway = paper_gateway(http);

    // When: balances are fetched against both
    let html = gateway.fetch_balance(None).await.expect_err("not JSON");
    let empty = gateway.fetch_balance(None).await.expect_err("empty");

    // Then: unparseable text is an exchange error, an empty body fails mapping
    assert_eq!(html.kind(), ErrorKind::Exchange);
    assert!(html.message().starts_with("invalid JSON response"));
    assert_eq!(html.info(), Some(&json!("<html>proxy</html>")));
    assert_eq!(empty.kind(), ErrorKind::Mapping);
}

#[tokio::test]
async fn every_native_paper_status_has_a_canonical_counterpart() {
    // Given: one resting order whose native status is rewritten in turn
    let (sim, gateway) = sim_gateway();
    sim.set_quote("BTC/USDT", 100.0, 99.0, 101.0);
    let order = gateway
        .create_limit_order("BTC/USDT", OrderSide::Buy, 1.0, 50.0, None)
        .await
        .expect("resting order");

    let table = [
        ("new", OrderStatus::Open),
        ("partially_filled", OrderStatus::PartiallyFilled),
        ("filled", OrderStatus::Closed),
        ("canceled", OrderStatus::Canceled),
        ("partially_canceled", OrderStatus::Canceled),
        ("expired", OrderStatus::Expired),
        ("partially_expired", OrderStatus::Expired),
        ("rejected", OrderStatus::Rejected),
        ("partially_rejected", OrderStatus::Rejected),
    ];

    for (native, canonical) in table {
        // When: the venue reports the native status
        assert!(sim.set_order_status(&order.id, native));
        let fetched = gateway.fetch_order(&order.id, None).await.expect("maps");

        // Then: the canonical status follows the table
        assert_eq!(fetched.status, canonical, "{native}");
    }
}

#[tokio::test]
async fn statuses_outside_the_table_are_mapping_errors() {
    // Given: one order with a status the table does not know and one resting order
    let (sim, gateway) = sim_gateway();
    sim.set_quote("BTC/USDT", 100.0, 99.0, 101.0);
    let odd = gateway
        .create_limit_order("BTC/USDT", OrderSide::Buy, 1.0, 50.0, None)
        .await
        .expect("order");
    let resting = gateway
        .create_limit_order("BTC/USDT", OrderSide::Buy, 1.0, 60.0, None)
        .await
        .expect("order");
    assert!(sim.set_order_status(&odd.id, "suspended"));

    // When: the odd order is read directly, in a listing, and through the open filter
    let direct = gateway.fetch_order(&odd.id, None).await.expect_err("unknown status");
    let listed = gateway
        .fetch_orders(&OrderFilter::new())
        .await
        .expect_err("listing includes it");
    let open = gateway.fetch_open_orders(None).await.expect("open filter skips it");

    // Then: translation fails loudly, while the native open filter never reaches it
    assert_eq!(direct.kind(), ErrorKind::Mapping);
    assert!(direct.message().contains("suspended"));
    assert_eq!(direct.info().and_then(|info| info.get("status")), Some(&json!("suspended")));
    assert_eq!(listed.kind(), ErrorKind::Mapping);
    assert_eq!(open.len(), 1);
    assert_eq!(open[0].id, resting.id);
}

#[tokio::test]
async fn malformed_order_payloads_carry_the_raw_object() {
    let http = Arc::new(ScriptedHttp::new());
    http.reply_json(json!({"id": "1", "symbol": "BTC/USDT", "side": "buy", "type": "limit"}))
        .reply_json(json!({
            "id": "2", "symbol": "BTC/USDT", "side": "hold", "type": "limit",
            "status": "new", "amount": 1.0
        }));
    let gateway = paper_gateway(http);

    let no_status = gateway.fetch_order("1", None).await.expect_err("no status");
    let bad_side = gateway.fetch_order("2", None).await.expect_err("bad side");

    assert_eq!(no_status.kind(), ErrorKind::Mapping);
    assert_eq!(no_status.info().and_then(|info| info.get("id")), Some(&json!("1")));
    assert_eq!(bad_side.kind(), ErrorKind::Mapping);
    assert_eq!(bad_side.info().and_then(|info| info.get("side")), Some(&json!("hold")));
}

#[test]
fn errors_serialize_with_kind_message_and_info() {
    let error = mockx_core::GatewayError::insufficient_funds("insufficient USDT")
        .with_info(json!({"detail": "insufficient USDT"}));

    let rendered = serde_json::to_value(&error).expect("serializes");

    assert_eq!(rendered["kind"], "insufficient_funds");
    assert_eq!(rendered["message"], "insufficient USDT");
    assert_eq!(rendered["info"]["detail"], "insufficient USDT");
    assert_eq!(error.code(), "gateway.insufficient_funds");
    assert_eq!(error.to_string(), "insufficient USDT");
}
