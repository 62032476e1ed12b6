mod common;

use axum::http::StatusCode;
use chrono::Utc;
use common::{assert_money, remote_order, TestApp, LOCATION_ID};
use pos_service::models::{NewOrder, NewOrderItem};
use pos_service::services::PosRepository;
use rust_decimal_macros::dec;
use serde_json::json;

fn burger_order() -> serde_json::Value {
    json!({
        "table_number": "12",
        "location_id": "R1",
        "items": [
            { "name": "Burger", "quantity": 2, "price": 9.99 }
        ]
    })
}

fn local_order(id: &str, table: &str) -> NewOrder {
    NewOrder {
        id: id.to_string(),
        table_number: table.to_string(),
        location_id: "R1".to_string(),
        created_at: Utc::now(),
        items: vec![NewOrderItem {
            name: "Soup".to_string(),
            quantity: 1,
            price: dec!(4.50),
        }],
    }
}

#[tokio::test]
async fn create_order_forwards_minor_units_and_returns_merged_view() {
    let app = TestApp::new();

    let (status, body) = app.post_json("/api/order", &burger_order()).await;

    assert_eq!(status, StatusCode::OK, "body: {}", body);
    assert_eq!(body["id"], "SQ-1");
    assert_eq!(body["table_number"], "12");
    assert_eq!(body["location_id"], "R1");
    assert_eq!(body["is_closed"], false);
    assert_eq!(body["items"].as_array().unwrap().len(), 1);
    assert_eq!(body["items"][0]["name"], "Burger");
    assert_money(&body["items"][0]["unit_price"], 9.99);
    assert_money(&body["items"][0]["quantity"], 2.0);
    assert_money(&body["totals"]["total"], 19.98);
    assert_money(&body["totals"]["paid"], 0.0);

    let sent = app.processor.order_requests();
    assert_eq!(sent.len(), 1);
    let order = &sent[0].order;
    assert_eq!(order.location_id, LOCATION_ID);
    assert_eq!(order.reference_id.as_deref(), Some("12"));
    let item = &order.line_items.as_ref().unwrap()[0];
    assert_eq!(item.quantity, "2");
    assert_eq!(item.base_price_money.as_ref().unwrap().amount, 999);
    assert_eq!(item.base_price_money.as_ref().unwrap().currency, "USD");
    assert!(!sent[0].idempotency_key.is_empty());

    let stored = app.repository.get_order("SQ-1").await.unwrap().unwrap();
    assert_eq!(stored.table_number, "12");
    assert_eq!(stored.items.len(), 1);
    assert_eq!(stored.items[0].price, dec!(9.99));
}

#[tokio::test]
async fn get_order_unknown_locally_is_404_without_remote_call() {
    let app = TestApp::new();
    app.processor.seed(remote_order("REMOTE-ONLY", "3", "OPEN"));

    let (status, _) = app.get("/api/order/REMOTE-ONLY").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.processor.calls().is_empty());
}

#[tokio::test]
async fn get_order_returns_current_remote_view() {
    let app = TestApp::new();
    let (status, _) = app.post_json("/api/order", &burger_order()).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.get("/api/order/SQ-1").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_closed"], false);
    assert_eq!(body["location_id"], LOCATION_ID);
    assert_money(&body["items"][0]["amount"], 19.98);
    assert_eq!(body["items"][0]["modifiers"], json!([]));
    assert_eq!(body["items"][0]["discounts"], json!([]));

    app.processor.set_state("SQ-1", "COMPLETED");
    let (_, body) = app.get("/api/order/SQ-1").await;
    assert_eq!(body["is_closed"], true);
}

#[tokio::test]
async fn order_known_locally_but_missing_remotely_is_404() {
    let app = TestApp::new();
    app.repository
        .add_order(local_order("GONE", "4"))
        .await
        .unwrap();

    let (status, body) = app.get("/api/order/GONE").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Order with ID GONE was not found.");
    assert_eq!(app.processor.calls(), vec!["retrieve_order"]);
}

#[tokio::test]
async fn orders_by_table_only_include_matching_reference() {
    let app = TestApp::new();
    app.repository
        .add_order(local_order("A", "7"))
        .await
        .unwrap();
    app.processor.seed(remote_order("A", "7", "OPEN"));
    app.processor.seed(remote_order("B", "12", "OPEN"));

    let (status, body) = app.get("/api/order/table/7").await;

    assert_eq!(status, StatusCode::OK);
    let orders = body.as_array().unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0]["id"], "A");
    assert_eq!(orders[0]["table_number"], "7");
}

#[tokio::test]
async fn orders_by_table_without_local_orders_is_404() {
    let app = TestApp::new();
    app.processor.seed(remote_order("A", "7", "OPEN"));

    let (status, _) = app.get("/api/order/table/7").await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(app.processor.calls().is_empty());
}

#[tokio::test]
async fn invalid_order_is_rejected_before_any_remote_call() {
    let app = TestApp::new();

    let cases = [
        json!({ "table_number": "", "location_id": "R1", "items": [] }),
        json!({
            "table_number": "12",
            "location_id": "R1",
            "items": [{ "name": "Burger", "quantity": 0, "price": 9.99 }]
        }),
        json!({
            "table_number": "12",
            "location_id": "R1",
            "items": [{ "name": "Burger", "quantity": 1, "price": -1 }]
        }),
        json!({
            "table_number": "12",
            "location_id": "R1",
            "items": [{
                "name": "Burger",
                "quantity": 1,
                "price": 9.99,
                "modifiers": [{ "name": "Cheese", "unit_price": 1.0, "quantity": 0 }]
            }]
        }),
    ];

    for case in cases {
        let (status, body) = app.post_json("/api/order", &case).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "case: {}", case);
        assert_eq!(body["error"], "Validation error");
    }

    assert!(app.processor.calls().is_empty());
}

#[tokio::test]
async fn processor_failure_is_bad_gateway_and_nothing_is_stored() {
    let app = TestApp::new();
    app.processor.fail_with("INVALID_REQUEST_ERROR - location not active");

    let (status, body) = app.post_json("/api/order", &burger_order()).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert!(body["error"]
        .as_str()
        .unwrap()
        .contains("external processor error: INVALID_REQUEST_ERROR - location not active"));
    assert!(app
        .repository
        .get_orders_by_table("12")
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn quantity_beyond_local_range_never_reaches_processor() {
    let app = TestApp::new();

    let (status, body) = app
        .post_json(
            "/api/order",
            &json!({
                "table_number": "12",
                "location_id": "R1",
                "items": [{ "name": "Burger", "quantity": 3000000000u64, "price": 9.99 }]
            }),
        )
        .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "body: {}", body);
    assert!(app.processor.calls().is_empty());
    assert!(app.processor.order_requests().is_empty());
    assert!(app
        .repository
        .get_orders_by_table("12")
        .await
        .unwrap()
        .is_empty());
}
