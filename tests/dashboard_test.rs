mod common;

use std::str::FromStr;

use axum::http::{Method, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use common::{read_json, TestApp};

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => Decimal::from_str(s).expect("decimal string"),
        Value::Number(n) => Decimal::from_str(&n.to_string()).expect("decimal number"),
        other => panic!("not a decimal: {other}"),
    }
}

async fn dashboard(app: &TestApp) -> Value {
    let response = app
        .request_authenticated(Method::GET, "/api/v1/dashboard", None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    read_json(response).await["data"].clone()
}

#[tokio::test]
async fn empty_store_yields_zeroes_and_twelve_buckets() {
    let app = TestApp::new().await;
    let data = dashboard(&app).await;

    let stats = &data["stats"];
    assert_eq!(stats["total_orders"], 0);
    assert_eq!(stats["orders_in_transit"], 0);
    assert_eq!(decimal(&stats["total_value"]), Decimal::ZERO);
    assert_eq!(decimal(&stats["total_pending_payment"]), Decimal::ZERO);
    assert!(stats["next_container_date"].is_null());

    let months = data["monthly_volume"].as_array().unwrap();
    assert_eq!(months.len(), 12);
    let labels: Vec<&str> = months.iter().map(|m| m["month"].as_str().unwrap()).collect();
    let mut sorted = labels.clone();
    sorted.sort();
    assert_eq!(labels, sorted);
}

#[tokio::test]
async fn pending_payment_is_value_minus_initial_payment() {
    let app = TestApp::new().await;
    let parties = app.seed_parties().await;
    app.create_order(parties.order_form("PO-DASH-1")).await;

    let stats = dashboard(&app).await["stats"].clone();
    assert_eq!(stats["total_orders"], 1);
    assert_eq!(decimal(&stats["total_value"]), Decimal::from(1000));
    assert_eq!(decimal(&stats["total_initial_payment"]), Decimal::from(400));
    assert_eq!(decimal(&stats["total_pending_payment"]), Decimal::from(600));
}

#[tokio::test]
async fn in_transit_orders_and_containers_are_counted() {
    let app = TestApp::new().await;
    let parties = app.seed_parties().await;

    for (reference, container) in [("PO-T-1", "MSCU0000001"), ("PO-T-2", "MSCU0000001"), ("PO-T-3", "")] {
        let mut form = parties.order_form(reference);
        form["status"] = json!("in_transit");
        form["container_reference"] = json!(container);
        form["eta"] = json!("2999-01-01");
        app.create_order(form).await;
    }
    app.create_order(parties.order_form("PO-P-1")).await;

    let stats = dashboard(&app).await["stats"].clone();
    assert_eq!(stats["total_orders"], 4);
    assert_eq!(stats["orders_in_transit"], 3);
    assert_eq!(stats["containers_in_transit"], 2);
}
