//! Integration tests for order history and the Stripe webhook endpoint.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The storefront server running (cargo run -p colibri-storefront)
//!
//! Run with: cargo test -p colibri-integration-tests -- --ignored

use colibri_integration_tests::{client_for_user, storefront_base_url, unique_user_id};
use reqwest::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_order_history_starts_empty() {
    let client = client_for_user(unique_user_id());
    let resp = client
        .get(format!("{}/api/orders", storefront_base_url()))
        .send()
        .await
        .expect("Failed to list orders");

    assert_eq!(resp.status(), StatusCode::OK);
    let orders: Vec<Value> = resp.json().await.expect("Failed to parse orders");
    assert!(orders.is_empty());
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_cancellation_for_unknown_order_is_not_found() {
    let client = client_for_user(unique_user_id());
    let resp = client
        .post(format!(
            "{}/api/orders/999999999/cancellation",
            storefront_base_url()
        ))
        .json(&json!({ "reason": "CHANGED_MIND" }))
        .send()
        .await
        .expect("Failed to send cancellation request");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_webhook_rejects_missing_signature() {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/webhooks/stripe", storefront_base_url()))
        .body(r#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_test"}}}"#)
        .send()
        .await
        .expect("Failed to send webhook");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_webhook_rejects_bad_signature() {
    let client = reqwest::Client::new();
    let resp = client
        .post(format!("{}/api/webhooks/stripe", storefront_base_url()))
        .header("stripe-signature", "t=1,v1=deadbeef")
        .body(r#"{"type":"payment_intent.succeeded","data":{"object":{"id":"pi_test"}}}"#)
        .send()
        .await
        .expect("Failed to send webhook");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
