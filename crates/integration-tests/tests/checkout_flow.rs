//! Integration tests for the checkout flow.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The storefront server running (cargo run -p colibri-storefront)
//!
//! Run with: cargo test -p colibri-integration-tests -- --ignored

use colibri_integration_tests::{
    client_for_user, fixture_pool, seed_cart, seed_product, storefront_base_url, unique_user_id,
};
use reqwest::StatusCode;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_health() {
    let resp = reqwest::get(format!("{}/health", storefront_base_url()))
        .await
        .expect("Failed to reach storefront");
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_missing_user_header_is_unauthorized() {
    let client = reqwest::Client::new();
    let resp = client
        .get(format!("{}/api/orders", storefront_base_url()))
        .send()
        .await
        .expect("Failed to send request");
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_start_requires_cart() {
    let user_id = unique_user_id();
    let client = client_for_user(user_id);
    let base_url = storefront_base_url();

    let resp = client
        .post(format!("{base_url}/api/checkout/start"))
        .send()
        .await
        .expect("Failed to start checkout");

    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body: Value = resp.json().await.expect("Failed to parse error body");
    assert_eq!(body["code"], "EMPTY_CART");
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_full_checkout_flow() {
    let pool = fixture_pool().await;
    let user_id = unique_user_id();
    let client = client_for_user(user_id);
    let base_url = storefront_base_url();

    let product_id = seed_product(&pool, "Rebozo de prueba", dec!(650.00), 10).await;
    seed_cart(
        &pool,
        user_id,
        product_id,
        "Rebozo de prueba",
        dec!(650.00),
        1,
    )
    .await;

    // Start the session
    let resp = client
        .post(format!("{base_url}/api/checkout/start"))
        .send()
        .await
        .expect("Failed to start checkout");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let session: Value = resp.json().await.expect("Failed to parse session");
    assert_eq!(session["step"], "SHIPPING");
    assert_eq!(session["item_count"], 1);

    // Create an address
    let resp = client
        .post(format!("{base_url}/api/addresses"))
        .json(&json!({
            "recipient_name": "Valentina Ríos",
            "phone": "5512345678",
            "street": "Av. Insurgentes Sur",
            "exterior_number": "1234",
            "neighborhood": "Del Valle",
            "city": "Ciudad de México",
            "state": "Ciudad de México",
            "postal_code": "03100",
            "is_default": true
        }))
        .send()
        .await
        .expect("Failed to create address");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let address: Value = resp.json().await.expect("Failed to parse address");
    let address_id = address["id"].as_i64().expect("address id");

    // Shipping options for that address. Subtotal is over the free
    // shipping threshold, so standard shipping must be free.
    let resp = client
        .get(format!(
            "{base_url}/api/checkout/shipping-options?address_id={address_id}"
        ))
        .send()
        .await
        .expect("Failed to get shipping options");
    assert_eq!(resp.status(), StatusCode::OK);
    let options: Vec<Value> = resp.json().await.expect("Failed to parse options");
    assert!(!options.is_empty());
    let standard = options
        .iter()
        .find(|o| o["tier"] == "STANDARD")
        .expect("standard option present");
    assert_eq!(standard["is_free"], true);

    // Select address and shipping, then advance to payment
    let resp = client
        .post(format!("{base_url}/api/checkout/address"))
        .json(&json!({ "address_id": address_id }))
        .send()
        .await
        .expect("Failed to select address");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base_url}/api/checkout/shipping"))
        .json(&json!({ "tier": "STANDARD" }))
        .send()
        .await
        .expect("Failed to select shipping");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base_url}/api/checkout/advance"))
        .send()
        .await
        .expect("Failed to advance");
    assert_eq!(resp.status(), StatusCode::OK);
    let session: Value = resp.json().await.expect("Failed to parse session");
    assert_eq!(session["step"], "PAYMENT");

    // Save a cash-on-delivery method and select it
    let resp = client
        .post(format!("{base_url}/api/payment-methods"))
        .json(&json!({ "method_type": "CASH_ON_DELIVERY" }))
        .send()
        .await
        .expect("Failed to save payment method");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let method: Value = resp.json().await.expect("Failed to parse method");
    let method_id = method["id"].as_i64().expect("method id");

    let resp = client
        .post(format!("{base_url}/api/checkout/payment"))
        .json(&json!({ "payment_method_id": method_id }))
        .send()
        .await
        .expect("Failed to select payment");
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = client
        .post(format!("{base_url}/api/checkout/advance"))
        .send()
        .await
        .expect("Failed to advance to review");
    assert_eq!(resp.status(), StatusCode::OK);
    let session: Value = resp.json().await.expect("Failed to parse session");
    assert_eq!(session["step"], "REVIEW");

    // Place the order
    let resp = client
        .post(format!("{base_url}/api/checkout/order"))
        .send()
        .await
        .expect("Failed to place order");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let placed: Value = resp.json().await.expect("Failed to parse placed order");
    let order_number = placed["order"]["order_number"]
        .as_str()
        .expect("order number");
    assert!(order_number.starts_with("ORD-"));
    assert_eq!(placed["order"]["status"], "PENDING_PAYMENT");

    // Session is gone after placement
    let resp = client
        .get(format!("{base_url}/api/checkout"))
        .send()
        .await
        .expect("Failed to get session");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // The order shows up in history
    let resp = client
        .get(format!("{base_url}/api/orders"))
        .send()
        .await
        .expect("Failed to list orders");
    assert_eq!(resp.status(), StatusCode::OK);
    let orders: Vec<Value> = resp.json().await.expect("Failed to parse orders");
    assert_eq!(orders.len(), 1);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_checkout_rejects_insufficient_stock() {
    let pool = fixture_pool().await;
    let user_id = unique_user_id();
    let client = client_for_user(user_id);
    let base_url = storefront_base_url();

    let product_id = seed_product(&pool, "Aretes casi agotados", dec!(120.00), 1).await;
    seed_cart(
        &pool,
        user_id,
        product_id,
        "Aretes casi agotados",
        dec!(120.00),
        3,
    )
    .await;

    let resp = client
        .post(format!("{base_url}/api/checkout/start"))
        .send()
        .await
        .expect("Failed to start checkout");

    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.expect("Failed to parse error body");
    assert_eq!(body["code"], "INSUFFICIENT_STOCK");
}
