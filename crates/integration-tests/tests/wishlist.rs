//! Integration tests for the wishlist.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//! - The storefront server running (cargo run -p colibri-storefront)
//!
//! Run with: cargo test -p colibri-integration-tests -- --ignored

use colibri_integration_tests::{
    client_for_user, fixture_pool, seed_product, storefront_base_url, unique_user_id,
};
use reqwest::StatusCode;
use rust_decimal_macros::dec;
use serde_json::{Value, json};

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_wishlist_add_sync_remove() {
    let pool = fixture_pool().await;
    let user_id = unique_user_id();
    let client = client_for_user(user_id);
    let base_url = storefront_base_url();

    let product_id = seed_product(&pool, "Collar de prueba", dec!(450.00), 5).await;

    // Add the product
    let resp = client
        .post(format!("{base_url}/api/wishlist/items"))
        .json(&json!({ "product_id": product_id }))
        .send()
        .await
        .expect("Failed to add wishlist item");
    assert_eq!(resp.status(), StatusCode::CREATED);
    let item: Value = resp.json().await.expect("Failed to parse item");
    let item_id = item["id"].as_i64().expect("item id");
    assert_eq!(item["price_at_add"], item["current_price"]);
    assert_eq!(item["has_price_dropped"], false);

    // Drop the price behind the API's back, then sync
    sqlx::query("UPDATE storefront.products SET price = $2 WHERE id = $1")
        .bind(product_id)
        .bind(dec!(399.00))
        .execute(&pool)
        .await
        .expect("Failed to update price");

    let resp = client
        .post(format!("{base_url}/api/wishlist/sync"))
        .send()
        .await
        .expect("Failed to sync wishlist");
    assert_eq!(resp.status(), StatusCode::OK);
    let wishlist: Value = resp.json().await.expect("Failed to parse wishlist");
    let synced = wishlist["items"]
        .as_array()
        .expect("items array")
        .iter()
        .find(|i| i["id"].as_i64() == Some(item_id))
        .expect("synced item present");
    assert_eq!(synced["has_price_dropped"], true);

    // Remove it
    let resp = client
        .delete(format!("{base_url}/api/wishlist/items/{item_id}"))
        .send()
        .await
        .expect("Failed to remove item");
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // Removing again is a 404
    let resp = client
        .delete(format!("{base_url}/api/wishlist/items/{item_id}"))
        .send()
        .await
        .expect("Failed to send second remove");
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
#[ignore = "Requires running storefront server and database"]
async fn test_wishlist_rejects_inactive_product() {
    let pool = fixture_pool().await;
    let user_id = unique_user_id();
    let client = client_for_user(user_id);
    let base_url = storefront_base_url();

    let product_id = seed_product(&pool, "Pieza descontinuada", dec!(100.00), 0).await;
    sqlx::query("UPDATE storefront.products SET is_active = FALSE WHERE id = $1")
        .bind(product_id)
        .execute(&pool)
        .await
        .expect("Failed to deactivate product");

    let resp = client
        .post(format!("{base_url}/api/wishlist/items"))
        .json(&json!({ "product_id": product_id }))
        .send()
        .await
        .expect("Failed to add wishlist item");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
