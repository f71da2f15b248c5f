//! Integration tests for order stock reservation.
//!
//! These tests require:
//! - A running `PostgreSQL` database with migrations applied
//!
//! Run with: cargo test -p colibri-integration-tests -- --ignored

use colibri_core::ProductId;
use colibri_integration_tests::{fixture_pool, seed_product};
use colibri_storefront::db::ProductRepository;
use rust_decimal_macros::dec;
use sqlx::PgPool;

async fn stock_of(pool: &PgPool, product_id: i32) -> i32 {
    let (stock,): (i32,) =
        sqlx::query_as("SELECT stock FROM storefront.products WHERE id = $1")
            .bind(product_id)
            .fetch_one(pool)
            .await
            .expect("Failed to read stock");
    stock
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_failed_reservation_leaves_earlier_lines_untouched() {
    let pool = fixture_pool().await;
    let plenty = seed_product(&pool, "Aretes de plata", dec!(250.00), 5).await;
    let scarce = seed_product(&pool, "Anillo de obsidiana", dec!(480.00), 1).await;

    let repo = ProductRepository::new(&pool);
    let failed = repo
        .reserve_stock(&[(ProductId::new(plenty), 2), (ProductId::new(scarce), 3)])
        .await
        .expect("Failed to run reservation");

    // The second line cannot be satisfied, so the first line's decrement
    // must be rolled back with it.
    assert_eq!(failed, Some(ProductId::new(scarce)));
    assert_eq!(stock_of(&pool, plenty).await, 5);
    assert_eq!(stock_of(&pool, scarce).await, 1);
}

#[tokio::test]
#[ignore = "Requires database"]
async fn test_release_restores_reserved_stock() {
    let pool = fixture_pool().await;
    let product = seed_product(&pool, "Collar de jade", dec!(620.00), 4).await;
    let lines = [(ProductId::new(product), 3)];

    let repo = ProductRepository::new(&pool);
    let failed = repo.reserve_stock(&lines).await.expect("Failed to reserve");
    assert_eq!(failed, None);
    assert_eq!(stock_of(&pool, product).await, 1);

    repo.release_stock(&lines).await.expect("Failed to release");
    assert_eq!(stock_of(&pool, product).await, 4);
}
