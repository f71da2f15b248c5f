//! Integration tests for Colibrí.
//!
//! # Running Tests
//!
//! ```bash
//! # Start the database and run migrations
//! task db:start
//! cargo run -p colibri-cli -- migrate
//!
//! # Start the storefront
//! cargo run -p colibri-storefront
//!
//! # Run integration tests
//! cargo test -p colibri-integration-tests -- --ignored
//! ```
//!
//! Tests talk to a running storefront over HTTP and seed fixtures
//! (products, carts) directly through the database, since the catalog
//! and cart are written by upstream services in production.
//!
//! # Environment Variables
//!
//! - `STOREFRONT_BASE_URL` - Storefront URL (default: `http://localhost:3000`)
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string for fixtures

use std::sync::atomic::{AtomicI32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::Client;
use rust_decimal::Decimal;
use sqlx::PgPool;

/// Base URL for the storefront API (configurable via environment).
#[must_use]
pub fn storefront_base_url() -> String {
    std::env::var("STOREFRONT_BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string())
}

/// HTTP client acting as the given user.
///
/// The storefront reads identity from the `X-User-Id` header, so there
/// is no login flow here.
#[must_use]
pub fn client_for_user(user_id: i32) -> Client {
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        "x-user-id",
        user_id.to_string().parse().expect("valid header value"),
    );
    Client::builder()
        .default_headers(headers)
        .build()
        .expect("Failed to create HTTP client")
}

/// Fixture pool for seeding data the API has no write surface for.
///
/// # Panics
///
/// Panics if `STOREFRONT_DATABASE_URL` is unset or unreachable.
pub async fn fixture_pool() -> PgPool {
    let url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .expect("STOREFRONT_DATABASE_URL must be set for integration tests");
    PgPool::connect(&url)
        .await
        .expect("Failed to connect to fixture database")
}

static NEXT_USER: AtomicI32 = AtomicI32::new(0);

/// A user ID that no other test run is likely to have touched.
#[must_use]
pub fn unique_user_id() -> i32 {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock before epoch")
        .as_millis();
    let base = i32::try_from(millis % 1_000_000_000).unwrap_or(0);
    base.wrapping_add(NEXT_USER.fetch_add(1, Ordering::Relaxed))
}

/// Seed an active product and return its ID.
pub async fn seed_product(pool: &PgPool, name: &str, price: Decimal, stock: i32) -> i32 {
    let (id,): (i32,) = sqlx::query_as(
        "INSERT INTO storefront.products (name, price, stock, is_active)
         VALUES ($1, $2, $3, TRUE) RETURNING id",
    )
    .bind(name)
    .bind(price)
    .bind(stock)
    .fetch_one(pool)
    .await
    .expect("Failed to seed product");
    id
}

/// Seed a cart with one line for the user and return the cart ID.
pub async fn seed_cart(
    pool: &PgPool,
    user_id: i32,
    product_id: i32,
    name: &str,
    unit_price: Decimal,
    quantity: i32,
) -> i32 {
    let (cart_id,): (i32,) =
        sqlx::query_as("INSERT INTO storefront.carts (user_id) VALUES ($1) RETURNING id")
            .bind(user_id)
            .fetch_one(pool)
            .await
            .expect("Failed to seed cart");

    sqlx::query(
        "INSERT INTO storefront.cart_items (cart_id, product_id, name, unit_price, quantity)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(cart_id)
    .bind(product_id)
    .bind(name)
    .bind(unit_price)
    .bind(quantity)
    .execute(pool)
    .await
    .expect("Failed to seed cart item");

    cart_id
}
