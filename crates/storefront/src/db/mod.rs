//! Database operations for storefront `PostgreSQL`.
//!
//! # Database: `colibri_storefront`
//!
//! ## Tables (schema `storefront`)
//!
//! - `products` - Catalog price/stock view consumed by checkout and wishlist
//! - `carts`, `cart_items` - Shopping carts
//! - `addresses` - User shipping addresses
//! - `payment_methods` - Tokenized payment methods
//! - `checkout_sessions` - One active session per user, 2-hour expiry
//! - `orders`, `order_events` - Immutable order snapshots and their timeline
//! - `order_cancellations`, `order_returns` - Side aggregates
//! - `wishlists`, `wishlist_items` - Wishlists with price tracking
//!
//! Order snapshots (items, address, shipping, payment, summary) are JSONB;
//! statuses and enums are TEXT parsed back through `FromStr`, surfacing
//! `RepositoryError::DataCorruption` on unknown values.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p colibri-cli -- migrate
//! ```

pub mod addresses;
pub mod carts;
pub mod checkout_sessions;
pub mod orders;
pub mod payment_methods;
pub mod products;
pub mod wishlists;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

pub use addresses::AddressRepository;
pub use carts::CartRepository;
pub use checkout_sessions::CheckoutSessionRepository;
pub use orders::OrderRepository;
pub use payment_methods::PaymentMethodRepository;
pub use products::ProductRepository;
pub use wishlists::WishlistRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate order number).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

impl RepositoryError {
    /// Wrap a serde/parse failure as corruption with context.
    pub(crate) fn corrupt(context: &str, err: impl std::fmt::Display) -> Self {
        Self::DataCorruption(format!("{context}: {err}"))
    }
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
