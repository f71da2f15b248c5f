//! Seed the catalog with demo products.
//!
//! # Usage
//!
//! ```bash
//! colibri-cli seed
//! ```
//!
//! Inserts a small set of demo products for local development. Running
//! it twice inserts the set twice; it is not idempotent by design, use
//! a fresh database.

use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::info;

/// Demo products: name, price in centavos, stock.
const DEMO_PRODUCTS: &[(&str, i64, i32)] = &[
    ("Bolsa artesanal de Oaxaca", 89900, 12),
    ("Blusa bordada de Chiapas", 64900, 25),
    ("Collar de plata taxqueña", 129900, 8),
    ("Rebozo de seda de Santa María", 249900, 4),
    ("Aretes de barro negro", 34900, 40),
    ("Huipil de telar de cintura", 179900, 6),
];

/// Seed the products table.
///
/// # Errors
///
/// Returns an error if the database URL is missing or an insert fails.
pub async fn products() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| "STOREFRONT_DATABASE_URL not set")?;

    let pool = PgPool::connect(&database_url).await?;

    for (name, centavos, stock) in DEMO_PRODUCTS {
        sqlx::query(
            "INSERT INTO storefront.products (name, price, stock, is_active)
             VALUES ($1, $2, $3, TRUE)",
        )
        .bind(name)
        .bind(Decimal::new(*centavos, 2))
        .bind(stock)
        .execute(&pool)
        .await?;
    }

    info!(count = DEMO_PRODUCTS.len(), "Seeded demo products");
    Ok(())
}
