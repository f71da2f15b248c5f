//! Product repository: the price/stock view checkout and wishlist sync need.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use colibri_core::{Money, ProductId};

use super::RepositoryError;
use crate::models::product::Product;

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    price: Decimal,
    stock: i32,
    is_active: bool,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Self {
            id: ProductId::new(row.id),
            name: row.name,
            price: Money::mxn(row.price),
            stock: row.stock,
            is_active: row.is_active,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product database operations.
pub struct ProductRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get one product.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, product_id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(
            "SELECT id, name, price, stock, is_active, updated_at
             FROM storefront.products WHERE id = $1",
        )
        .bind(product_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        Ok(row.map(Product::from))
    }

    /// Get several products in one round trip.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_many(
        &self,
        product_ids: &[ProductId],
    ) -> Result<Vec<Product>, RepositoryError> {
        let ids: Vec<i32> = product_ids.iter().map(ProductId::as_i32).collect();
        let rows: Vec<ProductRow> = sqlx::query_as(
            "SELECT id, name, price, stock, is_active, updated_at
             FROM storefront.products WHERE id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Decrement stock for every line, all or nothing.
    ///
    /// The decrements run in one transaction, guarded so stock never goes
    /// negative. A line that cannot be satisfied rolls the whole
    /// reservation back.
    ///
    /// # Returns
    ///
    /// `None` when every line was reserved, otherwise the first product
    /// without enough stock (nothing is reserved in that case).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn reserve_stock(
        &self,
        lines: &[(ProductId, u32)],
    ) -> Result<Option<ProductId>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for &(product_id, quantity) in lines {
            let quantity = i32::try_from(quantity).unwrap_or(i32::MAX);
            let result = sqlx::query(
                "UPDATE storefront.products
                 SET stock = stock - $2, updated_at = NOW()
                 WHERE id = $1 AND is_active AND stock >= $2",
            )
            .bind(product_id.as_i32())
            .bind(quantity)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(Some(product_id));
            }
        }

        tx.commit().await?;
        Ok(None)
    }

    /// Put reserved quantities back after a failed order insert.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn release_stock(
        &self,
        lines: &[(ProductId, u32)],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        for &(product_id, quantity) in lines {
            let quantity = i32::try_from(quantity).unwrap_or(i32::MAX);
            sqlx::query(
                "UPDATE storefront.products
                 SET stock = stock + $2, updated_at = NOW()
                 WHERE id = $1",
            )
            .bind(product_id.as_i32())
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}
