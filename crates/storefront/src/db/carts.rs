//! Cart repository.
//!
//! Checkout reads carts; cart mutation endpoints are owned by the catalog
//! surface and kept minimal here (clear after order creation).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use colibri_core::{CartId, CartItemId, Money, ProductId, UserId, VariantId};

use super::RepositoryError;
use crate::models::cart::{Cart, CartItem};

#[derive(sqlx::FromRow)]
struct CartRow {
    id: i32,
    user_id: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct CartItemRow {
    id: i32,
    product_id: i32,
    variant_id: Option<i32>,
    name: String,
    unit_price: Decimal,
    quantity: i32,
}

impl CartItemRow {
    fn into_domain(self) -> Result<CartItem, RepositoryError> {
        let quantity = u32::try_from(self.quantity).map_err(|_| {
            RepositoryError::DataCorruption(format!(
                "negative quantity {} on cart item {}",
                self.quantity, self.id
            ))
        })?;

        Ok(CartItem {
            id: CartItemId::new(self.id),
            product_id: ProductId::new(self.product_id),
            variant_id: self.variant_id.map(VariantId::new),
            name: self.name,
            unit_price: Money::mxn(self.unit_price),
            quantity,
        })
    }
}

/// Repository for cart database operations.
pub struct CartRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CartRepository<'a> {
    /// Create a new cart repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the user's cart with its lines, if one exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_for_user(&self, user_id: UserId) -> Result<Option<Cart>, RepositoryError> {
        let cart: Option<CartRow> = sqlx::query_as(
            "SELECT id, user_id, created_at, updated_at
             FROM storefront.carts WHERE user_id = $1",
        )
        .bind(user_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        let Some(cart) = cart else {
            return Ok(None);
        };

        let items: Vec<CartItemRow> = sqlx::query_as(
            "SELECT id, product_id, variant_id, name, unit_price, quantity
             FROM storefront.cart_items WHERE cart_id = $1 ORDER BY id ASC",
        )
        .bind(cart.id)
        .fetch_all(self.pool)
        .await?;

        let items = items
            .into_iter()
            .map(CartItemRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Some(Cart {
            id: CartId::new(cart.id),
            user_id: UserId::new(cart.user_id),
            items,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        }))
    }

    /// Get a cart by ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the cart doesn't exist.
    pub async fn get(&self, cart_id: CartId) -> Result<Cart, RepositoryError> {
        let cart: Option<CartRow> = sqlx::query_as(
            "SELECT id, user_id, created_at, updated_at
             FROM storefront.carts WHERE id = $1",
        )
        .bind(cart_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        let cart = cart.ok_or(RepositoryError::NotFound)?;

        let items: Vec<CartItemRow> = sqlx::query_as(
            "SELECT id, product_id, variant_id, name, unit_price, quantity
             FROM storefront.cart_items WHERE cart_id = $1 ORDER BY id ASC",
        )
        .bind(cart.id)
        .fetch_all(self.pool)
        .await?;

        let items = items
            .into_iter()
            .map(CartItemRow::into_domain)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Cart {
            id: CartId::new(cart.id),
            user_id: UserId::new(cart.user_id),
            items,
            created_at: cart.created_at,
            updated_at: cart.updated_at,
        })
    }

    /// Remove all lines from a cart (after its order is created).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn clear(&self, cart_id: CartId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM storefront.cart_items WHERE cart_id = $1")
            .bind(cart_id.as_i32())
            .execute(self.pool)
            .await?;

        sqlx::query("UPDATE storefront.carts SET updated_at = NOW() WHERE id = $1")
            .bind(cart_id.as_i32())
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
