//! Wishlist repository.
//!
//! One wishlist per user, created lazily on first use. Items keep the price
//! observed at add time; `update_item_tracking` writes back the fields a
//! price sync recomputes.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use colibri_core::{Money, ProductId, UserId, VariantId, WishlistId, WishlistItemId};

use super::RepositoryError;
use crate::models::wishlist::{Wishlist, WishlistItem};

#[derive(sqlx::FromRow)]
struct WishlistRow {
    id: i32,
    user_id: i32,
    created_at: DateTime<Utc>,
    synced_at: Option<DateTime<Utc>>,
}

#[derive(sqlx::FromRow)]
struct WishlistItemRow {
    id: i32,
    product_id: i32,
    variant_id: Option<i32>,
    name: String,
    price_at_add: Decimal,
    current_price: Decimal,
    has_price_dropped: bool,
    price_change: Decimal,
    in_stock: bool,
    added_at: DateTime<Utc>,
}

impl From<WishlistItemRow> for WishlistItem {
    fn from(row: WishlistItemRow) -> Self {
        Self {
            id: WishlistItemId::new(row.id),
            product_id: ProductId::new(row.product_id),
            variant_id: row.variant_id.map(VariantId::new),
            name: row.name,
            price_at_add: Money::mxn(row.price_at_add),
            current_price: Money::mxn(row.current_price),
            has_price_dropped: row.has_price_dropped,
            price_change: Money::mxn(row.price_change),
            in_stock: row.in_stock,
            added_at: row.added_at,
        }
    }
}

const ITEM_COLUMNS: &str = r"
    SELECT id, product_id, variant_id, name, price_at_add, current_price,
           has_price_dropped, price_change, in_stock, added_at
    FROM storefront.wishlist_items
";

/// Repository for wishlist database operations.
pub struct WishlistRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> WishlistRepository<'a> {
    /// Create a new wishlist repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the user's wishlist, creating an empty one on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get_or_create(&self, user_id: UserId) -> Result<Wishlist, RepositoryError> {
        let row: WishlistRow = sqlx::query_as(
            r"
            INSERT INTO storefront.wishlists (user_id)
            VALUES ($1)
            ON CONFLICT (user_id) DO UPDATE SET user_id = EXCLUDED.user_id
            RETURNING id, user_id, created_at, synced_at
            ",
        )
        .bind(user_id.as_i32())
        .fetch_one(self.pool)
        .await?;

        let items: Vec<WishlistItemRow> = sqlx::query_as(&format!(
            "{ITEM_COLUMNS} WHERE wishlist_id = $1 ORDER BY added_at DESC, id DESC"
        ))
        .bind(row.id)
        .fetch_all(self.pool)
        .await?;

        Ok(Wishlist {
            id: WishlistId::new(row.id),
            user_id: UserId::new(row.user_id),
            items: items.into_iter().map(WishlistItem::from).collect(),
            created_at: row.created_at,
            synced_at: row.synced_at,
        })
    }

    /// Add a product to the wishlist. Adding the same product/variant twice
    /// is a no-op (unique index), and the existing item is returned.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn add_item(
        &self,
        wishlist_id: WishlistId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
        name: &str,
        price: &Money,
        in_stock: bool,
    ) -> Result<WishlistItem, RepositoryError> {
        let existing: Option<WishlistItemRow> = sqlx::query_as(&format!(
            "{ITEM_COLUMNS} WHERE wishlist_id = $1 AND product_id = $2
             AND variant_id IS NOT DISTINCT FROM $3"
        ))
        .bind(wishlist_id.as_i32())
        .bind(product_id.as_i32())
        .bind(variant_id.map(|id| id.as_i32()))
        .fetch_optional(self.pool)
        .await?;

        if let Some(row) = existing {
            return Ok(row.into());
        }

        let row: WishlistItemRow = sqlx::query_as(
            r"
            INSERT INTO storefront.wishlist_items
                (wishlist_id, product_id, variant_id, name, price_at_add,
                 current_price, has_price_dropped, price_change, in_stock)
            VALUES ($1, $2, $3, $4, $5, $5, FALSE, 0, $6)
            RETURNING id, product_id, variant_id, name, price_at_add, current_price,
                      has_price_dropped, price_change, in_stock, added_at
            ",
        )
        .bind(wishlist_id.as_i32())
        .bind(product_id.as_i32())
        .bind(variant_id.map(|id| id.as_i32()))
        .bind(name)
        .bind(price.amount)
        .bind(in_stock)
        .fetch_one(self.pool)
        .await?;

        Ok(row.into())
    }

    /// Remove an item from the wishlist.
    ///
    /// # Returns
    ///
    /// Returns `true` if the item was removed, `false` if it wasn't there.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn remove_item(
        &self,
        wishlist_id: WishlistId,
        item_id: WishlistItemId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.wishlist_items WHERE id = $1 AND wishlist_id = $2",
        )
        .bind(item_id.as_i32())
        .bind(wishlist_id.as_i32())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Write back the tracking fields a price sync recomputed for one item.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn update_item_tracking(&self, item: &WishlistItem) -> Result<(), RepositoryError> {
        sqlx::query(
            r"
            UPDATE storefront.wishlist_items
            SET current_price = $2, has_price_dropped = $3, price_change = $4,
                in_stock = $5
            WHERE id = $1
            ",
        )
        .bind(item.id.as_i32())
        .bind(item.current_price.amount)
        .bind(item.has_price_dropped)
        .bind(item.price_change.amount)
        .bind(item.in_stock)
        .execute(self.pool)
        .await?;

        Ok(())
    }

    /// Stamp the wishlist's last sync time.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn mark_synced(
        &self,
        wishlist_id: WishlistId,
        synced_at: DateTime<Utc>,
    ) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE storefront.wishlists SET synced_at = $2 WHERE id = $1")
            .bind(wishlist_id.as_i32())
            .bind(synced_at)
            .execute(self.pool)
            .await?;

        Ok(())
    }
}
