//! Wishlist service with price-drop tracking.

use chrono::Utc;
use sqlx::PgPool;
use thiserror::Error;
use tracing::info;

use colibri_core::{ProductId, UserId, VariantId, WishlistItemId};

use crate::db::{ProductRepository, RepositoryError, WishlistRepository};
use crate::models::wishlist::{Wishlist, WishlistItem};

/// Errors surfaced by wishlist operations.
#[derive(Debug, Error)]
pub enum WishlistServiceError {
    /// The product is unknown or no longer sold.
    #[error("product not available")]
    ProductNotAvailable,

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Wishlist service.
pub struct WishlistService<'a> {
    wishlists: WishlistRepository<'a>,
    products: ProductRepository<'a>,
}

impl<'a> WishlistService<'a> {
    /// Create a new wishlist service.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self {
            wishlists: WishlistRepository::new(pool),
            products: ProductRepository::new(pool),
        }
    }

    /// Get the user's wishlist, creating it on first use.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn get(&self, user_id: UserId) -> Result<Wishlist, WishlistServiceError> {
        Ok(self.wishlists.get_or_create(user_id).await?)
    }

    /// Save a product to the wishlist, recording its current price as the
    /// baseline for drop tracking. Saving the same product twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `ProductNotAvailable` for unknown or inactive products.
    pub async fn add(
        &self,
        user_id: UserId,
        product_id: ProductId,
        variant_id: Option<VariantId>,
    ) -> Result<WishlistItem, WishlistServiceError> {
        let product = self
            .products
            .get(product_id)
            .await?
            .filter(|p| p.is_active)
            .ok_or(WishlistServiceError::ProductNotAvailable)?;

        let wishlist = self.wishlists.get_or_create(user_id).await?;
        let item = self
            .wishlists
            .add_item(
                wishlist.id,
                product_id,
                variant_id,
                &product.name,
                &product.price,
                product.stock > 0,
            )
            .await?;

        info!(user_id = user_id.as_i32(), product_id = product_id.as_i32(), "wishlist add");
        Ok(item)
    }

    /// Remove an item from the wishlist.
    ///
    /// # Returns
    ///
    /// Returns `true` if the item was removed.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn remove(
        &self,
        user_id: UserId,
        item_id: WishlistItemId,
    ) -> Result<bool, WishlistServiceError> {
        let wishlist = self.wishlists.get_or_create(user_id).await?;
        Ok(self.wishlists.remove_item(wishlist.id, item_id).await?)
    }

    /// Re-price every saved item against the catalog and persist the
    /// recomputed tracking fields. Items whose product disappeared are
    /// marked out of stock.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn sync_prices(&self, user_id: UserId) -> Result<Wishlist, WishlistServiceError> {
        let mut wishlist = self.wishlists.get_or_create(user_id).await?;

        let ids: Vec<_> = wishlist.items.iter().map(|item| item.product_id).collect();
        let products = self.products.get_many(&ids).await?;

        for item in &mut wishlist.items {
            let product = products.iter().find(|p| p.id == item.product_id);
            let (price, in_stock) = product
                .filter(|p| p.is_active)
                .map_or((item.current_price, false), |p| (p.price, p.stock > 0));

            item.apply_sync(price, in_stock);
            self.wishlists.update_item_tracking(item).await?;
        }

        let now = Utc::now();
        self.wishlists.mark_synced(wishlist.id, now).await?;
        wishlist.synced_at = Some(now);

        Ok(wishlist)
    }
}
