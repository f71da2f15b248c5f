//! Wishlist domain types.
//!
//! Wishlist items keep the price observed when the item was added; a sync
//! pass recomputes `has_price_dropped` / `price_change` against current
//! catalog prices.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use colibri_core::{Money, ProductId, UserId, VariantId, WishlistId, WishlistItemId};

/// A user's wishlist (domain type). One per user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wishlist {
    /// Unique wishlist ID.
    pub id: WishlistId,
    /// Owning user.
    pub user_id: UserId,
    /// Saved items.
    pub items: Vec<WishlistItem>,
    /// When the wishlist was created.
    pub created_at: DateTime<Utc>,
    /// When prices were last synced.
    pub synced_at: Option<DateTime<Utc>>,
}

/// A saved product with price/stock tracking.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItem {
    /// Unique item ID.
    pub id: WishlistItemId,
    /// Saved product.
    pub product_id: ProductId,
    /// Variant, if any.
    pub variant_id: Option<VariantId>,
    /// Product name when added.
    pub name: String,
    /// Price when the item was added.
    pub price_at_add: Money,
    /// Price at last sync.
    pub current_price: Money,
    /// Whether `current_price < price_at_add`.
    pub has_price_dropped: bool,
    /// `current_price - price_at_add` (negative on a drop).
    pub price_change: Money,
    /// Whether the product was in stock at last sync.
    pub in_stock: bool,
    /// When the item was added.
    pub added_at: DateTime<Utc>,
}

impl WishlistItem {
    /// Recompute tracking fields against a freshly observed price and stock.
    pub fn apply_sync(&mut self, current_price: Money, in_stock: bool) {
        self.price_change = current_price - self.price_at_add;
        self.has_price_dropped = current_price < self.price_at_add;
        self.current_price = current_price;
        self.in_stock = in_stock;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(price_at_add: rust_decimal::Decimal) -> WishlistItem {
        WishlistItem {
            id: WishlistItemId::new(1),
            product_id: ProductId::new(1),
            variant_id: None,
            name: "Molcajete".to_owned(),
            price_at_add: Money::mxn(price_at_add),
            current_price: Money::mxn(price_at_add),
            has_price_dropped: false,
            price_change: Money::zero(),
            in_stock: true,
            added_at: Utc::now(),
        }
    }

    #[test]
    fn test_sync_detects_price_drop() {
        let mut saved = item(dec!(450.00));
        saved.apply_sync(Money::mxn(dec!(399.00)), true);
        assert!(saved.has_price_dropped);
        assert_eq!(saved.price_change.amount, dec!(-51.00));
        assert_eq!(saved.current_price.amount, dec!(399.00));
    }

    #[test]
    fn test_sync_with_price_increase() {
        let mut saved = item(dec!(450.00));
        saved.apply_sync(Money::mxn(dec!(500.00)), false);
        assert!(!saved.has_price_dropped);
        assert_eq!(saved.price_change.amount, dec!(50.00));
        assert!(!saved.in_stock);
    }

    #[test]
    fn test_sync_with_unchanged_price() {
        let mut saved = item(dec!(450.00));
        saved.apply_sync(Money::mxn(dec!(450.00)), true);
        assert!(!saved.has_price_dropped);
        assert!(saved.price_change.is_zero());
    }
}
