//! Cart domain types.
//!
//! The cart itself is simple CRUD; checkout consumes it read-only and the
//! order snapshot copies its lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use colibri_core::{CartId, CartItemId, Money, ProductId, UserId, VariantId};

/// A shopping cart (domain type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    /// Unique cart ID.
    pub id: CartId,
    /// Owning user.
    pub user_id: UserId,
    /// Cart lines.
    pub items: Vec<CartItem>,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
    /// When the cart was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Sum of line totals.
    #[must_use]
    pub fn subtotal(&self) -> Money {
        self.items.iter().map(CartItem::line_total).sum()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A single cart line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    /// Unique cart line ID.
    pub id: CartItemId,
    /// Product being purchased.
    pub product_id: ProductId,
    /// Variant, if the product has variants.
    pub variant_id: Option<VariantId>,
    /// Product name at the time it was added.
    pub name: String,
    /// Unit price at the time it was added.
    pub unit_price: Money,
    /// Quantity, always >= 1.
    pub quantity: u32,
}

impl CartItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        Money::new(
            self.unit_price.amount * rust_decimal::Decimal::from(self.quantity),
            self.unit_price.currency,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn item(price: rust_decimal::Decimal, quantity: u32) -> CartItem {
        CartItem {
            id: CartItemId::new(1),
            product_id: ProductId::new(1),
            variant_id: None,
            name: "Taza de barro".to_owned(),
            unit_price: Money::mxn(price),
            quantity,
        }
    }

    #[test]
    fn test_line_total() {
        assert_eq!(item(dec!(120.00), 3).line_total().amount, dec!(360.00));
    }

    #[test]
    fn test_subtotal_sums_lines() {
        let cart = Cart {
            id: CartId::new(1),
            user_id: UserId::new(1),
            items: vec![item(dec!(120.00), 2), item(dec!(80.50), 1)],
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(cart.subtotal().amount, dec!(320.50));
        assert!(!cart.is_empty());
    }
}
