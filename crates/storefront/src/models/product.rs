//! Catalog product domain type.
//!
//! Only the fields checkout and wishlist sync need: price and stock. The full
//! catalog surface (descriptions, images, categories) lives elsewhere.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use colibri_core::{Money, ProductId};

/// A catalog product (domain type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Current price.
    pub price: Money,
    /// Units available.
    pub stock: i32,
    /// Whether the product is purchasable.
    pub is_active: bool,
    /// When the product was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether `quantity` units can currently be purchased.
    #[must_use]
    pub const fn has_stock(&self, quantity: u32) -> bool {
        self.is_active && self.stock >= quantity as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_has_stock() {
        let product = Product {
            id: ProductId::new(1),
            name: "Alebrije".to_owned(),
            price: Money::mxn(dec!(890.00)),
            stock: 3,
            is_active: true,
            updated_at: Utc::now(),
        };
        assert!(product.has_stock(3));
        assert!(!product.has_stock(4));
    }

    #[test]
    fn test_inactive_product_has_no_stock() {
        let product = Product {
            id: ProductId::new(1),
            name: "Alebrije".to_owned(),
            price: Money::mxn(dec!(890.00)),
            stock: 10,
            is_active: false,
            updated_at: Utc::now(),
        };
        assert!(!product.has_stock(1));
    }
}
