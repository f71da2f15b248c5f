//! Domain models for storefront.
//!
//! These types represent validated domain objects separate from database row
//! types; the `db` layer maps rows into them.
//!
//! # Modules
//!
//! - [`address`] - Mexican shipping addresses and the federal-entity enum
//! - [`cart`] - Cart and cart lines
//! - [`checkout`] - Checkout session, steps, and order summary
//! - [`order`] - Orders, events, cancellations, returns
//! - [`payment`] - Saved payment methods
//! - [`product`] - Catalog products (price/stock view)
//! - [`shipping`] - Shipping tiers, zones, and computed options
//! - [`wishlist`] - Wishlists with price tracking

pub mod address;
pub mod cart;
pub mod checkout;
pub mod order;
pub mod payment;
pub mod product;
pub mod shipping;
pub mod wishlist;

pub use address::{Address, AddressLabel, MxState};
pub use cart::{Cart, CartItem};
pub use checkout::{CheckoutSession, CheckoutStep, OrderSummary};
pub use order::{
    CancellationReason, FiscalInvoice, Order, OrderCancellation, OrderEvent, OrderItem,
    OrderReturn, PaymentSnapshot, ReturnReason,
};
pub use payment::{CardBrand, PaymentMethod, PaymentMethodType};
pub use product::Product;
pub use shipping::{
    ShippingOption, ShippingSelection, ShippingTier, ShippingZone, ShippingZoneName,
};
pub use wishlist::{Wishlist, WishlistItem};
