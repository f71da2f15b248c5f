//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `checkout` - Checkout flow: session lifecycle, step gating, order placement
//! - `orders` - Order history, cancellations, returns, webhook status moves
//! - `wishlist` - Wishlist with price-drop tracking
//! - `stripe` - Stripe REST client and webhook signature verification
//!
//! Services are thin structs over the repositories in [`crate::db`]; the
//! decisions themselves live in the pure rules under [`crate::checkout`].

pub mod checkout;
pub mod orders;
pub mod stripe;
pub mod wishlist;

pub use checkout::CheckoutService;
pub use orders::OrderService;
pub use stripe::StripeClient;
pub use wishlist::WishlistService;
