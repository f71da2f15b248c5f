//! HTTP route handlers for the storefront API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                          - Health check
//! GET    /health/ready                    - Readiness (checks the database)
//!
//! # Addresses
//! GET    /api/addresses                   - List addresses (default first)
//! POST   /api/addresses                   - Create address
//! PUT    /api/addresses/{id}              - Update address
//! DELETE /api/addresses/{id}              - Delete address
//! POST   /api/addresses/{id}/default      - Mark as default
//!
//! # Payment methods
//! GET    /api/payment-methods             - List saved methods
//! POST   /api/payment-methods             - Save a method
//! DELETE /api/payment-methods/{id}        - Delete a method
//! POST   /api/payment-methods/{id}/default - Mark as default
//!
//! # Checkout
//! POST   /api/checkout/start              - Start a session from the cart
//! GET    /api/checkout                    - Current session (lazy expiry)
//! GET    /api/checkout/shipping-options   - Options for ?address_id=N
//! POST   /api/checkout/address            - Select address
//! POST   /api/checkout/shipping           - Select shipping tier
//! POST   /api/checkout/payment            - Select payment method
//! POST   /api/checkout/advance            - Advance to the next step
//! POST   /api/checkout/order              - Place the order
//! DELETE /api/checkout                    - Abandon the session
//!
//! # Orders
//! GET    /api/orders                      - Order history
//! GET    /api/orders/{id}                 - Order detail with timeline
//! POST   /api/orders/{id}/cancellation    - Request cancellation
//! POST   /api/orders/{id}/return          - Request a return
//!
//! # Wishlist
//! GET    /api/wishlist                    - Wishlist with tracking data
//! POST   /api/wishlist/items              - Save a product
//! DELETE /api/wishlist/items/{id}         - Remove an item
//! POST   /api/wishlist/sync               - Re-price saved items
//!
//! # Webhooks
//! POST   /api/webhooks/stripe             - Stripe events (signed raw body)
//! ```
//!
//! User identity comes from the `X-User-Id` header, set by the gateway in
//! front of this service; there is no session handling here.

pub mod addresses;
pub mod checkout;
pub mod orders;
pub mod payment_methods;
pub mod webhooks;
pub mod wishlist;

use axum::{
    Router,
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    routing::{delete, get, post},
};

use colibri_core::UserId;

use crate::error::AppError;
use crate::state::AppState;

/// The authenticated user, read from the `X-User-Id` header.
#[derive(Debug, Clone, Copy)]
pub struct CurrentUser(pub UserId);

impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_id = parts
            .headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.parse::<i32>().ok())
            .ok_or_else(|| AppError::Unauthorized("missing or invalid X-User-Id".to_owned()))?;

        crate::error::set_sentry_user(&user_id);
        Ok(Self(UserId::new(user_id)))
    }
}

/// Health check for load balancers.
async fn health() -> &'static str {
    "ok"
}

/// Readiness check; verifies database connectivity.
async fn readiness(axum::extract::State(state): axum::extract::State<AppState>) -> StatusCode {
    match sqlx::query("SELECT 1").fetch_one(state.pool()).await {
        Ok(_) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Create the address routes router.
pub fn address_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(addresses::list).post(addresses::create))
        .route(
            "/{id}",
            axum::routing::put(addresses::update).delete(addresses::remove),
        )
        .route("/{id}/default", post(addresses::set_default))
}

/// Create the payment method routes router.
pub fn payment_method_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(payment_methods::list).post(payment_methods::create))
        .route("/{id}", delete(payment_methods::remove))
        .route("/{id}/default", post(payment_methods::set_default))
}

/// Create the checkout routes router.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(checkout::get_session).delete(checkout::cancel))
        .route("/start", post(checkout::start))
        .route("/shipping-options", get(checkout::shipping_options))
        .route("/address", post(checkout::select_address))
        .route("/shipping", post(checkout::select_shipping))
        .route("/payment", post(checkout::select_payment))
        .route("/advance", post(checkout::advance))
        .route("/order", post(checkout::place_order))
}

/// Create the order routes router.
pub fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/{id}", get(orders::show))
        .route("/{id}/cancellation", post(orders::request_cancellation))
        .route("/{id}/return", post(orders::request_return))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/items", post(wishlist::add_item))
        .route("/items/{id}", delete(wishlist::remove_item))
        .route("/sync", post(wishlist::sync))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/addresses", address_routes())
        .nest("/api/payment-methods", payment_method_routes())
        .nest("/api/checkout", checkout_routes())
        .nest("/api/orders", order_routes())
        .nest("/api/wishlist", wishlist_routes())
        .route("/api/webhooks/stripe", post(webhooks::stripe))
}
