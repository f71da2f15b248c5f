//! Checkout flow route handlers.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use colibri_core::{AddressId, PaymentMethodId};

use crate::error::{AppError, Result};
use crate::models::checkout::CheckoutSession;
use crate::models::order::{FiscalInvoice, Order};
use crate::models::shipping::{ShippingOption, ShippingTier};
use crate::services::CheckoutService;
use crate::state::AppState;

use super::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct ShippingOptionsQuery {
    pub address_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct SelectAddressPayload {
    pub address_id: i32,
}

#[derive(Debug, Deserialize)]
pub struct SelectShippingPayload {
    pub tier: ShippingTier,
}

#[derive(Debug, Deserialize)]
pub struct SelectPaymentPayload {
    pub payment_method_id: i32,
}

#[derive(Debug, Deserialize, Default)]
pub struct PlaceOrderPayload {
    #[serde(default)]
    pub invoice: Option<FiscalInvoice>,
}

/// Response for a placed order.
#[derive(Debug, Serialize)]
pub struct PlacedOrderResponse {
    pub order: Order,
    /// Stripe client secret for confirming the payment; `null` when intent
    /// creation failed and the frontend must poll/retry.
    pub client_secret: Option<String>,
}

/// POST /api/checkout/start
#[instrument(skip(state))]
pub async fn start(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<impl IntoResponse> {
    let service = CheckoutService::new(state.pool(), state.stripe());
    let session = service.start_checkout(user.0).await?;
    crate::error::add_breadcrumb("checkout", "Checkout started", None);
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /api/checkout
#[instrument(skip(state))]
pub async fn get_session(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CheckoutSession>> {
    let service = CheckoutService::new(state.pool(), state.stripe());
    Ok(Json(service.get_session(user.0).await?))
}

/// GET /api/checkout/shipping-options?address_id=N
#[instrument(skip(state))]
pub async fn shipping_options(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ShippingOptionsQuery>,
) -> Result<Json<Vec<ShippingOption>>> {
    let service = CheckoutService::new(state.pool(), state.stripe());
    let options = service
        .shipping_options(user.0, AddressId::new(query.address_id))
        .await?;
    Ok(Json(options))
}

/// POST /api/checkout/address
#[instrument(skip(state))]
pub async fn select_address(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<SelectAddressPayload>,
) -> Result<Json<CheckoutSession>> {
    let service = CheckoutService::new(state.pool(), state.stripe());
    let session = service
        .select_address(user.0, AddressId::new(payload.address_id))
        .await?;
    Ok(Json(session))
}

/// POST /api/checkout/shipping
#[instrument(skip(state))]
pub async fn select_shipping(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<SelectShippingPayload>,
) -> Result<Json<CheckoutSession>> {
    let service = CheckoutService::new(state.pool(), state.stripe());
    let session = service.select_shipping(user.0, payload.tier).await?;
    crate::error::add_breadcrumb(
        "checkout",
        "Selected shipping option",
        Some(&[("tier", payload.tier.as_str())]),
    );
    Ok(Json(session))
}

/// POST /api/checkout/payment
#[instrument(skip(state))]
pub async fn select_payment(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<SelectPaymentPayload>,
) -> Result<Json<CheckoutSession>> {
    let service = CheckoutService::new(state.pool(), state.stripe());
    let session = service
        .select_payment(user.0, PaymentMethodId::new(payload.payment_method_id))
        .await?;
    Ok(Json(session))
}

/// POST /api/checkout/advance
#[instrument(skip(state))]
pub async fn advance(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<CheckoutSession>> {
    let service = CheckoutService::new(state.pool(), state.stripe());
    Ok(Json(service.advance_step(user.0).await?))
}

/// POST /api/checkout/order
#[instrument(skip(state, payload))]
pub async fn place_order(
    State(state): State<AppState>,
    user: CurrentUser,
    payload: Option<Json<PlaceOrderPayload>>,
) -> Result<impl IntoResponse> {
    let Json(payload) = payload.unwrap_or_default();
    let service = CheckoutService::new(state.pool(), state.stripe());
    let placed = service.create_order(user.0, payload.invoice).await?;

    crate::error::add_breadcrumb(
        "checkout",
        "Order placed",
        Some(&[("order_number", &placed.order.order_number)]),
    );

    Ok((
        StatusCode::CREATED,
        Json(PlacedOrderResponse {
            order: placed.order,
            client_secret: placed.client_secret,
        }),
    ))
}

/// DELETE /api/checkout
#[instrument(skip(state))]
pub async fn cancel(State(state): State<AppState>, user: CurrentUser) -> Result<StatusCode> {
    let service = CheckoutService::new(state.pool(), state.stripe());
    if service.cancel_session(user.0).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound("no active checkout session".to_owned()))
    }
}
