//! Saved payment method route handlers.
//!
//! Only tokenized data is accepted. When a full card number is supplied it
//! is used to derive the brand and last four digits, then dropped; it is
//! never persisted or logged.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use colibri_core::PaymentMethodId;

use crate::checkout::{detect_card_brand, is_card_expired};
use crate::db::payment_methods::{NewPaymentMethod, PaymentMethodRepository};
use crate::error::{AppError, Result};
use crate::models::payment::{CardBrand, PaymentMethod, PaymentMethodType};
use crate::state::AppState;

use super::CurrentUser;

/// Payment method creation payload.
#[derive(Debug, Deserialize)]
pub struct PaymentMethodPayload {
    pub method_type: PaymentMethodType,
    /// Full card number; used to derive brand/last4, never stored.
    #[serde(default)]
    pub card_number: Option<String>,
    #[serde(default)]
    pub exp_month: Option<u8>,
    #[serde(default)]
    pub exp_year: Option<u16>,
    /// Gateway token (e.g., Stripe payment method id).
    #[serde(default)]
    pub provider_id: Option<String>,
    #[serde(default)]
    pub is_default: bool,
}

/// GET /api/payment-methods
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<PaymentMethod>>> {
    let methods = PaymentMethodRepository::new(state.pool())
        .list(user.0)
        .await?;
    Ok(Json(methods))
}

/// POST /api/payment-methods
#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<PaymentMethodPayload>,
) -> Result<impl IntoResponse> {
    let (last4, brand) = match payload.method_type {
        PaymentMethodType::Card => {
            let number = payload
                .card_number
                .as_deref()
                .ok_or_else(|| AppError::BadRequest("card number is required".to_owned()))?;
            let digits: String = number.chars().filter(char::is_ascii_digit).collect();
            if digits.len() < 12 {
                return Err(AppError::BadRequest("card number is too short".to_owned()));
            }

            let (month, year) = match (payload.exp_month, payload.exp_year) {
                (Some(m @ 1..=12), Some(y)) => (m, y),
                _ => {
                    return Err(AppError::BadRequest(
                        "card expiry month and year are required".to_owned(),
                    ));
                }
            };
            if is_card_expired(month, year, Utc::now().date_naive()) {
                return Err(AppError::BadRequest("card is expired".to_owned()));
            }

            let last4 = digits[digits.len() - 4..].to_owned();
            (Some(last4), Some(detect_card_brand(&digits)))
        }
        _ => (None, None::<CardBrand>),
    };

    let new = NewPaymentMethod {
        method_type: payload.method_type,
        last4,
        brand,
        exp_month: payload.exp_month,
        exp_year: payload.exp_year,
        provider_id: payload.provider_id,
        is_default: payload.is_default,
    };

    let method = PaymentMethodRepository::new(state.pool())
        .create(user.0, &new)
        .await?;
    Ok((StatusCode::CREATED, Json(method)))
}

/// DELETE /api/payment-methods/{id}
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let deleted = PaymentMethodRepository::new(state.pool())
        .delete(user.0, PaymentMethodId::new(id))
        .await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("payment method {id}")))
    }
}

/// POST /api/payment-methods/{id}/default
#[instrument(skip(state))]
pub async fn set_default(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    PaymentMethodRepository::new(state.pool())
        .set_default(user.0, PaymentMethodId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
