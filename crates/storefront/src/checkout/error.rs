//! Checkout error taxonomy.
//!
//! A small closed set of error codes is surfaced to callers; services catch
//! repository/gateway failures and re-wrap them into this taxonomy before the
//! HTTP layer sees them.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::CheckoutStep;

/// Closed set of checkout error codes, serialized as SCREAMING_SNAKE_CASE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutErrorCode {
    EmptyCart,
    InvalidAddress,
    InvalidShipping,
    InvalidPayment,
    InsufficientStock,
    InvalidCoupon,
    PaymentFailed,
    ShippingNotAvailable,
    SessionExpired,
    PriceChanged,
    UnknownError,
}

impl CheckoutErrorCode {
    /// Wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::EmptyCart => "EMPTY_CART",
            Self::InvalidAddress => "INVALID_ADDRESS",
            Self::InvalidShipping => "INVALID_SHIPPING",
            Self::InvalidPayment => "INVALID_PAYMENT",
            Self::InsufficientStock => "INSUFFICIENT_STOCK",
            Self::InvalidCoupon => "INVALID_COUPON",
            Self::PaymentFailed => "PAYMENT_FAILED",
            Self::ShippingNotAvailable => "SHIPPING_NOT_AVAILABLE",
            Self::SessionExpired => "SESSION_EXPIRED",
            Self::PriceChanged => "PRICE_CHANGED",
            Self::UnknownError => "UNKNOWN_ERROR",
        }
    }
}

/// A field-level validation failure from address validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Offending field name (e.g., "phone").
    pub field: String,
    /// Human-readable message.
    pub message: String,
}

impl FieldError {
    /// Create a new field error.
    #[must_use]
    pub fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_owned(),
            message: message.into(),
        }
    }
}

/// A session validation failure tagged with the step it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepError {
    /// Step the failure belongs to.
    pub step: CheckoutStep,
    /// Error code.
    pub code: CheckoutErrorCode,
    /// Human-readable message.
    pub message: String,
}

/// Errors surfaced by checkout use cases.
#[derive(Debug, Clone, Error)]
pub enum CheckoutError {
    /// The cart has no lines.
    #[error("cart is empty")]
    EmptyCart,

    /// The selected address failed validation.
    #[error("address is invalid")]
    InvalidAddress(Vec<FieldError>),

    /// No valid shipping option is selected.
    #[error("shipping selection is invalid")]
    InvalidShipping,

    /// No valid payment method is selected.
    #[error("payment method is invalid")]
    InvalidPayment,

    /// A cart line exceeds available stock.
    #[error("insufficient stock for {name}: requested {requested}, available {available}")]
    InsufficientStock {
        /// Product name for the message.
        name: String,
        /// Units requested.
        requested: u32,
        /// Units available.
        available: i32,
    },

    /// The coupon code is not valid.
    #[error("coupon is invalid: {0}")]
    InvalidCoupon(String),

    /// The payment gateway declined or errored.
    #[error("payment failed: {0}")]
    PaymentFailed(String),

    /// The zone yielded no shipping options.
    #[error("shipping is not available for this address")]
    ShippingNotAvailable,

    /// The checkout session passed its 2-hour expiry.
    #[error("checkout session has expired")]
    SessionExpired,

    /// A cart line's price changed since the session was started.
    #[error("prices changed since checkout started")]
    PriceChanged,

    /// Composite failure from session validation.
    #[error("checkout session is not valid")]
    Validation(Vec<StepError>),

    /// Anything else.
    #[error("checkout error: {0}")]
    Unknown(String),
}

impl CheckoutError {
    /// The taxonomy code for this error.
    ///
    /// Composite validation failures report the code of their first entry.
    #[must_use]
    pub fn code(&self) -> CheckoutErrorCode {
        match self {
            Self::EmptyCart => CheckoutErrorCode::EmptyCart,
            Self::InvalidAddress(_) => CheckoutErrorCode::InvalidAddress,
            Self::InvalidShipping => CheckoutErrorCode::InvalidShipping,
            Self::InvalidPayment => CheckoutErrorCode::InvalidPayment,
            Self::Validation(errors) => errors
                .first()
                .map_or(CheckoutErrorCode::UnknownError, |e| e.code),
            Self::InsufficientStock { .. } => CheckoutErrorCode::InsufficientStock,
            Self::InvalidCoupon(_) => CheckoutErrorCode::InvalidCoupon,
            Self::PaymentFailed(_) => CheckoutErrorCode::PaymentFailed,
            Self::ShippingNotAvailable => CheckoutErrorCode::ShippingNotAvailable,
            Self::SessionExpired => CheckoutErrorCode::SessionExpired,
            Self::PriceChanged => CheckoutErrorCode::PriceChanged,
            Self::Unknown(_) => CheckoutErrorCode::UnknownError,
        }
    }

    /// The step this error belongs to, when one applies.
    #[must_use]
    pub fn step(&self) -> Option<CheckoutStep> {
        match self {
            Self::InvalidAddress(_) | Self::InvalidShipping | Self::ShippingNotAvailable => {
                Some(CheckoutStep::Shipping)
            }
            Self::InvalidPayment | Self::PaymentFailed(_) => Some(CheckoutStep::Payment),
            Self::Validation(errors) => errors.first().map(|e| e.step),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_wire_format() {
        assert_eq!(CheckoutErrorCode::EmptyCart.as_str(), "EMPTY_CART");
        assert_eq!(
            CheckoutErrorCode::ShippingNotAvailable.as_str(),
            "SHIPPING_NOT_AVAILABLE"
        );
        let json = serde_json::to_string(&CheckoutErrorCode::InsufficientStock).expect("serialize");
        assert_eq!(json, "\"INSUFFICIENT_STOCK\"");
    }

    #[test]
    fn test_error_maps_to_code_and_step() {
        let err = CheckoutError::InvalidAddress(vec![FieldError::new("phone", "10 digits")]);
        assert_eq!(err.code(), CheckoutErrorCode::InvalidAddress);
        assert_eq!(err.step(), Some(CheckoutStep::Shipping));

        let err = CheckoutError::PaymentFailed("card declined".to_owned());
        assert_eq!(err.code(), CheckoutErrorCode::PaymentFailed);
        assert_eq!(err.step(), Some(CheckoutStep::Payment));

        assert_eq!(CheckoutError::SessionExpired.step(), None);
    }

    #[test]
    fn test_validation_error_takes_first_step() {
        let err = CheckoutError::Validation(vec![
            StepError {
                step: CheckoutStep::Shipping,
                code: CheckoutErrorCode::InvalidAddress,
                message: "no address selected".to_owned(),
            },
            StepError {
                step: CheckoutStep::Payment,
                code: CheckoutErrorCode::InvalidPayment,
                message: "no payment selected".to_owned(),
            },
        ]);
        assert_eq!(err.step(), Some(CheckoutStep::Shipping));
    }
}
