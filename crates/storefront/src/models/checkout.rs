//! Checkout session domain types.
//!
//! A checkout session is an ephemeral, time-boxed aggregate tracking the
//! user's progress through the SHIPPING → PAYMENT → REVIEW steps. It is
//! destroyed on order creation, explicit cancellation, or expiry (checked
//! lazily on access, there is no background timer).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use colibri_core::{AddressId, CartId, CheckoutSessionId, Money, PaymentMethodId, UserId};

use super::shipping::ShippingSelection;

/// The steps of the checkout flow, strictly linear going forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CheckoutStep {
    /// Choose address and shipping option.
    #[default]
    Shipping,
    /// Choose payment method.
    Payment,
    /// Review and place the order.
    Review,
}

impl CheckoutStep {
    /// The next step, or `None` from `Review`.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Shipping => Some(Self::Payment),
            Self::Payment => Some(Self::Review),
            Self::Review => None,
        }
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Shipping => "SHIPPING",
            Self::Payment => "PAYMENT",
            Self::Review => "REVIEW",
        }
    }
}

impl std::str::FromStr for CheckoutStep {
    type Err = colibri_core::UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SHIPPING" => Ok(Self::Shipping),
            "PAYMENT" => Ok(Self::Payment),
            "REVIEW" => Ok(Self::Review),
            other => Err(colibri_core::UnknownStatus(other.to_owned())),
        }
    }
}

impl std::fmt::Display for CheckoutStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Computed money breakdown for a session or order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct OrderSummary {
    /// Sum of line totals.
    pub subtotal: Money,
    /// Coupon / promotion discount.
    pub discount: Money,
    /// IVA on the discounted subtotal.
    pub tax: Money,
    /// Shipping cost after the free-shipping rule.
    pub shipping: Money,
    /// Grand total.
    pub total: Money,
}

/// An in-progress checkout (domain type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutSession {
    /// Unique session ID.
    pub id: CheckoutSessionId,
    /// Owning user. One active session per user.
    pub user_id: UserId,
    /// Cart the session was started from.
    pub cart_id: CartId,
    /// Number of lines in the cart when the session was started.
    pub item_count: u32,
    /// Current step.
    pub step: CheckoutStep,
    /// Selected shipping address, if any.
    pub address_id: Option<AddressId>,
    /// Selected shipping option, if any.
    pub shipping: Option<ShippingSelection>,
    /// Selected payment method, if any.
    pub payment_method_id: Option<PaymentMethodId>,
    /// Money breakdown, recomputed on every mutation.
    pub summary: OrderSummary,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Hard expiry: created + 2 hours.
    pub expires_at: DateTime<Utc>,
    /// When the session was last touched.
    pub updated_at: DateTime<Utc>,
}

impl CheckoutSession {
    /// Whether the session has passed its expiry.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_step_progression() {
        assert_eq!(CheckoutStep::Shipping.next(), Some(CheckoutStep::Payment));
        assert_eq!(CheckoutStep::Payment.next(), Some(CheckoutStep::Review));
        assert_eq!(CheckoutStep::Review.next(), None);
    }

    #[test]
    fn test_step_round_trip() {
        for step in [
            CheckoutStep::Shipping,
            CheckoutStep::Payment,
            CheckoutStep::Review,
        ] {
            assert_eq!(step.as_str().parse::<CheckoutStep>().expect("parse"), step);
        }
    }

    #[test]
    fn test_expiry_is_inclusive() {
        let now = Utc::now();
        let session = CheckoutSession {
            id: CheckoutSessionId::new(1),
            user_id: UserId::new(1),
            cart_id: CartId::new(1),
            item_count: 1,
            step: CheckoutStep::Shipping,
            address_id: None,
            shipping: None,
            payment_method_id: None,
            summary: OrderSummary::default(),
            created_at: now - Duration::hours(2),
            expires_at: now,
            updated_at: now,
        };
        assert!(session.is_expired(now));
        assert!(!session.is_expired(now - Duration::seconds(1)));
    }
}
