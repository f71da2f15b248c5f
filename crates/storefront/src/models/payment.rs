//! Payment method domain types.
//!
//! Card numbers are never stored; card methods carry only the token issued by
//! the gateway plus display fields (last4, brand, expiry).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use colibri_core::{PaymentMethodId, UserId};

/// A saved payment method (domain type).
///
/// Invariant: at most one method per user has `is_default = true`; card
/// methods always carry `last4` and `brand`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    /// Unique payment method ID.
    pub id: PaymentMethodId,
    /// Owning user.
    pub user_id: UserId,
    /// Kind of payment method.
    pub method_type: PaymentMethodType,
    /// Last four digits of the card number (card methods only).
    pub last4: Option<String>,
    /// Card brand (card methods only).
    pub brand: Option<CardBrand>,
    /// Card expiry month 1-12 (card methods only).
    pub exp_month: Option<u8>,
    /// Card expiry year, four digits (card methods only).
    pub exp_year: Option<u16>,
    /// Gateway token (e.g., Stripe payment method ID).
    pub provider_id: Option<String>,
    /// Whether this is the user's pre-selected method in checkout.
    pub is_default: bool,
    /// When the method was saved.
    pub created_at: DateTime<Utc>,
}

impl PaymentMethod {
    /// Whether this method satisfies its structural invariants.
    ///
    /// Card methods must carry last4 + brand; other types must not.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        match self.method_type {
            PaymentMethodType::Card => self.last4.is_some() && self.brand.is_some(),
            _ => true,
        }
    }
}

/// Kind of payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethodType {
    /// Credit or debit card (tokenized through the gateway).
    Card,
    /// PayPal account.
    Paypal,
    /// Cash on delivery.
    CashOnDelivery,
    /// SPEI bank transfer.
    BankTransfer,
}

impl PaymentMethodType {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Card => "CARD",
            Self::Paypal => "PAYPAL",
            Self::CashOnDelivery => "CASH_ON_DELIVERY",
            Self::BankTransfer => "BANK_TRANSFER",
        }
    }
}

impl std::str::FromStr for PaymentMethodType {
    type Err = colibri_core::UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CARD" => Ok(Self::Card),
            "PAYPAL" => Ok(Self::Paypal),
            "CASH_ON_DELIVERY" => Ok(Self::CashOnDelivery),
            "BANK_TRANSFER" => Ok(Self::BankTransfer),
            other => Err(colibri_core::UnknownStatus(other.to_owned())),
        }
    }
}

/// Card brand, detected from the BIN prefix at tokenization time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardBrand {
    Visa,
    Mastercard,
    Amex,
    Discover,
    Unknown,
}

impl CardBrand {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Visa => "visa",
            Self::Mastercard => "mastercard",
            Self::Amex => "amex",
            Self::Discover => "discover",
            Self::Unknown => "unknown",
        }
    }
}

impl std::str::FromStr for CardBrand {
    type Err = colibri_core::UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "visa" => Ok(Self::Visa),
            "mastercard" => Ok(Self::Mastercard),
            "amex" => Ok(Self::Amex),
            "discover" => Ok(Self::Discover),
            "unknown" => Ok(Self::Unknown),
            other => Err(colibri_core::UnknownStatus(other.to_owned())),
        }
    }
}

impl std::fmt::Display for CardBrand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(last4: Option<&str>, brand: Option<CardBrand>) -> PaymentMethod {
        PaymentMethod {
            id: PaymentMethodId::new(1),
            user_id: UserId::new(1),
            method_type: PaymentMethodType::Card,
            last4: last4.map(str::to_owned),
            brand,
            exp_month: Some(12),
            exp_year: Some(2030),
            provider_id: Some("pm_test".to_owned()),
            is_default: false,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_card_requires_last4_and_brand() {
        assert!(card(Some("4242"), Some(CardBrand::Visa)).is_well_formed());
        assert!(!card(None, Some(CardBrand::Visa)).is_well_formed());
        assert!(!card(Some("4242"), None).is_well_formed());
    }

    #[test]
    fn test_non_card_needs_no_card_fields() {
        let mut method = card(None, None);
        method.method_type = PaymentMethodType::CashOnDelivery;
        assert!(method.is_well_formed());
    }

    #[test]
    fn test_method_type_round_trip() {
        for t in [
            PaymentMethodType::Card,
            PaymentMethodType::Paypal,
            PaymentMethodType::CashOnDelivery,
            PaymentMethodType::BankTransfer,
        ] {
            assert_eq!(t.as_str().parse::<PaymentMethodType>().expect("parse"), t);
        }
    }
}
