//! Order domain types.
//!
//! An order is an immutable snapshot taken from a valid checkout session:
//! items, address, shipping, payment, and totals are copied so later edits to
//! the source records cannot change what was sold. Only `status` moves, along
//! the lifecycle graph in [`colibri_core::OrderStatus`], and every move
//! appends an [`OrderEvent`] to the timeline. Orders are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use colibri_core::{
    CancellationId, CancellationStatus, Money, OrderEventId, OrderId, OrderStatus, ProductId,
    ReturnId, ReturnStatus, UserId, VariantId,
};

use super::address::Address;
use super::checkout::OrderSummary;
use super::payment::{CardBrand, PaymentMethodType};
use super::shipping::ShippingSelection;

/// A placed order (domain type).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique order ID.
    pub id: OrderId,
    /// Owning user.
    pub user_id: UserId,
    /// Human-facing order number, `ORD-<year>-<5 digits>`, unique.
    pub order_number: String,
    /// Current lifecycle status.
    pub status: OrderStatus,
    /// Snapshot of the purchased lines.
    pub items: Vec<OrderItem>,
    /// Snapshot of the shipping address.
    pub shipping_address: Address,
    /// Snapshot of the selected shipping option.
    pub shipping: ShippingSelection,
    /// Snapshot of the payment method.
    pub payment: PaymentSnapshot,
    /// Money breakdown at placement time.
    pub summary: OrderSummary,
    /// Gateway payment intent ID, once created.
    pub payment_intent_id: Option<String>,
    /// CFDI invoice data, if the user requested a fiscal invoice.
    pub invoice: Option<FiscalInvoice>,
    /// Append-only status/note timeline.
    pub events: Vec<OrderEvent>,
    /// When the order was placed.
    pub created_at: DateTime<Utc>,
    /// When the order last changed status.
    pub updated_at: DateTime<Utc>,
}

/// A purchased line, frozen at placement time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItem {
    /// Product purchased.
    pub product_id: ProductId,
    /// Variant, if any.
    pub variant_id: Option<VariantId>,
    /// Product name at placement time.
    pub name: String,
    /// Unit price at placement time.
    pub unit_price: Money,
    /// Quantity purchased.
    pub quantity: u32,
}

impl OrderItem {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Money {
        Money::new(
            self.unit_price.amount * rust_decimal::Decimal::from(self.quantity),
            self.unit_price.currency,
        )
    }
}

/// Payment method snapshot stored on the order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentSnapshot {
    /// Kind of payment method.
    pub method_type: PaymentMethodType,
    /// Last four card digits, for card methods.
    pub last4: Option<String>,
    /// Card brand, for card methods.
    pub brand: Option<CardBrand>,
    /// Gateway token.
    pub provider_id: Option<String>,
}

/// An immutable, timestamped entry in an order's timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Unique event ID.
    pub id: OrderEventId,
    /// Order this event belongs to.
    pub order_id: OrderId,
    /// Status the order moved to, if this event records a transition.
    pub status: Option<OrderStatus>,
    /// Free-form note (e.g., "payment confirmed by gateway").
    pub note: String,
    /// When the event was recorded.
    pub created_at: DateTime<Utc>,
}

/// CFDI fiscal invoice data attached to an order on request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FiscalInvoice {
    /// RFC (tax ID) of the recipient.
    pub rfc: String,
    /// Legal name (razón social).
    pub razon_social: String,
    /// Uso CFDI code (e.g., "G03").
    pub uso_cfdi: String,
}

/// A cancellation request referencing an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderCancellation {
    /// Unique cancellation ID.
    pub id: CancellationId,
    /// Order being cancelled.
    pub order_id: OrderId,
    /// Request status.
    pub status: CancellationStatus,
    /// Why the customer is cancelling.
    pub reason: CancellationReason,
    /// Free-form detail, required when `reason` is `Other`.
    pub comment: Option<String>,
    /// Amount to refund if approved.
    pub refund_amount: Money,
    /// When the request was made.
    pub created_at: DateTime<Utc>,
    /// When the request was resolved, if it was.
    pub resolved_at: Option<DateTime<Utc>>,
}

/// A return request referencing a delivered order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderReturn {
    /// Unique return ID.
    pub id: ReturnId,
    /// Order being returned.
    pub order_id: OrderId,
    /// Request status.
    pub status: ReturnStatus,
    /// Why the customer is returning.
    pub reason: ReturnReason,
    /// Free-form detail, required when `reason` is `Other`.
    pub comment: Option<String>,
    /// Computed refund amount.
    pub refund_amount: Money,
    /// When the request was made.
    pub created_at: DateTime<Utc>,
    /// When the request last changed status.
    pub updated_at: DateTime<Utc>,
}

/// Enumerated cancellation reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancellationReason {
    ChangedMind,
    FoundBetterPrice,
    OrderedByMistake,
    DeliveryTooSlow,
    Other,
}

impl CancellationReason {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ChangedMind => "CHANGED_MIND",
            Self::FoundBetterPrice => "FOUND_BETTER_PRICE",
            Self::OrderedByMistake => "ORDERED_BY_MISTAKE",
            Self::DeliveryTooSlow => "DELIVERY_TOO_SLOW",
            Self::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for CancellationReason {
    type Err = colibri_core::UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CHANGED_MIND" => Ok(Self::ChangedMind),
            "FOUND_BETTER_PRICE" => Ok(Self::FoundBetterPrice),
            "ORDERED_BY_MISTAKE" => Ok(Self::OrderedByMistake),
            "DELIVERY_TOO_SLOW" => Ok(Self::DeliveryTooSlow),
            "OTHER" => Ok(Self::Other),
            other => Err(colibri_core::UnknownStatus(other.to_owned())),
        }
    }
}

/// Enumerated return reasons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnReason {
    Defective,
    WrongItem,
    NotAsDescribed,
    SizeOrFit,
    ArrivedLate,
    Other,
}

impl ReturnReason {
    /// Whether the fault lies with the store (shipping is refunded too).
    #[must_use]
    pub const fn is_store_fault(self) -> bool {
        matches!(self, Self::Defective | Self::WrongItem | Self::NotAsDescribed)
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Defective => "DEFECTIVE",
            Self::WrongItem => "WRONG_ITEM",
            Self::NotAsDescribed => "NOT_AS_DESCRIBED",
            Self::SizeOrFit => "SIZE_OR_FIT",
            Self::ArrivedLate => "ARRIVED_LATE",
            Self::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for ReturnReason {
    type Err = colibri_core::UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DEFECTIVE" => Ok(Self::Defective),
            "WRONG_ITEM" => Ok(Self::WrongItem),
            "NOT_AS_DESCRIBED" => Ok(Self::NotAsDescribed),
            "SIZE_OR_FIT" => Ok(Self::SizeOrFit),
            "ARRIVED_LATE" => Ok(Self::ArrivedLate),
            "OTHER" => Ok(Self::Other),
            other => Err(colibri_core::UnknownStatus(other.to_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_order_item_line_total() {
        let item = OrderItem {
            product_id: ProductId::new(1),
            variant_id: Some(VariantId::new(2)),
            name: "Rebozo artesanal".to_owned(),
            unit_price: Money::mxn(dec!(350.00)),
            quantity: 2,
        };
        assert_eq!(item.line_total().amount, dec!(700.00));
    }

    #[test]
    fn test_store_fault_reasons_refund_shipping() {
        assert!(ReturnReason::Defective.is_store_fault());
        assert!(ReturnReason::WrongItem.is_store_fault());
        assert!(ReturnReason::NotAsDescribed.is_store_fault());
        assert!(!ReturnReason::SizeOrFit.is_store_fault());
        assert!(!ReturnReason::ArrivedLate.is_store_fault());
        assert!(!ReturnReason::Other.is_store_fault());
    }

    #[test]
    fn test_reason_round_trips() {
        for reason in [
            CancellationReason::ChangedMind,
            CancellationReason::FoundBetterPrice,
            CancellationReason::OrderedByMistake,
            CancellationReason::DeliveryTooSlow,
            CancellationReason::Other,
        ] {
            assert_eq!(
                reason.as_str().parse::<CancellationReason>().expect("parse"),
                reason
            );
        }
        for reason in [
            ReturnReason::Defective,
            ReturnReason::WrongItem,
            ReturnReason::NotAsDescribed,
            ReturnReason::SizeOrFit,
            ReturnReason::ArrivedLate,
            ReturnReason::Other,
        ] {
            assert_eq!(reason.as_str().parse::<ReturnReason>().expect("parse"), reason);
        }
    }
}
