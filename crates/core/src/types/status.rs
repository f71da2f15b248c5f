//! Status enums for orders and their side aggregates.
//!
//! The order lifecycle is a monotonic graph: forward edges only, except for
//! cancellation and refund which branch off from a limited set of states.
//! Statuses are persisted as SCREAMING_SNAKE_CASE strings.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// Error returned when parsing a status string from storage.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

/// Order lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Order created, payment not yet confirmed.
    #[default]
    PendingPayment,
    /// Payment confirmed by the gateway.
    Paid,
    /// Order is being prepared for shipment.
    Processing,
    /// Order handed to the carrier.
    Shipped,
    /// Out for last-mile delivery.
    OutForDelivery,
    /// Delivered to the customer.
    Delivered,
    /// Order cancelled (before shipment).
    Cancelled,
    /// Payment refunded (after cancellation or return).
    Refunded,
}

impl OrderStatus {
    /// Whether a transition from `self` to `next` follows the lifecycle graph.
    ///
    /// Forward edges are strictly linear. `Cancelled` is reachable only from
    /// pre-shipment states, and `Refunded` only from `Cancelled` or
    /// `Delivered` (via an approved return).
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::PendingPayment, Self::Paid)
                | (Self::Paid, Self::Processing)
                | (Self::Processing, Self::Shipped)
                | (Self::Shipped, Self::OutForDelivery)
                | (Self::OutForDelivery, Self::Delivered)
                | (
                    Self::PendingPayment | Self::Paid | Self::Processing,
                    Self::Cancelled
                )
                | (Self::Cancelled | Self::Delivered, Self::Refunded)
        )
    }

    /// Whether the customer may request cancellation in this state.
    #[must_use]
    pub const fn can_cancel(self) -> bool {
        matches!(self, Self::PendingPayment | Self::Paid | Self::Processing)
    }

    /// Whether the customer may request a return in this state.
    #[must_use]
    pub const fn can_return(self) -> bool {
        matches!(self, Self::Delivered)
    }

    /// Whether this is a terminal state.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled | Self::Refunded)
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PendingPayment => "PENDING_PAYMENT",
            Self::Paid => "PAID",
            Self::Processing => "PROCESSING",
            Self::Shipped => "SHIPPED",
            Self::OutForDelivery => "OUT_FOR_DELIVERY",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
            Self::Refunded => "REFUNDED",
        }
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING_PAYMENT" => Ok(Self::PendingPayment),
            "PAID" => Ok(Self::Paid),
            "PROCESSING" => Ok(Self::Processing),
            "SHIPPED" => Ok(Self::Shipped),
            "OUT_FOR_DELIVERY" => Ok(Self::OutForDelivery),
            "DELIVERED" => Ok(Self::Delivered),
            "CANCELLED" => Ok(Self::Cancelled),
            "REFUNDED" => Ok(Self::Refunded),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cancellation request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CancellationStatus {
    /// Awaiting review.
    #[default]
    Pending,
    /// Approved; the order will be cancelled and refunded.
    Approved,
    /// Rejected; the order continues its lifecycle.
    Rejected,
}

impl CancellationStatus {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Approved => "APPROVED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl FromStr for CancellationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(Self::Pending),
            "APPROVED" => Ok(Self::Approved),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

impl fmt::Display for CancellationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Return request status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReturnStatus {
    /// Return requested by the customer.
    #[default]
    Requested,
    /// Request approved; awaiting the package.
    Approved,
    /// Package in transit back to the warehouse.
    InTransit,
    /// Package received and inspected.
    Received,
    /// Refund issued.
    Refunded,
    /// Request rejected.
    Rejected,
}

impl ReturnStatus {
    /// Whether a transition from `self` to `next` is allowed.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Requested, Self::Approved | Self::Rejected)
                | (Self::Approved, Self::InTransit)
                | (Self::InTransit, Self::Received)
                | (Self::Received, Self::Refunded)
        )
    }

    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Requested => "REQUESTED",
            Self::Approved => "APPROVED",
            Self::InTransit => "IN_TRANSIT",
            Self::Received => "RECEIVED",
            Self::Refunded => "REFUNDED",
            Self::Rejected => "REJECTED",
        }
    }
}

impl FromStr for ReturnStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "REQUESTED" => Ok(Self::Requested),
            "APPROVED" => Ok(Self::Approved),
            "IN_TRANSIT" => Ok(Self::InTransit),
            "RECEIVED" => Ok(Self::Received),
            "REFUNDED" => Ok(Self::Refunded),
            "REJECTED" => Ok(Self::Rejected),
            other => Err(UnknownStatus(other.to_owned())),
        }
    }
}

impl fmt::Display for ReturnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_edges_are_linear() {
        use OrderStatus::*;
        let forward = [
            (PendingPayment, Paid),
            (Paid, Processing),
            (Processing, Shipped),
            (Shipped, OutForDelivery),
            (OutForDelivery, Delivered),
        ];
        for (from, to) in forward {
            assert!(from.can_transition_to(to), "{from} -> {to} should be legal");
            assert!(!to.can_transition_to(from), "{to} -> {from} should be illegal");
        }
    }

    #[test]
    fn test_no_skipping_forward() {
        assert!(!OrderStatus::PendingPayment.can_transition_to(OrderStatus::Processing));
        assert!(!OrderStatus::Paid.can_transition_to(OrderStatus::Shipped));
        assert!(!OrderStatus::Processing.can_transition_to(OrderStatus::Delivered));
    }

    #[test]
    fn test_cancellation_only_before_shipment() {
        assert!(OrderStatus::PendingPayment.can_cancel());
        assert!(OrderStatus::Paid.can_cancel());
        assert!(OrderStatus::Processing.can_cancel());
        assert!(!OrderStatus::Shipped.can_cancel());
        assert!(!OrderStatus::Delivered.can_cancel());
        assert!(!OrderStatus::Shipped.can_transition_to(OrderStatus::Cancelled));
    }

    #[test]
    fn test_return_only_after_delivery() {
        assert!(OrderStatus::Delivered.can_return());
        assert!(!OrderStatus::Shipped.can_return());
        assert!(OrderStatus::Delivered.can_transition_to(OrderStatus::Refunded));
    }

    #[test]
    fn test_terminal_states() {
        assert!(OrderStatus::Delivered.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
        assert!(OrderStatus::Refunded.is_terminal());
        assert!(!OrderStatus::Processing.is_terminal());
    }

    #[test]
    fn test_order_status_round_trip() {
        for status in [
            OrderStatus::PendingPayment,
            OrderStatus::Paid,
            OrderStatus::Processing,
            OrderStatus::Shipped,
            OrderStatus::OutForDelivery,
            OrderStatus::Delivered,
            OrderStatus::Cancelled,
            OrderStatus::Refunded,
        ] {
            assert_eq!(status.as_str().parse::<OrderStatus>().expect("parse"), status);
        }
        assert!("BOGUS".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_return_status_flow() {
        use ReturnStatus::*;
        assert!(Requested.can_transition_to(Approved));
        assert!(Requested.can_transition_to(Rejected));
        assert!(Approved.can_transition_to(InTransit));
        assert!(InTransit.can_transition_to(Received));
        assert!(Received.can_transition_to(Refunded));
        assert!(!Rejected.can_transition_to(Approved));
        assert!(!Refunded.can_transition_to(Requested));
    }
}
