//! Order history, cancellations, returns, and webhook-driven status moves.
//!
//! Status moves always go through [`colibri_core::OrderStatus`]'s transition
//! guard; the only back-edges in the lifecycle are cancellation and return.
//! Cancellation and return requests start pending and are resolved by an
//! operator (see `colibri-cli`), which is when refunds are issued.

use chrono::{Duration, Utc};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, warn};

use colibri_core::{
    CancellationId, CancellationStatus, OrderId, OrderStatus, ReturnId, ReturnStatus, UserId,
};

use crate::checkout::rules::{cancellation_refund, return_refund};
use crate::db::{OrderRepository, RepositoryError};
use crate::models::order::{
    CancellationReason, Order, OrderCancellation, OrderReturn, ReturnReason,
};
use crate::services::stripe::{StripeClient, StripeError};

/// Days after delivery during which a return may be requested.
pub const RETURN_WINDOW_DAYS: i64 = 30;

/// Errors surfaced by order operations.
#[derive(Debug, Error)]
pub enum OrderServiceError {
    /// The order's current status forbids the operation.
    #[error("operation not allowed: {0}")]
    NotAllowed(String),

    /// Reason `OTHER` requires a free-form comment.
    #[error("a comment is required for reason OTHER")]
    CommentRequired,

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Payment gateway failure.
    #[error(transparent)]
    Stripe(#[from] StripeError),
}

/// Order history and lifecycle service.
pub struct OrderService<'a> {
    orders: OrderRepository<'a>,
    stripe: &'a StripeClient,
}

impl<'a> OrderService<'a> {
    /// Create a new order service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, stripe: &'a StripeClient) -> Self {
        Self {
            orders: OrderRepository::new(pool),
            stripe,
        }
    }

    /// List the user's orders, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Order>, OrderServiceError> {
        Ok(self.orders.list(user_id).await?)
    }

    /// Get one of the user's orders with its timeline.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` for unknown or foreign orders.
    pub async fn get(&self, user_id: UserId, order_id: OrderId) -> Result<Order, OrderServiceError> {
        Ok(self.orders.get(user_id, order_id).await?)
    }

    /// Request cancellation of a not-yet-shipped order.
    ///
    /// The request starts `PENDING`; the refund amount (always the full
    /// total, cancellation happens before shipment) is computed now and
    /// stored on the request.
    ///
    /// # Errors
    ///
    /// Returns `NotAllowed` when the order has already shipped and
    /// `CommentRequired` when reason `OTHER` has no comment.
    pub async fn request_cancellation(
        &self,
        user_id: UserId,
        order_id: OrderId,
        reason: CancellationReason,
        comment: Option<String>,
    ) -> Result<OrderCancellation, OrderServiceError> {
        let order = self.orders.get(user_id, order_id).await?;

        if !order.status.can_cancel() {
            return Err(OrderServiceError::NotAllowed(format!(
                "order {} cannot be cancelled in status {}",
                order.order_number, order.status
            )));
        }
        if reason == CancellationReason::Other && comment.as_deref().is_none_or(str::is_empty) {
            return Err(OrderServiceError::CommentRequired);
        }

        let refund = cancellation_refund(&order.summary);
        let cancellation = self
            .orders
            .create_cancellation(order_id, reason, comment.as_deref(), &refund)
            .await?;
        self.orders
            .append_note(order_id, "cancellation requested")
            .await?;

        info!(order_number = %order.order_number, reason = reason.as_str(), "cancellation requested");
        Ok(cancellation)
    }

    /// Resolve a pending cancellation request.
    ///
    /// Approval cancels the order and, when a payment was captured, issues
    /// the refund through the gateway; the `charge.refunded` webhook later
    /// moves the order to `REFUNDED`.
    ///
    /// # Errors
    ///
    /// Returns `NotAllowed` when approving an order that meanwhile shipped.
    pub async fn resolve_cancellation(
        &self,
        cancellation_id: CancellationId,
        approve: bool,
    ) -> Result<(), OrderServiceError> {
        let cancellation = self.orders.get_cancellation(cancellation_id).await?;
        let order = self.orders.get_by_id(cancellation.order_id).await?;

        if !approve {
            self.orders
                .resolve_cancellation(cancellation_id, CancellationStatus::Rejected)
                .await?;
            self.orders
                .append_note(order.id, "cancellation rejected")
                .await?;
            return Ok(());
        }

        if !order.status.can_cancel() {
            return Err(OrderServiceError::NotAllowed(format!(
                "order {} can no longer be cancelled (status {})",
                order.order_number, order.status
            )));
        }

        self.orders
            .resolve_cancellation(cancellation_id, CancellationStatus::Approved)
            .await?;
        self.orders
            .update_status(order.id, OrderStatus::Cancelled, "cancellation approved")
            .await?;

        // Only refund captured payments; a PENDING_PAYMENT order has nothing
        // to refund.
        if order.status != OrderStatus::PendingPayment
            && let Some(intent_id) = order.payment_intent_id.as_deref()
        {
            self.stripe
                .create_refund(intent_id, &cancellation.refund_amount)
                .await?;
            self.orders.append_note(order.id, "refund initiated").await?;
        }

        info!(order_number = %order.order_number, "cancellation approved");
        Ok(())
    }

    /// Request a return of a delivered order, within the return window.
    ///
    /// The refund amount is computed now: full total when the store is at
    /// fault, otherwise the total minus shipping.
    ///
    /// # Errors
    ///
    /// Returns `NotAllowed` outside the window or for undelivered orders,
    /// `CommentRequired` when reason `OTHER` has no comment.
    pub async fn request_return(
        &self,
        user_id: UserId,
        order_id: OrderId,
        reason: ReturnReason,
        comment: Option<String>,
    ) -> Result<OrderReturn, OrderServiceError> {
        let order = self.orders.get(user_id, order_id).await?;

        if !order.status.can_return() {
            return Err(OrderServiceError::NotAllowed(format!(
                "order {} cannot be returned in status {}",
                order.order_number, order.status
            )));
        }

        let delivered_at = order
            .events
            .iter()
            .rev()
            .find(|event| event.status == Some(OrderStatus::Delivered))
            .map_or(order.updated_at, |event| event.created_at);
        if Utc::now() - delivered_at > Duration::days(RETURN_WINDOW_DAYS) {
            return Err(OrderServiceError::NotAllowed(format!(
                "return window of {RETURN_WINDOW_DAYS} days has passed"
            )));
        }

        if reason == ReturnReason::Other && comment.as_deref().is_none_or(str::is_empty) {
            return Err(OrderServiceError::CommentRequired);
        }

        let refund = return_refund(&order.summary, reason);
        let request = self
            .orders
            .create_return(order_id, reason, comment.as_deref(), &refund)
            .await?;
        self.orders.append_note(order_id, "return requested").await?;

        info!(order_number = %order.order_number, reason = reason.as_str(), "return requested");
        Ok(request)
    }

    /// Move a return request along its lifecycle (operator action).
    ///
    /// Reaching `REFUNDED` issues the gateway refund.
    ///
    /// # Errors
    ///
    /// Returns `NotAllowed` for transitions outside the return graph.
    pub async fn advance_return(
        &self,
        return_id: ReturnId,
        next: ReturnStatus,
    ) -> Result<(), OrderServiceError> {
        let request = self.orders.get_return(return_id).await?;

        if !request.status.can_transition_to(next) {
            return Err(OrderServiceError::NotAllowed(format!(
                "return cannot move from {} to {}",
                request.status, next
            )));
        }

        self.orders.update_return_status(return_id, next).await?;
        self.orders
            .append_note(request.order_id, &format!("return {}", next.as_str().to_lowercase()))
            .await?;

        if next == ReturnStatus::Refunded {
            let order = self.orders.get_by_id(request.order_id).await?;
            if let Some(intent_id) = order.payment_intent_id.as_deref() {
                self.stripe
                    .create_refund(intent_id, &request.refund_amount)
                    .await?;
            }
        }

        Ok(())
    }

    /// Webhook: the gateway confirmed the payment.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when no order carries the intent.
    pub async fn mark_paid(&self, payment_intent_id: &str) -> Result<(), OrderServiceError> {
        let order = self.orders.get_by_payment_intent(payment_intent_id).await?;

        if !order.status.can_transition_to(OrderStatus::Paid) {
            // Duplicate webhook delivery; nothing to do.
            warn!(order_number = %order.order_number, status = %order.status, "ignoring stale payment confirmation");
            return Ok(());
        }

        self.orders
            .update_status(order.id, OrderStatus::Paid, "payment confirmed by gateway")
            .await?;
        info!(order_number = %order.order_number, "payment confirmed");
        Ok(())
    }

    /// Webhook: the payment attempt failed. The order stays in
    /// `PENDING_PAYMENT` so the customer can retry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when no order carries the intent.
    pub async fn mark_payment_failed(
        &self,
        payment_intent_id: &str,
    ) -> Result<(), OrderServiceError> {
        let order = self.orders.get_by_payment_intent(payment_intent_id).await?;
        self.orders
            .append_note(order.id, "payment attempt failed")
            .await?;
        warn!(order_number = %order.order_number, "payment attempt failed");
        Ok(())
    }

    /// Webhook: the gateway completed a refund.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` when no order carries the intent.
    pub async fn mark_refunded(&self, payment_intent_id: &str) -> Result<(), OrderServiceError> {
        let order = self.orders.get_by_payment_intent(payment_intent_id).await?;

        if !order.status.can_transition_to(OrderStatus::Refunded) {
            warn!(order_number = %order.order_number, status = %order.status, "ignoring refund for order not awaiting one");
            return Ok(());
        }

        self.orders
            .update_status(order.id, OrderStatus::Refunded, "refund completed by gateway")
            .await?;
        info!(order_number = %order.order_number, "refund completed");
        Ok(())
    }
}
