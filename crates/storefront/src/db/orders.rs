//! Order repository.
//!
//! Orders are append-only: the snapshot columns (items, address, shipping,
//! payment, summary) are JSONB and never updated after insert. Only `status`
//! and `payment_intent_id` move, and every status move writes an
//! `order_events` row in the same transaction.
//!
//! `order_number` carries a UNIQUE constraint; `create` regenerates and
//! retries a bounded number of times when the insert collides.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use colibri_core::{
    CancellationId, CancellationStatus, Money, OrderEventId, OrderId, OrderStatus, ReturnId,
    ReturnStatus, UserId,
};

use super::RepositoryError;
use crate::models::order::{
    CancellationReason, FiscalInvoice, Order, OrderCancellation, OrderEvent, OrderItem,
    OrderReturn, PaymentSnapshot, ReturnReason,
};

/// Attempts before giving up on an order-number collision.
const ORDER_NUMBER_ATTEMPTS: usize = 5;

/// Everything needed to insert an order, minus the generated order number.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: UserId,
    pub items: Vec<OrderItem>,
    pub shipping_address: serde_json::Value,
    pub shipping: serde_json::Value,
    pub payment: PaymentSnapshot,
    pub summary: serde_json::Value,
    pub invoice: Option<FiscalInvoice>,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i32,
    user_id: i32,
    order_number: String,
    status: String,
    items: serde_json::Value,
    shipping_address: serde_json::Value,
    shipping: serde_json::Value,
    payment: serde_json::Value,
    summary: serde_json::Value,
    payment_intent_id: Option<String>,
    invoice: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl OrderRow {
    fn into_domain(self, events: Vec<OrderEvent>) -> Result<Order, RepositoryError> {
        let status = OrderStatus::from_str(&self.status)
            .map_err(|e| RepositoryError::corrupt("invalid order status", e))?;
        let items = serde_json::from_value(self.items)
            .map_err(|e| RepositoryError::corrupt("invalid order items", e))?;
        let shipping_address = serde_json::from_value(self.shipping_address)
            .map_err(|e| RepositoryError::corrupt("invalid address snapshot", e))?;
        let shipping = serde_json::from_value(self.shipping)
            .map_err(|e| RepositoryError::corrupt("invalid shipping snapshot", e))?;
        let payment = serde_json::from_value(self.payment)
            .map_err(|e| RepositoryError::corrupt("invalid payment snapshot", e))?;
        let summary = serde_json::from_value(self.summary)
            .map_err(|e| RepositoryError::corrupt("invalid order summary", e))?;
        let invoice = self
            .invoice
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| RepositoryError::corrupt("invalid invoice data", e))?;

        Ok(Order {
            id: OrderId::new(self.id),
            user_id: UserId::new(self.user_id),
            order_number: self.order_number,
            status,
            items,
            shipping_address,
            shipping,
            payment,
            summary,
            payment_intent_id: self.payment_intent_id,
            invoice,
            events,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct EventRow {
    id: i32,
    order_id: i32,
    status: Option<String>,
    note: String,
    created_at: DateTime<Utc>,
}

impl EventRow {
    fn into_domain(self) -> Result<OrderEvent, RepositoryError> {
        let status = self
            .status
            .as_deref()
            .map(OrderStatus::from_str)
            .transpose()
            .map_err(|e| RepositoryError::corrupt("invalid event status", e))?;

        Ok(OrderEvent {
            id: OrderEventId::new(self.id),
            order_id: OrderId::new(self.order_id),
            status,
            note: self.note,
            created_at: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CancellationRow {
    id: i32,
    order_id: i32,
    status: String,
    reason: String,
    comment: Option<String>,
    refund_amount: Decimal,
    created_at: DateTime<Utc>,
    resolved_at: Option<DateTime<Utc>>,
}

impl CancellationRow {
    fn into_domain(self) -> Result<OrderCancellation, RepositoryError> {
        let status = CancellationStatus::from_str(&self.status)
            .map_err(|e| RepositoryError::corrupt("invalid cancellation status", e))?;
        let reason = CancellationReason::from_str(&self.reason)
            .map_err(|e| RepositoryError::corrupt("invalid cancellation reason", e))?;

        Ok(OrderCancellation {
            id: CancellationId::new(self.id),
            order_id: OrderId::new(self.order_id),
            status,
            reason,
            comment: self.comment,
            refund_amount: Money::mxn(self.refund_amount),
            created_at: self.created_at,
            resolved_at: self.resolved_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ReturnRow {
    id: i32,
    order_id: i32,
    status: String,
    reason: String,
    comment: Option<String>,
    refund_amount: Decimal,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl ReturnRow {
    fn into_domain(self) -> Result<OrderReturn, RepositoryError> {
        let status = ReturnStatus::from_str(&self.status)
            .map_err(|e| RepositoryError::corrupt("invalid return status", e))?;
        let reason = ReturnReason::from_str(&self.reason)
            .map_err(|e| RepositoryError::corrupt("invalid return reason", e))?;

        Ok(OrderReturn {
            id: ReturnId::new(self.id),
            order_id: OrderId::new(self.order_id),
            status,
            reason,
            comment: self.comment,
            refund_amount: Money::mxn(self.refund_amount),
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r"
    SELECT id, user_id, order_number, status, items, shipping_address, shipping,
           payment, summary, payment_intent_id, invoice, created_at, updated_at
    FROM storefront.orders
";

/// Repository for order database operations.
pub struct OrderRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Insert an order with a generated order number and its initial event.
    ///
    /// The caller supplies the number generator; on a unique-constraint
    /// collision the insert is retried with a fresh number, up to a bounded
    /// number of attempts.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if every attempt collided, or
    /// `RepositoryError::Database` for any other failure.
    pub async fn create(
        &self,
        new: &NewOrder,
        mut next_order_number: impl FnMut() -> String,
    ) -> Result<Order, RepositoryError> {
        let items = serde_json::to_value(&new.items)
            .map_err(|e| RepositoryError::corrupt("failed to serialize items", e))?;
        let payment = serde_json::to_value(&new.payment)
            .map_err(|e| RepositoryError::corrupt("failed to serialize payment", e))?;
        let invoice = new
            .invoice
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RepositoryError::corrupt("failed to serialize invoice", e))?;

        for _ in 0..ORDER_NUMBER_ATTEMPTS {
            let order_number = next_order_number();
            let mut tx = self.pool.begin().await?;

            let inserted: Result<OrderRow, sqlx::Error> = sqlx::query_as(
                r"
                INSERT INTO storefront.orders
                    (user_id, order_number, status, items, shipping_address,
                     shipping, payment, summary, invoice)
                VALUES ($1, $2, 'PENDING_PAYMENT', $3, $4, $5, $6, $7, $8)
                RETURNING id, user_id, order_number, status, items, shipping_address,
                          shipping, payment, summary, payment_intent_id, invoice,
                          created_at, updated_at
                ",
            )
            .bind(new.user_id.as_i32())
            .bind(&order_number)
            .bind(&items)
            .bind(&new.shipping_address)
            .bind(&new.shipping)
            .bind(&payment)
            .bind(&new.summary)
            .bind(&invoice)
            .fetch_one(&mut *tx)
            .await;

            let row = match inserted {
                Ok(row) => row,
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    tx.rollback().await?;
                    continue;
                }
                Err(e) => return Err(e.into()),
            };

            let event: EventRow = sqlx::query_as(
                r"
                INSERT INTO storefront.order_events (order_id, status, note)
                VALUES ($1, 'PENDING_PAYMENT', 'order placed')
                RETURNING id, order_id, status, note, created_at
                ",
            )
            .bind(row.id)
            .fetch_one(&mut *tx)
            .await?;

            tx.commit().await?;

            return row.into_domain(vec![event.into_domain()?]);
        }

        Err(RepositoryError::Conflict(
            "could not allocate a unique order number".to_owned(),
        ))
    }

    /// List a user's orders, newest first, with their event timelines.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Order>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        let ids: Vec<i32> = rows.iter().map(|r| r.id).collect();
        let event_rows: Vec<EventRow> = sqlx::query_as(
            "SELECT id, order_id, status, note, created_at
             FROM storefront.order_events
             WHERE order_id = ANY($1) ORDER BY created_at ASC, id ASC",
        )
        .bind(&ids)
        .fetch_all(self.pool)
        .await?;

        let mut events_by_order: std::collections::HashMap<i32, Vec<OrderEvent>> =
            std::collections::HashMap::new();
        for event in event_rows {
            let order_id = event.order_id;
            events_by_order
                .entry(order_id)
                .or_default()
                .push(event.into_domain()?);
        }

        rows.into_iter()
            .map(|row| {
                let events = events_by_order.remove(&row.id).unwrap_or_default();
                row.into_domain(events)
            })
            .collect()
    }

    /// Get one order with its timeline, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist or
    /// belongs to another user.
    pub async fn get(&self, user_id: UserId, order_id: OrderId) -> Result<Order, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1 AND user_id = $2"))
                .bind(order_id.as_i32())
                .bind(user_id.as_i32())
                .fetch_optional(self.pool)
                .await?;

        let row = row.ok_or(RepositoryError::NotFound)?;
        let events = self.events_for(row.id).await?;
        row.into_domain(events)
    }

    /// Get one order without an owner scope (webhook and admin paths).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn get_by_id(&self, order_id: OrderId) -> Result<Order, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1"))
            .bind(order_id.as_i32())
            .fetch_optional(self.pool)
            .await?;

        let row = row.ok_or(RepositoryError::NotFound)?;
        let events = self.events_for(row.id).await?;
        row.into_domain(events)
    }

    /// Look up an order by its gateway payment intent (webhook path, so no
    /// user scope).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order carries the intent.
    pub async fn get_by_payment_intent(&self, intent_id: &str) -> Result<Order, RepositoryError> {
        let row: Option<OrderRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE payment_intent_id = $1"))
                .bind(intent_id)
                .fetch_optional(self.pool)
                .await?;

        let row = row.ok_or(RepositoryError::NotFound)?;
        let events = self.events_for(row.id).await?;
        row.into_domain(events)
    }

    /// Attach the gateway payment intent to a freshly created order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn set_payment_intent(
        &self,
        order_id: OrderId,
        intent_id: &str,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.orders SET payment_intent_id = $2, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(order_id.as_i32())
        .bind(intent_id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Move an order to a new status and append the matching event, in one
    /// transaction. The caller has already checked the transition is legal.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the order doesn't exist.
    pub async fn update_status(
        &self,
        order_id: OrderId,
        status: OrderStatus,
        note: &str,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE storefront.orders SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(order_id.as_i32())
        .bind(status.as_str())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "INSERT INTO storefront.order_events (order_id, status, note) VALUES ($1, $2, $3)",
        )
        .bind(order_id.as_i32())
        .bind(status.as_str())
        .bind(note)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Append a note-only event (no status change).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn append_note(&self, order_id: OrderId, note: &str) -> Result<(), RepositoryError> {
        sqlx::query("INSERT INTO storefront.order_events (order_id, note) VALUES ($1, $2)")
            .bind(order_id.as_i32())
            .bind(note)
            .execute(self.pool)
            .await?;
        Ok(())
    }

    /// Record a cancellation request for an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order already has a pending
    /// request (unique index on `(order_id) WHERE status = 'PENDING'`).
    pub async fn create_cancellation(
        &self,
        order_id: OrderId,
        reason: CancellationReason,
        comment: Option<&str>,
        refund_amount: &Money,
    ) -> Result<OrderCancellation, RepositoryError> {
        let row: CancellationRow = sqlx::query_as(
            r"
            INSERT INTO storefront.order_cancellations
                (order_id, status, reason, comment, refund_amount)
            VALUES ($1, 'PENDING', $2, $3, $4)
            RETURNING id, order_id, status, reason, comment, refund_amount,
                      created_at, resolved_at
            ",
        )
        .bind(order_id.as_i32())
        .bind(reason.as_str())
        .bind(comment)
        .bind(refund_amount.amount)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict(
                    "order already has a pending cancellation".to_owned(),
                );
            }
            RepositoryError::Database(e)
        })?;

        row.into_domain()
    }

    /// List cancellation requests for an order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_cancellations(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<OrderCancellation>, RepositoryError> {
        let rows: Vec<CancellationRow> = sqlx::query_as(
            "SELECT id, order_id, status, reason, comment, refund_amount,
                    created_at, resolved_at
             FROM storefront.order_cancellations
             WHERE order_id = $1 ORDER BY created_at DESC",
        )
        .bind(order_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(CancellationRow::into_domain).collect()
    }

    /// Get one cancellation request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it doesn't exist.
    pub async fn get_cancellation(
        &self,
        cancellation_id: CancellationId,
    ) -> Result<OrderCancellation, RepositoryError> {
        let row: Option<CancellationRow> = sqlx::query_as(
            "SELECT id, order_id, status, reason, comment, refund_amount,
                    created_at, resolved_at
             FROM storefront.order_cancellations WHERE id = $1",
        )
        .bind(cancellation_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.into_domain()
    }

    /// Resolve a pending cancellation request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no pending request matches.
    pub async fn resolve_cancellation(
        &self,
        cancellation_id: CancellationId,
        status: CancellationStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.order_cancellations
             SET status = $2, resolved_at = NOW()
             WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(cancellation_id.as_i32())
        .bind(status.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Record a return request for a delivered order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the order already has an open
    /// return.
    pub async fn create_return(
        &self,
        order_id: OrderId,
        reason: ReturnReason,
        comment: Option<&str>,
        refund_amount: &Money,
    ) -> Result<OrderReturn, RepositoryError> {
        let row: ReturnRow = sqlx::query_as(
            r"
            INSERT INTO storefront.order_returns
                (order_id, status, reason, comment, refund_amount)
            VALUES ($1, 'REQUESTED', $2, $3, $4)
            RETURNING id, order_id, status, reason, comment, refund_amount,
                      created_at, updated_at
            ",
        )
        .bind(order_id.as_i32())
        .bind(reason.as_str())
        .bind(comment)
        .bind(refund_amount.amount)
        .fetch_one(self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                return RepositoryError::Conflict("order already has an open return".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        row.into_domain()
    }

    /// List return requests for an order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_returns(
        &self,
        order_id: OrderId,
    ) -> Result<Vec<OrderReturn>, RepositoryError> {
        let rows: Vec<ReturnRow> = sqlx::query_as(
            "SELECT id, order_id, status, reason, comment, refund_amount,
                    created_at, updated_at
             FROM storefront.order_returns
             WHERE order_id = $1 ORDER BY created_at DESC",
        )
        .bind(order_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(ReturnRow::into_domain).collect()
    }

    /// Get one return request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if it doesn't exist.
    pub async fn get_return(&self, return_id: ReturnId) -> Result<OrderReturn, RepositoryError> {
        let row: Option<ReturnRow> = sqlx::query_as(
            "SELECT id, order_id, status, reason, comment, refund_amount,
                    created_at, updated_at
             FROM storefront.order_returns WHERE id = $1",
        )
        .bind(return_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.ok_or(RepositoryError::NotFound)?.into_domain()
    }

    /// Move a return request along its lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the return doesn't exist.
    pub async fn update_return_status(
        &self,
        return_id: ReturnId,
        status: ReturnStatus,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE storefront.order_returns SET status = $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(return_id.as_i32())
        .bind(status.as_str())
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn events_for(&self, order_id: i32) -> Result<Vec<OrderEvent>, RepositoryError> {
        let rows: Vec<EventRow> = sqlx::query_as(
            "SELECT id, order_id, status, note, created_at
             FROM storefront.order_events
             WHERE order_id = $1 ORDER BY created_at ASC, id ASC",
        )
        .bind(order_id)
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(EventRow::into_domain).collect()
    }
}
