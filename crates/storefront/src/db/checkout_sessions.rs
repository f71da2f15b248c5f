//! Checkout session repository.
//!
//! One active session per user (unique index on `user_id`). Shipping
//! selection and summary are JSONB; expiry is a plain timestamp checked by
//! the service on load, never by a background job.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use colibri_core::{AddressId, CartId, CheckoutSessionId, PaymentMethodId, UserId};

use super::RepositoryError;
use crate::models::checkout::{CheckoutSession, CheckoutStep, OrderSummary};
use crate::models::shipping::ShippingSelection;

#[derive(sqlx::FromRow)]
struct SessionRow {
    id: i32,
    user_id: i32,
    cart_id: i32,
    item_count: i32,
    step: String,
    address_id: Option<i32>,
    shipping: Option<serde_json::Value>,
    payment_method_id: Option<i32>,
    summary: serde_json::Value,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl SessionRow {
    fn into_domain(self) -> Result<CheckoutSession, RepositoryError> {
        let step = CheckoutStep::from_str(&self.step)
            .map_err(|e| RepositoryError::corrupt("invalid checkout step", e))?;
        let shipping: Option<ShippingSelection> = self
            .shipping
            .map(serde_json::from_value)
            .transpose()
            .map_err(|e| RepositoryError::corrupt("invalid shipping selection", e))?;
        let summary: OrderSummary = serde_json::from_value(self.summary)
            .map_err(|e| RepositoryError::corrupt("invalid order summary", e))?;
        let item_count = u32::try_from(self.item_count).map_err(|_| {
            RepositoryError::DataCorruption(format!("negative item count {}", self.item_count))
        })?;

        Ok(CheckoutSession {
            id: CheckoutSessionId::new(self.id),
            user_id: UserId::new(self.user_id),
            cart_id: CartId::new(self.cart_id),
            item_count,
            step,
            address_id: self.address_id.map(AddressId::new),
            shipping,
            payment_method_id: self.payment_method_id.map(PaymentMethodId::new),
            summary,
            created_at: self.created_at,
            expires_at: self.expires_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r"
    SELECT id, user_id, cart_id, item_count, step, address_id, shipping,
           payment_method_id, summary, created_at, expires_at, updated_at
    FROM storefront.checkout_sessions
";

/// Repository for checkout session database operations.
pub struct CheckoutSessionRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> CheckoutSessionRepository<'a> {
    /// Create a new checkout session repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Get the user's active session, if any. Expiry is the caller's concern.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<CheckoutSession>, RepositoryError> {
        let row: Option<SessionRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE user_id = $1"))
                .bind(user_id.as_i32())
                .fetch_optional(self.pool)
                .await?;

        row.map(SessionRow::into_domain).transpose()
    }

    /// Create a fresh session for the user, replacing any existing one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a statement fails or the
    /// summary cannot be serialized.
    pub async fn create(
        &self,
        user_id: UserId,
        cart_id: CartId,
        item_count: u32,
        summary: &OrderSummary,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Result<CheckoutSession, RepositoryError> {
        let summary_json = serde_json::to_value(summary)
            .map_err(|e| RepositoryError::corrupt("failed to serialize summary", e))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM storefront.checkout_sessions WHERE user_id = $1")
            .bind(user_id.as_i32())
            .execute(&mut *tx)
            .await?;

        let row: SessionRow = sqlx::query_as(
            r"
            INSERT INTO storefront.checkout_sessions
                (user_id, cart_id, item_count, step, summary, created_at, expires_at, updated_at)
            VALUES ($1, $2, $3, 'SHIPPING', $4, $5, $6, $5)
            RETURNING id, user_id, cart_id, item_count, step, address_id, shipping,
                      payment_method_id, summary, created_at, expires_at, updated_at
            ",
        )
        .bind(user_id.as_i32())
        .bind(cart_id.as_i32())
        .bind(i32::try_from(item_count).unwrap_or(i32::MAX))
        .bind(summary_json)
        .bind(created_at)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        row.into_domain()
    }

    /// Persist a mutated session (step, selections, summary).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session no longer exists.
    pub async fn update(&self, session: &CheckoutSession) -> Result<(), RepositoryError> {
        let shipping_json = session
            .shipping
            .as_ref()
            .map(serde_json::to_value)
            .transpose()
            .map_err(|e| RepositoryError::corrupt("failed to serialize shipping", e))?;
        let summary_json = serde_json::to_value(&session.summary)
            .map_err(|e| RepositoryError::corrupt("failed to serialize summary", e))?;

        let result = sqlx::query(
            r"
            UPDATE storefront.checkout_sessions
            SET step = $2, address_id = $3, shipping = $4, payment_method_id = $5,
                summary = $6, updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(session.id.as_i32())
        .bind(session.step.as_str())
        .bind(session.address_id.map(|id| id.as_i32()))
        .bind(shipping_json)
        .bind(session.payment_method_id.map(|id| id.as_i32()))
        .bind(summary_json)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    /// Delete the user's session (order created, cancelled, or expired).
    ///
    /// # Returns
    ///
    /// Returns `true` if a session was deleted.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete_for_user(&self, user_id: UserId) -> Result<bool, RepositoryError> {
        let result =
            sqlx::query("DELETE FROM storefront.checkout_sessions WHERE user_id = $1")
                .bind(user_id.as_i32())
                .execute(self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
