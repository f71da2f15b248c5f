//! Payment method repository.
//!
//! Stores tokenized methods only; the single-default invariant is enforced
//! the same way as for addresses, in one transaction.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use colibri_core::{PaymentMethodId, UserId};

use super::RepositoryError;
use crate::models::payment::{CardBrand, PaymentMethod, PaymentMethodType};

/// Fields accepted when saving a payment method.
#[derive(Debug, Clone)]
pub struct NewPaymentMethod {
    pub method_type: PaymentMethodType,
    pub last4: Option<String>,
    pub brand: Option<CardBrand>,
    pub exp_month: Option<u8>,
    pub exp_year: Option<u16>,
    pub provider_id: Option<String>,
    pub is_default: bool,
}

#[derive(sqlx::FromRow)]
struct PaymentMethodRow {
    id: i32,
    user_id: i32,
    method_type: String,
    last4: Option<String>,
    brand: Option<String>,
    exp_month: Option<i16>,
    exp_year: Option<i16>,
    provider_id: Option<String>,
    is_default: bool,
    created_at: DateTime<Utc>,
}

impl PaymentMethodRow {
    fn into_domain(self) -> Result<PaymentMethod, RepositoryError> {
        let method_type = PaymentMethodType::from_str(&self.method_type)
            .map_err(|e| RepositoryError::corrupt("invalid payment method type", e))?;
        let brand = self
            .brand
            .as_deref()
            .map(CardBrand::from_str)
            .transpose()
            .map_err(|e| RepositoryError::corrupt("invalid card brand", e))?;

        Ok(PaymentMethod {
            id: PaymentMethodId::new(self.id),
            user_id: UserId::new(self.user_id),
            method_type,
            last4: self.last4,
            brand,
            exp_month: self.exp_month.and_then(|m| u8::try_from(m).ok()),
            exp_year: self.exp_year.and_then(|y| u16::try_from(y).ok()),
            provider_id: self.provider_id,
            is_default: self.is_default,
            created_at: self.created_at,
        })
    }
}

const SELECT_COLUMNS: &str = r"
    SELECT id, user_id, method_type, last4, brand, exp_month, exp_year,
           provider_id, is_default, created_at
    FROM storefront.payment_methods
";

/// Repository for payment method database operations.
pub struct PaymentMethodRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> PaymentMethodRepository<'a> {
    /// Create a new payment method repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's saved methods, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<PaymentMethod>, RepositoryError> {
        let rows: Vec<PaymentMethodRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE user_id = $1 ORDER BY is_default DESC, created_at ASC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(PaymentMethodRow::into_domain).collect()
    }

    /// Get one method by ID, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        method_id: PaymentMethodId,
    ) -> Result<Option<PaymentMethod>, RepositoryError> {
        let row: Option<PaymentMethodRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1 AND user_id = $2"))
                .bind(method_id.as_i32())
                .bind(user_id.as_i32())
                .fetch_optional(self.pool)
                .await?;

        row.map(PaymentMethodRow::into_domain).transpose()
    }

    /// Save a method. Card methods must carry last4 + brand; the caller
    /// validates this via `PaymentMethod::is_well_formed` semantics and the
    /// table enforces it with a CHECK constraint.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the CHECK constraint rejects
    /// the row, `RepositoryError::Database` otherwise.
    pub async fn create(
        &self,
        user_id: UserId,
        new: &NewPaymentMethod,
    ) -> Result<PaymentMethod, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if new.is_default {
            sqlx::query(
                "UPDATE storefront.payment_methods SET is_default = FALSE WHERE user_id = $1",
            )
            .bind(user_id.as_i32())
            .execute(&mut *tx)
            .await?;
        }

        let row: PaymentMethodRow = sqlx::query_as(
            r"
            INSERT INTO storefront.payment_methods
                (user_id, method_type, last4, brand, exp_month, exp_year,
                 provider_id, is_default)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, user_id, method_type, last4, brand, exp_month, exp_year,
                      provider_id, is_default, created_at
            ",
        )
        .bind(user_id.as_i32())
        .bind(new.method_type.as_str())
        .bind(&new.last4)
        .bind(new.brand.map(CardBrand::as_str))
        .bind(new.exp_month.map(i16::from))
        .bind(new.exp_year.map(|y| i16::try_from(y).unwrap_or(i16::MAX)))
        .bind(&new.provider_id)
        .bind(new.is_default)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_check_violation()
            {
                return RepositoryError::Conflict("card methods require last4 and brand".to_owned());
            }
            RepositoryError::Database(e)
        })?;

        tx.commit().await?;

        row.into_domain()
    }

    /// Mark one method as the default, clearing any previous default in the
    /// same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the method doesn't exist or
    /// belongs to another user.
    pub async fn set_default(
        &self,
        user_id: UserId,
        method_id: PaymentMethodId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE storefront.payment_methods SET is_default = FALSE WHERE user_id = $1",
        )
        .bind(user_id.as_i32())
        .execute(&mut *tx)
        .await?;

        let result = sqlx::query(
            "UPDATE storefront.payment_methods SET is_default = TRUE
             WHERE id = $1 AND user_id = $2",
        )
        .bind(method_id.as_i32())
        .bind(user_id.as_i32())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete a saved method.
    ///
    /// # Returns
    ///
    /// Returns `true` if the method was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(
        &self,
        user_id: UserId,
        method_id: PaymentMethodId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.payment_methods WHERE id = $1 AND user_id = $2",
        )
        .bind(method_id.as_i32())
        .bind(user_id.as_i32())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
