//! Address repository.
//!
//! The "at most one default per user" invariant is enforced inside a single
//! transaction (clear all defaults, then set one), backed by a partial unique
//! index on `(user_id) WHERE is_default`.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use sqlx::PgPool;

use colibri_core::{AddressId, UserId};

use super::RepositoryError;
use crate::models::address::{Address, AddressLabel, MxState};

/// Fields accepted when creating or updating an address.
#[derive(Debug, Clone)]
pub struct NewAddress {
    pub recipient_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub street: String,
    pub exterior_number: String,
    pub interior_number: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: MxState,
    pub postal_code: String,
    pub label: AddressLabel,
    pub is_default: bool,
}

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: i32,
    user_id: i32,
    recipient_name: String,
    phone: String,
    email: Option<String>,
    street: String,
    exterior_number: String,
    interior_number: Option<String>,
    neighborhood: String,
    city: String,
    state: String,
    postal_code: String,
    country: String,
    is_default: bool,
    label: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl AddressRow {
    fn into_domain(self) -> Result<Address, RepositoryError> {
        let state = MxState::parse(&self.state).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("unknown state in database: {}", self.state))
        })?;
        let label = AddressLabel::from_str(&self.label)
            .map_err(|e| RepositoryError::corrupt("invalid address label", e))?;

        Ok(Address {
            id: AddressId::new(self.id),
            user_id: UserId::new(self.user_id),
            recipient_name: self.recipient_name,
            phone: self.phone,
            email: self.email,
            street: self.street,
            exterior_number: self.exterior_number,
            interior_number: self.interior_number,
            neighborhood: self.neighborhood,
            city: self.city,
            state,
            postal_code: self.postal_code,
            country: self.country,
            is_default: self.is_default,
            label,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = r"
    SELECT id, user_id, recipient_name, phone, email, street, exterior_number,
           interior_number, neighborhood, city, state, postal_code, country,
           is_default, label, created_at, updated_at
    FROM storefront.addresses
";

/// Repository for address database operations.
pub struct AddressRepository<'a> {
    pool: &'a PgPool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// List a user's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows: Vec<AddressRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE user_id = $1 ORDER BY is_default DESC, created_at ASC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(self.pool)
        .await?;

        rows.into_iter().map(AddressRow::into_domain).collect()
    }

    /// Get one address by ID, scoped to its owner.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<Option<Address>, RepositoryError> {
        let row: Option<AddressRow> =
            sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = $1 AND user_id = $2"))
                .bind(address_id.as_i32())
                .bind(user_id.as_i32())
                .fetch_optional(self.pool)
                .await?;

        row.map(AddressRow::into_domain).transpose()
    }

    /// Get the user's default address, if one is set.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_default(&self, user_id: UserId) -> Result<Option<Address>, RepositoryError> {
        let row: Option<AddressRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE user_id = $1 AND is_default"
        ))
        .bind(user_id.as_i32())
        .fetch_optional(self.pool)
        .await?;

        row.map(AddressRow::into_domain).transpose()
    }

    /// Create an address. When `is_default` is set, existing defaults are
    /// cleared in the same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if any statement fails.
    pub async fn create(
        &self,
        user_id: UserId,
        new: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if new.is_default {
            sqlx::query("UPDATE storefront.addresses SET is_default = FALSE WHERE user_id = $1")
                .bind(user_id.as_i32())
                .execute(&mut *tx)
                .await?;
        }

        let row: AddressRow = sqlx::query_as(
            r"
            INSERT INTO storefront.addresses
                (user_id, recipient_name, phone, email, street, exterior_number,
                 interior_number, neighborhood, city, state, postal_code, country,
                 is_default, label)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, 'MX', $12, $13)
            RETURNING id, user_id, recipient_name, phone, email, street, exterior_number,
                      interior_number, neighborhood, city, state, postal_code, country,
                      is_default, label, created_at, updated_at
            ",
        )
        .bind(user_id.as_i32())
        .bind(&new.recipient_name)
        .bind(&new.phone)
        .bind(&new.email)
        .bind(&new.street)
        .bind(&new.exterior_number)
        .bind(&new.interior_number)
        .bind(&new.neighborhood)
        .bind(&new.city)
        .bind(new.state.name())
        .bind(&new.postal_code)
        .bind(new.is_default)
        .bind(new.label.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        row.into_domain()
    }

    /// Update an address in place.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address doesn't exist or
    /// belongs to another user.
    pub async fn update(
        &self,
        user_id: UserId,
        address_id: AddressId,
        new: &NewAddress,
    ) -> Result<Address, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        if new.is_default {
            sqlx::query("UPDATE storefront.addresses SET is_default = FALSE WHERE user_id = $1")
                .bind(user_id.as_i32())
                .execute(&mut *tx)
                .await?;
        }

        let row: Option<AddressRow> = sqlx::query_as(
            r"
            UPDATE storefront.addresses
            SET recipient_name = $3, phone = $4, email = $5, street = $6,
                exterior_number = $7, interior_number = $8, neighborhood = $9,
                city = $10, state = $11, postal_code = $12, is_default = $13,
                label = $14, updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING id, user_id, recipient_name, phone, email, street, exterior_number,
                      interior_number, neighborhood, city, state, postal_code, country,
                      is_default, label, created_at, updated_at
            ",
        )
        .bind(address_id.as_i32())
        .bind(user_id.as_i32())
        .bind(&new.recipient_name)
        .bind(&new.phone)
        .bind(&new.email)
        .bind(&new.street)
        .bind(&new.exterior_number)
        .bind(&new.interior_number)
        .bind(&new.neighborhood)
        .bind(&new.city)
        .bind(new.state.name())
        .bind(&new.postal_code)
        .bind(new.is_default)
        .bind(new.label.as_str())
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        row.ok_or(RepositoryError::NotFound)?.into_domain()
    }

    /// Mark one address as the default, clearing any previous default in the
    /// same transaction.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the address doesn't exist or
    /// belongs to another user.
    pub async fn set_default(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("UPDATE storefront.addresses SET is_default = FALSE WHERE user_id = $1")
            .bind(user_id.as_i32())
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query(
            "UPDATE storefront.addresses SET is_default = TRUE, updated_at = NOW()
             WHERE id = $1 AND user_id = $2",
        )
        .bind(address_id.as_i32())
        .bind(user_id.as_i32())
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            // Roll back the cleared defaults rather than leaving none set.
            tx.rollback().await?;
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    /// Delete an address.
    ///
    /// # Returns
    ///
    /// Returns `true` if the address was deleted, `false` if it didn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn delete(
        &self,
        user_id: UserId,
        address_id: AddressId,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "DELETE FROM storefront.addresses WHERE id = $1 AND user_id = $2",
        )
        .bind(address_id.as_i32())
        .bind(user_id.as_i32())
        .execute(self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}
