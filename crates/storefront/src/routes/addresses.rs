//! Address book route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use colibri_core::AddressId;

use crate::checkout::{CheckoutError, validate_address};
use crate::db::addresses::{AddressRepository, NewAddress};
use crate::error::{AppError, Result};
use crate::models::address::{Address, AddressLabel, MxState};
use crate::state::AppState;

use super::CurrentUser;

/// Address create/update payload.
#[derive(Debug, Deserialize)]
pub struct AddressPayload {
    pub recipient_name: String,
    pub phone: String,
    #[serde(default)]
    pub email: Option<String>,
    pub street: String,
    pub exterior_number: String,
    #[serde(default)]
    pub interior_number: Option<String>,
    pub neighborhood: String,
    pub city: String,
    pub state: MxState,
    pub postal_code: String,
    #[serde(default)]
    pub label: Option<AddressLabel>,
    #[serde(default)]
    pub is_default: bool,
}

impl AddressPayload {
    fn into_new_address(self, user: CurrentUser) -> Result<NewAddress> {
        let new = NewAddress {
            recipient_name: self.recipient_name,
            phone: self.phone,
            email: self.email,
            street: self.street,
            exterior_number: self.exterior_number,
            interior_number: self.interior_number,
            neighborhood: self.neighborhood,
            city: self.city,
            state: self.state,
            postal_code: self.postal_code,
            label: self.label.unwrap_or(AddressLabel::Home),
            is_default: self.is_default,
        };

        // Run the same field checks checkout applies, before touching the
        // database.
        let now = Utc::now();
        let candidate = Address {
            id: AddressId::new(0),
            user_id: user.0,
            recipient_name: new.recipient_name.clone(),
            phone: new.phone.clone(),
            email: new.email.clone(),
            street: new.street.clone(),
            exterior_number: new.exterior_number.clone(),
            interior_number: new.interior_number.clone(),
            neighborhood: new.neighborhood.clone(),
            city: new.city.clone(),
            state: new.state,
            postal_code: new.postal_code.clone(),
            country: "MX".to_owned(),
            is_default: new.is_default,
            label: new.label,
            created_at: now,
            updated_at: now,
        };
        let errors = validate_address(&candidate);
        if !errors.is_empty() {
            return Err(CheckoutError::InvalidAddress(errors).into());
        }

        Ok(new)
    }
}

/// GET /api/addresses
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<Address>>> {
    let addresses = AddressRepository::new(state.pool()).list(user.0).await?;
    Ok(Json(addresses))
}

/// POST /api/addresses
#[instrument(skip(state, payload))]
pub async fn create(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<AddressPayload>,
) -> Result<impl IntoResponse> {
    let new = payload.into_new_address(user)?;
    let address = AddressRepository::new(state.pool())
        .create(user.0, &new)
        .await?;
    Ok((StatusCode::CREATED, Json(address)))
}

/// PUT /api/addresses/{id}
#[instrument(skip(state, payload))]
pub async fn update(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<AddressPayload>,
) -> Result<Json<Address>> {
    let new = payload.into_new_address(user)?;
    let address = AddressRepository::new(state.pool())
        .update(user.0, AddressId::new(id), &new)
        .await?;
    Ok(Json(address))
}

/// DELETE /api/addresses/{id}
#[instrument(skip(state))]
pub async fn remove(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let deleted = AddressRepository::new(state.pool())
        .delete(user.0, AddressId::new(id))
        .await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("address {id}")))
    }
}

/// POST /api/addresses/{id}/default
#[instrument(skip(state))]
pub async fn set_default(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    AddressRepository::new(state.pool())
        .set_default(user.0, AddressId::new(id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
