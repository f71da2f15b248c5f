//! Wishlist route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use colibri_core::{ProductId, VariantId, WishlistItemId};

use crate::error::{AppError, Result};
use crate::models::wishlist::Wishlist;
use crate::services::WishlistService;
use crate::state::AppState;

use super::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct AddItemPayload {
    pub product_id: i32,
    #[serde(default)]
    pub variant_id: Option<i32>,
}

/// GET /api/wishlist
#[instrument(skip(state))]
pub async fn show(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Wishlist>> {
    let service = WishlistService::new(state.pool());
    Ok(Json(service.get(user.0).await?))
}

/// POST /api/wishlist/items
#[instrument(skip(state))]
pub async fn add_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Json(payload): Json<AddItemPayload>,
) -> Result<impl IntoResponse> {
    let service = WishlistService::new(state.pool());
    let item = service
        .add(
            user.0,
            ProductId::new(payload.product_id),
            payload.variant_id.map(VariantId::new),
        )
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

/// DELETE /api/wishlist/items/{id}
#[instrument(skip(state))]
pub async fn remove_item(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<StatusCode> {
    let service = WishlistService::new(state.pool());
    if service.remove(user.0, WishlistItemId::new(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("wishlist item {id}")))
    }
}

/// POST /api/wishlist/sync
#[instrument(skip(state))]
pub async fn sync(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Wishlist>> {
    let service = WishlistService::new(state.pool());
    Ok(Json(service.sync_prices(user.0).await?))
}
