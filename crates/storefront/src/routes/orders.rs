//! Order history route handlers.

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use colibri_core::OrderId;

use crate::error::Result;
use crate::models::order::{
    CancellationReason, Order, OrderCancellation, OrderReturn, ReturnReason,
};
use crate::services::OrderService;
use crate::state::AppState;

use super::CurrentUser;

#[derive(Debug, Deserialize)]
pub struct CancellationPayload {
    pub reason: CancellationReason,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnPayload {
    pub reason: ReturnReason,
    #[serde(default)]
    pub comment: Option<String>,
}

/// GET /api/orders
#[instrument(skip(state))]
pub async fn list(State(state): State<AppState>, user: CurrentUser) -> Result<Json<Vec<Order>>> {
    let service = OrderService::new(state.pool(), state.stripe());
    Ok(Json(service.list(user.0).await?))
}

/// GET /api/orders/{id}
#[instrument(skip(state))]
pub async fn show(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<Order>> {
    let service = OrderService::new(state.pool(), state.stripe());
    Ok(Json(service.get(user.0, OrderId::new(id)).await?))
}

/// POST /api/orders/{id}/cancellation
#[instrument(skip(state, payload))]
pub async fn request_cancellation(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<CancellationPayload>,
) -> Result<impl IntoResponse> {
    let service = OrderService::new(state.pool(), state.stripe());
    let cancellation: OrderCancellation = service
        .request_cancellation(user.0, OrderId::new(id), payload.reason, payload.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(cancellation)))
}

/// POST /api/orders/{id}/return
#[instrument(skip(state, payload))]
pub async fn request_return(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<ReturnPayload>,
) -> Result<impl IntoResponse> {
    let service = OrderService::new(state.pool(), state.stripe());
    let request: OrderReturn = service
        .request_return(user.0, OrderId::new(id), payload.reason, payload.comment)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}
