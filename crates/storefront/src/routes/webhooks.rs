//! Stripe webhook handler.
//!
//! Stripe signs the raw request body; the handler verifies the
//! `Stripe-Signature` header before parsing anything, then routes the
//! event to order payment handling. Unrecognized event types are
//! acknowledged with 200 so Stripe does not retry them.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
};
use chrono::Utc;
use tracing::{info, instrument, warn};

use crate::db::RepositoryError;
use crate::error::{AppError, Result};
use crate::services::OrderService;
use crate::services::orders::OrderServiceError;
use crate::state::AppState;

/// POST /api/webhooks/stripe
#[instrument(skip(state, headers, body))]
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: String,
) -> Result<StatusCode> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("missing Stripe-Signature header".to_owned()))?;

    let event = state
        .stripe()
        .verify_webhook(signature, &body, Utc::now().timestamp())
        .map_err(|err| {
            warn!(error = %err, "rejected Stripe webhook");
            AppError::BadRequest("webhook signature verification failed".to_owned())
        })?;

    let Some(intent_id) = event.payment_intent_id.as_deref() else {
        info!(event_type = %event.event_type, "ignoring webhook without payment intent");
        return Ok(StatusCode::OK);
    };

    let service = OrderService::new(state.pool(), state.stripe());
    let outcome = match event.event_type.as_str() {
        "payment_intent.succeeded" => service.mark_paid(intent_id).await,
        "payment_intent.payment_failed" => service.mark_payment_failed(intent_id).await,
        "charge.refunded" => service.mark_refunded(intent_id).await,
        other => {
            info!(event_type = %other, "ignoring unhandled webhook event");
            Ok(())
        }
    };

    match outcome {
        Ok(()) => Ok(StatusCode::OK),
        // No order for this intent. Acknowledge anyway; retrying will not
        // make the order appear.
        Err(OrderServiceError::Repository(RepositoryError::NotFound)) => {
            warn!(intent_id, event_type = %event.event_type, "webhook for unknown payment intent");
            Ok(StatusCode::OK)
        }
        Err(err) => Err(err.into()),
    }
}
