//! Order operations: resolving cancellations and advancing returns.
//!
//! These wrap the same service the storefront uses, so approvals issue
//! Stripe refunds and append order events exactly as the API would.

use std::str::FromStr;

use colibri_core::{CancellationId, ReturnId, ReturnStatus};
use colibri_storefront::config::StorefrontConfig;
use colibri_storefront::db::create_pool;
use colibri_storefront::services::{OrderService, StripeClient};
use tracing::info;

/// Approve or reject a pending cancellation request.
///
/// # Errors
///
/// Returns an error if configuration is incomplete, the request is not
/// pending, or the refund fails.
pub async fn resolve_cancellation(
    id: i32,
    approve: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let config = StorefrontConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    let stripe = StripeClient::new(&config.stripe)?;

    let service = OrderService::new(&pool, &stripe);
    service
        .resolve_cancellation(CancellationId::new(id), approve)
        .await?;

    info!(
        cancellation_id = id,
        approved = approve,
        "Cancellation request resolved"
    );
    Ok(())
}

/// Advance a return request to the given status.
///
/// Accepts statuses in kebab or snake case (`in-transit`, `IN_TRANSIT`).
///
/// # Errors
///
/// Returns an error if the status is unknown, the transition is not
/// allowed, or the refund fails.
pub async fn advance_return(id: i32, status: &str) -> Result<(), Box<dyn std::error::Error>> {
    let normalized = status.to_uppercase().replace('-', "_");
    let next = ReturnStatus::from_str(&normalized)
        .map_err(|_| format!("unknown return status: {status}"))?;

    let config = StorefrontConfig::from_env()?;
    let pool = create_pool(&config.database_url).await?;
    let stripe = StripeClient::new(&config.stripe)?;

    let service = OrderService::new(&pool, &stripe);
    service.advance_return(ReturnId::new(id), next).await?;

    info!(return_id = id, status = %normalized, "Return request advanced");
    Ok(())
}
