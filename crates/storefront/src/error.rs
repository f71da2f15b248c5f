//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type that captures errors to Sentry before
//! responding to the client. All route handlers should return `Result<T, AppError>`.
//!
//! Checkout failures respond with a JSON body carrying the taxonomy code
//! (`EMPTY_CART`, `INSUFFICIENT_STOCK`, ...) and the step it belongs to, so
//! the frontend can send the user back to the right screen.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::checkout::CheckoutError;
use crate::db::RepositoryError;
use crate::services::checkout::CheckoutServiceError;
use crate::services::orders::OrderServiceError;
use crate::services::stripe::StripeError;
use crate::services::wishlist::WishlistServiceError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] RepositoryError),

    /// A checkout rule rejected the request.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Stripe API operation failed.
    #[error("Stripe error: {0}")]
    Stripe(#[from] StripeError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// User is not authenticated.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The order's state forbids the requested operation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<CheckoutServiceError> for AppError {
    fn from(err: CheckoutServiceError) -> Self {
        match err {
            CheckoutServiceError::Checkout(e) => Self::Checkout(e),
            CheckoutServiceError::Repository(e) => e.into(),
            CheckoutServiceError::Stripe(e) => Self::Stripe(e),
        }
    }
}

impl From<OrderServiceError> for AppError {
    fn from(err: OrderServiceError) -> Self {
        match err {
            OrderServiceError::NotAllowed(msg) => Self::Conflict(msg),
            OrderServiceError::CommentRequired => Self::BadRequest(err.to_string()),
            OrderServiceError::Repository(e) => e.into(),
            OrderServiceError::Stripe(e) => Self::Stripe(e),
        }
    }
}

impl From<WishlistServiceError> for AppError {
    fn from(err: WishlistServiceError) -> Self {
        match err {
            WishlistServiceError::ProductNotAvailable => Self::NotFound(err.to_string()),
            WishlistServiceError::Repository(e) => e.into(),
        }
    }
}

/// JSON error body for checkout failures.
#[derive(Debug, Serialize)]
struct CheckoutErrorBody {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    step: Option<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<serde_json::Value>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Capture server errors to Sentry
        if matches!(self, Self::Database(_) | Self::Internal(_) | Self::Stripe(_)) {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        }

        if let Self::Checkout(err) = &self {
            return checkout_response(err);
        }

        let status = match &self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => StatusCode::NOT_FOUND,
                RepositoryError::Conflict(_) => StatusCode::CONFLICT,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::Stripe(_) => StatusCode::BAD_GATEWAY,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Checkout(_) => unreachable!("handled above"),
        };

        // Don't expose internal error details to clients
        let message = match &self {
            Self::Database(err) => match err {
                RepositoryError::NotFound => "Not found".to_string(),
                RepositoryError::Conflict(msg) => msg.clone(),
                _ => "Internal server error".to_string(),
            },
            Self::Internal(_) => "Internal server error".to_string(),
            Self::Stripe(_) => "Payment gateway error".to_string(),
            _ => self.to_string(),
        };

        (status, message).into_response()
    }
}

fn checkout_response(err: &CheckoutError) -> Response {
    use crate::checkout::CheckoutErrorCode as Code;

    let status = match err.code() {
        Code::InsufficientStock | Code::PriceChanged => StatusCode::CONFLICT,
        Code::SessionExpired => StatusCode::GONE,
        Code::PaymentFailed => StatusCode::PAYMENT_REQUIRED,
        Code::UnknownError => StatusCode::INTERNAL_SERVER_ERROR,
        _ => StatusCode::UNPROCESSABLE_ENTITY,
    };

    let errors = match err {
        CheckoutError::InvalidAddress(fields) => fields
            .iter()
            .filter_map(|f| serde_json::to_value(f).ok())
            .collect(),
        CheckoutError::Validation(steps) => steps
            .iter()
            .filter_map(|s| serde_json::to_value(s).ok())
            .collect(),
        _ => Vec::new(),
    };

    let body = CheckoutErrorBody {
        code: err.code().as_str(),
        message: err.to_string(),
        step: err.step().map(crate::models::CheckoutStep::as_str),
        errors,
    };

    (status, Json(body)).into_response()
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Set the Sentry user context from a user ID.
///
/// Call this once the user is identified to associate errors with them.
pub fn set_sentry_user(user_id: &impl ToString) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            ..Default::default()
        }));
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("checkout", "Selected shipping option", Some(&[("tier", "EXPRESS")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn get_status(err: AppError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("order-123".to_string());
        assert_eq!(err.to_string(), "Not found: order-123");

        let err = AppError::BadRequest("invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: invalid input");
    }

    #[test]
    fn test_app_error_status_codes() {
        assert_eq!(
            get_status(AppError::NotFound("test".to_string())),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            get_status(AppError::Unauthorized("test".to_string())),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            get_status(AppError::BadRequest("test".to_string())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            get_status(AppError::Conflict("test".to_string())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Internal("test".to_string())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            get_status(AppError::Database(RepositoryError::NotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_checkout_error_statuses() {
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::SessionExpired)),
            StatusCode::GONE
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::PriceChanged)),
            StatusCode::CONFLICT
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::EmptyCart)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            get_status(AppError::Checkout(CheckoutError::InsufficientStock {
                name: "Rebozo".to_string(),
                requested: 3,
                available: 1,
            })),
            StatusCode::CONFLICT
        );
    }
}
