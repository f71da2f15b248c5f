//! Checkout domain rules: stateless validation and calculation, no I/O.
//!
//! # Modules
//!
//! - [`rules`] - Address/session validation, step gates, totals, refunds,
//!   order numbers, session expiry
//! - [`shipping`] - Shipping zone table and option calculation
//! - [`card`] - Card expiry predicate and BIN-prefix brand detection
//! - [`error`] - The closed checkout error taxonomy
//!
//! Services in `crate::services` orchestrate these rules against the
//! repositories; nothing in this module touches the database or the network.

pub mod card;
pub mod error;
pub mod rules;
pub mod shipping;

pub use card::{detect_card_brand, is_card_expired};
pub use error::{CheckoutError, CheckoutErrorCode, FieldError, StepError};
pub use rules::{
    can_proceed_to_next_step, cancellation_refund, compute_summary, generate_order_number,
    return_refund, session_expiry, validate_address, validate_checkout_session,
    SessionValidation, IVA_RATE, SESSION_TTL_HOURS,
};
pub use shipping::{
    add_business_days, calculate_shipping_options, zone_for_state, FREE_SHIPPING_THRESHOLD_MXN,
};
