//! Pure checkout rules: validation, totals, refunds, order numbers.
//!
//! Nothing here does I/O. Services feed these functions the current state and
//! persist whatever they decide.

use chrono::{DateTime, Datelike, Duration, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use colibri_core::{Email, Money};

use crate::models::address::Address;
use crate::models::checkout::{CheckoutSession, CheckoutStep, OrderSummary};
use crate::models::order::ReturnReason;

use super::error::{CheckoutErrorCode, FieldError, StepError};

/// Checkout sessions expire this many hours after creation.
pub const SESSION_TTL_HOURS: i64 = 2;

/// IVA rate applied to the discounted subtotal.
pub const IVA_RATE: Decimal = Decimal::from_parts(16, 0, 0, false, 2); // 0.16

/// Snapshot of the four session checks plus the aggregated verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionValidation {
    /// Cart had at least one line when the session started.
    pub has_items: bool,
    /// An address is selected.
    pub has_address: bool,
    /// A shipping option is selected.
    pub has_shipping: bool,
    /// A payment method is selected.
    pub has_payment: bool,
    /// All four checks passed.
    pub can_place_order: bool,
    /// Failures, tagged by the step they belong to.
    pub errors: Vec<StepError>,
}

/// Validate an address field by field.
///
/// Returns an empty list when the address is valid; never fails. The state
/// field needs no check here because [`crate::models::MxState`] is already a
/// closed enumeration.
#[must_use]
pub fn validate_address(address: &Address) -> Vec<FieldError> {
    let mut errors = Vec::new();

    if address.recipient_name.trim().chars().count() < 3 {
        errors.push(FieldError::new(
            "recipient_name",
            "recipient name must be at least 3 characters",
        ));
    }

    if !is_valid_mx_phone(&address.phone) {
        errors.push(FieldError::new(
            "phone",
            "phone must be 10 digits, optionally prefixed with +52",
        ));
    }

    if let Some(email) = &address.email
        && Email::parse(email).is_err()
    {
        errors.push(FieldError::new("email", "email address is not valid"));
    }

    if address.street.trim().is_empty() {
        errors.push(FieldError::new("street", "street is required"));
    }

    if address.exterior_number.trim().is_empty() {
        errors.push(FieldError::new(
            "exterior_number",
            "exterior number is required",
        ));
    }

    if address.neighborhood.trim().is_empty() {
        errors.push(FieldError::new("neighborhood", "neighborhood is required"));
    }

    if address.city.trim().is_empty() {
        errors.push(FieldError::new("city", "city is required"));
    }

    if !is_valid_postal_code(&address.postal_code) {
        errors.push(FieldError::new(
            "postal_code",
            "postal code must be exactly 5 digits",
        ));
    }

    errors
}

/// A 10-digit Mexican phone number, optionally prefixed with +52 or 52.
/// Spaces, dashes, and parentheses are ignored.
#[must_use]
pub fn is_valid_mx_phone(phone: &str) -> bool {
    let digits: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '(' | ')'))
        .collect();

    let rest = digits
        .strip_prefix("+52")
        .or_else(|| digits.strip_prefix("52").filter(|r| r.len() == 10))
        .unwrap_or(&digits);

    rest.len() == 10 && rest.chars().all(|c| c.is_ascii_digit())
}

/// Exactly 5 ASCII digits.
#[must_use]
pub fn is_valid_postal_code(postal_code: &str) -> bool {
    postal_code.len() == 5 && postal_code.chars().all(|c| c.is_ascii_digit())
}

/// Aggregate the four session checks into a verdict plus step-tagged errors.
#[must_use]
pub fn validate_checkout_session(session: &CheckoutSession) -> SessionValidation {
    let has_items = session.item_count > 0;
    let has_address = session.address_id.is_some();
    let has_shipping = session.shipping.is_some();
    let has_payment = session.payment_method_id.is_some();

    let mut errors = Vec::new();
    if !has_items {
        errors.push(StepError {
            step: CheckoutStep::Review,
            code: CheckoutErrorCode::EmptyCart,
            message: "cart is empty".to_owned(),
        });
    }
    if !has_address {
        errors.push(StepError {
            step: CheckoutStep::Shipping,
            code: CheckoutErrorCode::InvalidAddress,
            message: "no address selected".to_owned(),
        });
    }
    if !has_shipping {
        errors.push(StepError {
            step: CheckoutStep::Shipping,
            code: CheckoutErrorCode::InvalidShipping,
            message: "no shipping option selected".to_owned(),
        });
    }
    if !has_payment {
        errors.push(StepError {
            step: CheckoutStep::Payment,
            code: CheckoutErrorCode::InvalidPayment,
            message: "no payment method selected".to_owned(),
        });
    }

    SessionValidation {
        has_items,
        has_address,
        has_shipping,
        has_payment,
        can_place_order: errors.is_empty(),
        errors,
    }
}

/// Step-specific gate for advancing the checkout flow.
///
/// SHIPPING requires address + shipping; PAYMENT requires a payment method;
/// REVIEW requires full session validity. Backward navigation is unguarded
/// and not handled here.
#[must_use]
pub fn can_proceed_to_next_step(step: CheckoutStep, session: &CheckoutSession) -> bool {
    match step {
        CheckoutStep::Shipping => session.address_id.is_some() && session.shipping.is_some(),
        CheckoutStep::Payment => session.payment_method_id.is_some(),
        CheckoutStep::Review => validate_checkout_session(session).can_place_order,
    }
}

/// Compute the money breakdown: IVA on the discounted subtotal, plus shipping.
#[must_use]
pub fn compute_summary(subtotal: Money, discount: Money, shipping: Money) -> OrderSummary {
    let taxable = (subtotal - discount).amount.max(Decimal::ZERO);
    let tax = Money::new((taxable * IVA_RATE).round_dp(2), subtotal.currency);
    let total = Money::new(taxable, subtotal.currency) + tax + shipping;

    OrderSummary {
        subtotal,
        discount,
        tax,
        shipping,
        total,
    }
}

/// Refund for an approved cancellation: always the full total, since
/// cancellation is only possible before shipment.
#[must_use]
pub const fn cancellation_refund(summary: &OrderSummary) -> Money {
    summary.total
}

/// Refund for a return: the full total when the store is at fault, otherwise
/// the total minus shipping.
#[must_use]
pub fn return_refund(summary: &OrderSummary, reason: ReturnReason) -> Money {
    if reason.is_store_fault() {
        summary.total
    } else {
        summary.total - summary.shipping
    }
}

/// Generate an order number: `ORD-<year>-<5 digits>`.
///
/// The random suffix is not globally unique; the orders table carries a
/// unique constraint and insertion retries on collision.
#[must_use]
pub fn generate_order_number(now: DateTime<Utc>, rng: &mut impl Rng) -> String {
    let suffix: u32 = rng.random_range(0..100_000);
    format!("ORD-{}-{suffix:05}", now.year())
}

/// When a session created at `now` expires.
#[must_use]
pub fn session_expiry(now: DateTime<Utc>) -> DateTime<Utc> {
    now + Duration::hours(SESSION_TTL_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    use colibri_core::{AddressId, CartId, CheckoutSessionId, PaymentMethodId, UserId};

    use crate::models::address::{AddressLabel, MxState};
    use crate::models::shipping::{ShippingSelection, ShippingTier, ShippingZoneName};

    fn valid_address() -> Address {
        Address {
            id: AddressId::new(1),
            user_id: UserId::new(1),
            recipient_name: "María García".to_owned(),
            phone: "55 1234 5678".to_owned(),
            email: Some("maria@example.com".to_owned()),
            street: "Av. Insurgentes Sur".to_owned(),
            exterior_number: "1234".to_owned(),
            interior_number: Some("4B".to_owned()),
            neighborhood: "Del Valle".to_owned(),
            city: "Ciudad de México".to_owned(),
            state: MxState::CiudadDeMexico,
            postal_code: "03100".to_owned(),
            country: "MX".to_owned(),
            is_default: true,
            label: AddressLabel::Home,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn empty_session() -> CheckoutSession {
        CheckoutSession {
            id: CheckoutSessionId::new(1),
            user_id: UserId::new(1),
            cart_id: CartId::new(1),
            item_count: 2,
            step: CheckoutStep::Shipping,
            address_id: None,
            shipping: None,
            payment_method_id: None,
            summary: OrderSummary::default(),
            created_at: Utc::now(),
            expires_at: session_expiry(Utc::now()),
            updated_at: Utc::now(),
        }
    }

    fn selection() -> ShippingSelection {
        ShippingSelection {
            tier: ShippingTier::Standard,
            zone: ShippingZoneName::Metro,
            cost: Money::mxn(dec!(49.00)),
            estimated_delivery: Utc::now().date_naive(),
        }
    }

    #[test]
    fn test_valid_address_has_no_errors() {
        assert!(validate_address(&valid_address()).is_empty());
    }

    #[test]
    fn test_short_name_rejected() {
        let mut address = valid_address();
        address.recipient_name = "Ma".to_owned();
        let errors = validate_address(&address);
        assert!(errors.iter().any(|e| e.field == "recipient_name"));
    }

    #[test]
    fn test_phone_variants() {
        assert!(is_valid_mx_phone("5512345678"));
        assert!(is_valid_mx_phone("55 1234 5678"));
        assert!(is_valid_mx_phone("+525512345678"));
        assert!(is_valid_mx_phone("525512345678"));
        assert!(is_valid_mx_phone("(55) 1234-5678"));

        assert!(!is_valid_mx_phone("123456789")); // 9 digits
        assert!(!is_valid_mx_phone("12345678901")); // 11, no prefix
        assert!(!is_valid_mx_phone("+1 555 123 4567"));
        assert!(!is_valid_mx_phone("55-letters-5678"));
    }

    #[test]
    fn test_postal_code_exactly_five_digits() {
        assert!(is_valid_postal_code("03100"));
        assert!(!is_valid_postal_code("3100"));
        assert!(!is_valid_postal_code("031000"));
        assert!(!is_valid_postal_code("0310a"));
    }

    #[test]
    fn test_bad_email_rejected() {
        let mut address = valid_address();
        address.email = Some("not-an-email".to_owned());
        let errors = validate_address(&address);
        assert!(errors.iter().any(|e| e.field == "email"));
    }

    #[test]
    fn test_missing_email_is_fine() {
        let mut address = valid_address();
        address.email = None;
        assert!(validate_address(&address).is_empty());
    }

    #[test]
    fn test_session_validation_reports_each_gap() {
        let session = empty_session();
        let validation = validate_checkout_session(&session);
        assert!(validation.has_items);
        assert!(!validation.has_address);
        assert!(!validation.can_place_order);
        assert_eq!(validation.errors.len(), 3);
        assert!(validation
            .errors
            .iter()
            .any(|e| e.step == CheckoutStep::Payment && e.code == CheckoutErrorCode::InvalidPayment));
    }

    #[test]
    fn test_complete_session_can_place_order() {
        let mut session = empty_session();
        session.address_id = Some(AddressId::new(1));
        session.shipping = Some(selection());
        session.payment_method_id = Some(PaymentMethodId::new(1));
        let validation = validate_checkout_session(&session);
        assert!(validation.can_place_order);
        assert!(validation.errors.is_empty());
    }

    #[test]
    fn test_shipping_gate_needs_address_and_shipping() {
        let mut session = empty_session();
        assert!(!can_proceed_to_next_step(CheckoutStep::Shipping, &session));

        session.address_id = Some(AddressId::new(1));
        assert!(!can_proceed_to_next_step(CheckoutStep::Shipping, &session));

        session.shipping = Some(selection());
        assert!(can_proceed_to_next_step(CheckoutStep::Shipping, &session));
    }

    #[test]
    fn test_payment_gate_needs_payment_method() {
        let mut session = empty_session();
        assert!(!can_proceed_to_next_step(CheckoutStep::Payment, &session));
        session.payment_method_id = Some(PaymentMethodId::new(1));
        assert!(can_proceed_to_next_step(CheckoutStep::Payment, &session));
    }

    #[test]
    fn test_review_gate_needs_full_validity() {
        let mut session = empty_session();
        session.address_id = Some(AddressId::new(1));
        session.shipping = Some(selection());
        assert!(!can_proceed_to_next_step(CheckoutStep::Review, &session));
        session.payment_method_id = Some(PaymentMethodId::new(1));
        assert!(can_proceed_to_next_step(CheckoutStep::Review, &session));
    }

    #[test]
    fn test_summary_applies_iva_after_discount() {
        let summary = compute_summary(
            Money::mxn(dec!(1000.00)),
            Money::mxn(dec!(100.00)),
            Money::mxn(dec!(49.00)),
        );
        assert_eq!(summary.tax.amount, dec!(144.00)); // 16% of 900
        assert_eq!(summary.total.amount, dec!(1093.00)); // 900 + 144 + 49
    }

    #[test]
    fn test_summary_discount_cannot_go_negative() {
        let summary = compute_summary(
            Money::mxn(dec!(100.00)),
            Money::mxn(dec!(150.00)),
            Money::zero(),
        );
        assert_eq!(summary.tax.amount, dec!(0.00));
        assert_eq!(summary.total.amount, dec!(0.00));
    }

    #[test]
    fn test_refund_rules() {
        let summary = compute_summary(
            Money::mxn(dec!(500.00)),
            Money::zero(),
            Money::mxn(dec!(99.00)),
        );
        assert_eq!(cancellation_refund(&summary), summary.total);
        assert_eq!(return_refund(&summary, ReturnReason::Defective), summary.total);
        assert_eq!(
            return_refund(&summary, ReturnReason::SizeOrFit),
            summary.total - summary.shipping
        );
    }

    #[test]
    fn test_order_number_format() {
        let now = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).single().expect("valid");
        let mut rng = rand::rng();
        for _ in 0..50 {
            let number = generate_order_number(now, &mut rng);
            let suffix = number.strip_prefix("ORD-2025-").expect("prefix");
            assert_eq!(suffix.len(), 5);
            assert!(suffix.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_session_expiry_is_two_hours() {
        let now = Utc::now();
        assert_eq!(session_expiry(now) - now, Duration::hours(2));
    }
}
