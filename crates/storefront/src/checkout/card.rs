//! Card expiry and brand detection.
//!
//! Brand detection is BIN-prefix matching only; it runs on user input before
//! tokenization and is never a substitute for gateway-side validation.

use chrono::{Datelike, NaiveDate};

use crate::models::payment::CardBrand;

/// Whether a card with the given expiry month/year is expired as of `today`.
///
/// A card is valid through the last day of its expiry month: any year before
/// the current year is expired, and within the current year any month before
/// the current month is expired.
#[must_use]
pub fn is_card_expired(exp_month: u8, exp_year: u16, today: NaiveDate) -> bool {
    let year = u16::try_from(today.year()).unwrap_or(u16::MAX);
    let month = u8::try_from(today.month()).unwrap_or(12);

    exp_year < year || (exp_year == year && exp_month < month)
}

/// Detect a card brand from the number's BIN prefix.
///
/// Visa starts with 4; Mastercard with 51-55; Amex with 34 or 37; Discover
/// with 6011 or 65. Everything else is `Unknown`. Separators and spaces are
/// ignored.
#[must_use]
pub fn detect_card_brand(number: &str) -> CardBrand {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();

    if digits.starts_with('4') {
        return CardBrand::Visa;
    }
    if let Some(prefix) = digits.get(0..2) {
        match prefix {
            "51" | "52" | "53" | "54" | "55" => return CardBrand::Mastercard,
            "34" | "37" => return CardBrand::Amex,
            "65" => return CardBrand::Discover,
            _ => {}
        }
    }
    if digits.starts_with("6011") {
        return CardBrand::Discover;
    }

    CardBrand::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    fn june_2025() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 15).expect("valid")
    }

    #[test]
    fn test_expired_previous_year() {
        assert!(is_card_expired(12, 2024, june_2025()));
    }

    #[test]
    fn test_expired_earlier_month_same_year() {
        assert!(is_card_expired(5, 2025, june_2025()));
    }

    #[test]
    fn test_valid_current_month() {
        assert!(!is_card_expired(6, 2025, june_2025()));
    }

    #[test]
    fn test_valid_future() {
        assert!(!is_card_expired(1, 2026, june_2025()));
        assert!(!is_card_expired(12, 2030, june_2025()));
    }

    #[test]
    fn test_detect_visa() {
        assert_eq!(detect_card_brand("4242424242424242"), CardBrand::Visa);
        assert_eq!(detect_card_brand("4000 0566 5566 5556"), CardBrand::Visa);
    }

    #[test]
    fn test_detect_mastercard() {
        assert_eq!(detect_card_brand("5105105105105100"), CardBrand::Mastercard);
        assert_eq!(detect_card_brand("5555555555554444"), CardBrand::Mastercard);
    }

    #[test]
    fn test_detect_amex() {
        assert_eq!(detect_card_brand("378282246310005"), CardBrand::Amex);
        assert_eq!(detect_card_brand("341111111111111"), CardBrand::Amex);
    }

    #[test]
    fn test_detect_discover() {
        assert_eq!(detect_card_brand("6011111111111117"), CardBrand::Discover);
        assert_eq!(detect_card_brand("6500000000000002"), CardBrand::Discover);
    }

    #[test]
    fn test_unknown_brand() {
        assert_eq!(detect_card_brand("9999999999999999"), CardBrand::Unknown);
        assert_eq!(detect_card_brand(""), CardBrand::Unknown);
        assert_eq!(detect_card_brand("56"), CardBrand::Unknown);
    }
}
