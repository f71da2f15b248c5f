//! Shipping zone table and option calculation.
//!
//! Zones are a static mapping from federal entity to base cost and lead time.
//! The `Otra` bucket catches every state not named by the four main zones, so
//! the calculation always yields at least standard and express options.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, Timelike, Utc, Weekday};
use rust_decimal::Decimal;

use colibri_core::Money;

use crate::models::address::MxState;
use crate::models::shipping::{ShippingOption, ShippingTier, ShippingZone, ShippingZoneName};

/// Cart subtotal at or above which standard shipping is free, in MXN.
pub const FREE_SHIPPING_THRESHOLD_MXN: i64 = 500;

/// Flat same-day courier cost in centavos.
const SAME_DAY_COST_CENTAVOS: i64 = 15_000;

/// Same-day orders must be placed before this local hour on a weekday.
const SAME_DAY_CUTOFF_HOUR: u32 = 12;

/// Mexico City wall-clock offset (UTC-6, no DST since 2022).
const MEXICO_CITY_UTC_OFFSET_SECS: i32 = -6 * 3600;

const METRO: ShippingZone = ShippingZone {
    name: ShippingZoneName::Metro,
    standard_cost_centavos: 4_900,
    express_cost_centavos: 9_900,
    standard_days: 2,
    express_days: 1,
    same_day_eligible: true,
};

const CENTRO: ShippingZone = ShippingZone {
    name: ShippingZoneName::Centro,
    standard_cost_centavos: 5_900,
    express_cost_centavos: 11_900,
    standard_days: 3,
    express_days: 1,
    same_day_eligible: false,
};

const NORTE: ShippingZone = ShippingZone {
    name: ShippingZoneName::Norte,
    standard_cost_centavos: 9_900,
    express_cost_centavos: 16_900,
    standard_days: 5,
    express_days: 2,
    same_day_eligible: false,
};

const SUR: ShippingZone = ShippingZone {
    name: ShippingZoneName::Sur,
    standard_cost_centavos: 8_900,
    express_cost_centavos: 15_900,
    standard_days: 5,
    express_days: 2,
    same_day_eligible: false,
};

const OTRA: ShippingZone = ShippingZone {
    name: ShippingZoneName::Otra,
    standard_cost_centavos: 7_900,
    express_cost_centavos: 13_900,
    standard_days: 4,
    express_days: 2,
    same_day_eligible: false,
};

/// Resolve the shipping zone for a federal entity.
///
/// Total: every state maps to a zone, `Otra` being the default bucket.
#[must_use]
pub const fn zone_for_state(state: MxState) -> ShippingZone {
    use MxState::*;
    match state {
        CiudadDeMexico | EstadoDeMexico => METRO,
        Puebla | Morelos | Hidalgo | Tlaxcala | Queretaro => CENTRO,
        BajaCalifornia | BajaCaliforniaSur | Sonora | Chihuahua | Coahuila | NuevoLeon
        | Tamaulipas | Sinaloa | Durango | Zacatecas => NORTE,
        Chiapas | Oaxaca | Guerrero | Tabasco | Campeche | QuintanaRoo | Yucatan | Veracruz => SUR,
        Aguascalientes | Colima | Guanajuato | Jalisco | Michoacan | Nayarit | SanLuisPotosi => {
            OTRA
        }
    }
}

/// Calculate the shipping options for an address and cart subtotal.
///
/// Always returns standard and express. Same-day is added for the Metro zone
/// when `now` falls on a weekday before noon, Mexico City time. Standard is
/// free at or above [`FREE_SHIPPING_THRESHOLD_MXN`]; express and same-day are
/// never discounted. Delivery estimates add business days, skipping weekends.
///
/// `postal_code` is accepted for future zone refinement; zone granularity is
/// state-level today.
#[must_use]
pub fn calculate_shipping_options(
    state: MxState,
    _postal_code: &str,
    cart_subtotal: Money,
    now: DateTime<Utc>,
) -> Vec<ShippingOption> {
    let zone = zone_for_state(state);
    let local = to_mexico_city(now);
    let today = local.date_naive();

    let free_standard = cart_subtotal.amount >= Decimal::from(FREE_SHIPPING_THRESHOLD_MXN);
    let standard_cost = if free_standard {
        Money::zero()
    } else {
        Money::from_centavos(zone.standard_cost_centavos)
    };

    let mut options = vec![
        ShippingOption {
            tier: ShippingTier::Standard,
            zone: zone.name,
            cost: standard_cost,
            is_free: free_standard,
            estimated_delivery: add_business_days(today, zone.standard_days),
            description: format!("Envío estándar ({} días hábiles)", zone.standard_days),
        },
        ShippingOption {
            tier: ShippingTier::Express,
            zone: zone.name,
            cost: Money::from_centavos(zone.express_cost_centavos),
            is_free: false,
            estimated_delivery: add_business_days(today, zone.express_days),
            description: format!("Envío exprés ({} días hábiles)", zone.express_days),
        },
    ];

    if zone.same_day_eligible && within_same_day_window(&local) {
        options.push(ShippingOption {
            tier: ShippingTier::SameDay,
            zone: zone.name,
            cost: Money::from_centavos(SAME_DAY_COST_CENTAVOS),
            is_free: false,
            estimated_delivery: today,
            description: "Entrega el mismo día".to_owned(),
        });
    }

    options
}

/// Add `days` business days to `date`, skipping Saturdays and Sundays.
#[must_use]
pub fn add_business_days(date: NaiveDate, days: u32) -> NaiveDate {
    let mut current = date;
    let mut remaining = days;
    while remaining > 0 {
        current += Duration::days(1);
        if !is_weekend(current) {
            remaining -= 1;
        }
    }
    current
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

fn within_same_day_window(local: &DateTime<FixedOffset>) -> bool {
    !is_weekend(local.date_naive()) && local.hour() < SAME_DAY_CUTOFF_HOUR
}

fn to_mexico_city(now: DateTime<Utc>) -> DateTime<FixedOffset> {
    let offset =
        FixedOffset::east_opt(MEXICO_CITY_UTC_OFFSET_SECS).expect("valid fixed offset");
    now.with_timezone(&offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    /// 2025-06-11 is a Wednesday; 10:00 Mexico City = 16:00 UTC.
    fn wednesday_morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 11, 16, 0, 0).single().expect("valid")
    }

    /// 14:00 Mexico City = 20:00 UTC, same Wednesday.
    fn wednesday_afternoon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 11, 20, 0, 0).single().expect("valid")
    }

    /// 2025-06-14 is a Saturday; 10:00 Mexico City.
    fn saturday_morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 14, 16, 0, 0).single().expect("valid")
    }

    #[test]
    fn test_every_state_resolves_to_a_zone() {
        for state in MxState::ALL {
            // The match is total, so this is really asserting non-panic plus
            // a sanity check on the default bucket.
            let zone = zone_for_state(state);
            assert!(zone.standard_cost_centavos > 0, "{state} has no cost");
        }
        assert_eq!(zone_for_state(MxState::Jalisco).name, ShippingZoneName::Otra);
        assert_eq!(
            zone_for_state(MxState::CiudadDeMexico).name,
            ShippingZoneName::Metro
        );
    }

    #[test]
    fn test_standard_free_at_threshold() {
        let options = calculate_shipping_options(
            MxState::Jalisco,
            "44100",
            Money::mxn(dec!(500.00)),
            wednesday_morning(),
        );
        let standard = options
            .iter()
            .find(|o| o.tier == ShippingTier::Standard)
            .expect("standard present");
        assert!(standard.is_free);
        assert!(standard.cost.is_zero());
    }

    #[test]
    fn test_standard_charged_below_threshold() {
        let options = calculate_shipping_options(
            MxState::Jalisco,
            "44100",
            Money::mxn(dec!(499.99)),
            wednesday_morning(),
        );
        let standard = options
            .iter()
            .find(|o| o.tier == ShippingTier::Standard)
            .expect("standard present");
        assert!(!standard.is_free);
        assert_eq!(standard.cost, Money::from_centavos(OTRA.standard_cost_centavos));
    }

    #[test]
    fn test_express_never_discounted() {
        let options = calculate_shipping_options(
            MxState::NuevoLeon,
            "64000",
            Money::mxn(dec!(10000.00)),
            wednesday_morning(),
        );
        let express = options
            .iter()
            .find(|o| o.tier == ShippingTier::Express)
            .expect("express present");
        assert!(!express.is_free);
        assert_eq!(express.cost, Money::from_centavos(NORTE.express_cost_centavos));
    }

    #[test]
    fn test_same_day_in_metro_weekday_morning() {
        let options = calculate_shipping_options(
            MxState::CiudadDeMexico,
            "06700",
            Money::mxn(dec!(100.00)),
            wednesday_morning(),
        );
        assert!(options.iter().any(|o| o.tier == ShippingTier::SameDay));
    }

    #[test]
    fn test_no_same_day_after_cutoff() {
        let options = calculate_shipping_options(
            MxState::CiudadDeMexico,
            "06700",
            Money::mxn(dec!(100.00)),
            wednesday_afternoon(),
        );
        assert!(!options.iter().any(|o| o.tier == ShippingTier::SameDay));
    }

    #[test]
    fn test_no_same_day_on_weekend() {
        let options = calculate_shipping_options(
            MxState::CiudadDeMexico,
            "06700",
            Money::mxn(dec!(100.00)),
            saturday_morning(),
        );
        assert!(!options.iter().any(|o| o.tier == ShippingTier::SameDay));
    }

    #[test]
    fn test_no_same_day_outside_metro() {
        let options = calculate_shipping_options(
            MxState::Oaxaca,
            "68000",
            Money::mxn(dec!(100.00)),
            wednesday_morning(),
        );
        assert!(!options.iter().any(|o| o.tier == ShippingTier::SameDay));
    }

    #[test]
    fn test_always_at_least_two_options() {
        for state in MxState::ALL {
            let options = calculate_shipping_options(
                state,
                "00000",
                Money::zero(),
                saturday_morning(),
            );
            assert!(options.len() >= 2, "{state} yielded {}", options.len());
        }
    }

    #[test]
    fn test_add_business_days_skips_weekend() {
        // Friday 2025-06-13 + 1 business day = Monday 2025-06-16.
        let friday = NaiveDate::from_ymd_opt(2025, 6, 13).expect("valid");
        let monday = NaiveDate::from_ymd_opt(2025, 6, 16).expect("valid");
        assert_eq!(add_business_days(friday, 1), monday);

        // Wednesday + 5 business days = next Wednesday.
        let wednesday = NaiveDate::from_ymd_opt(2025, 6, 11).expect("valid");
        let next_wednesday = NaiveDate::from_ymd_opt(2025, 6, 18).expect("valid");
        assert_eq!(add_business_days(wednesday, 5), next_wednesday);
    }

    #[test]
    fn test_add_zero_business_days() {
        let saturday = NaiveDate::from_ymd_opt(2025, 6, 14).expect("valid");
        assert_eq!(add_business_days(saturday, 0), saturday);
    }

    #[test]
    fn test_estimated_delivery_uses_zone_lead_time() {
        let options = calculate_shipping_options(
            MxState::CiudadDeMexico,
            "06700",
            Money::mxn(dec!(100.00)),
            wednesday_morning(),
        );
        let standard = options
            .iter()
            .find(|o| o.tier == ShippingTier::Standard)
            .expect("standard present");
        // Wednesday + 2 business days = Friday.
        assert_eq!(
            standard.estimated_delivery,
            NaiveDate::from_ymd_opt(2025, 6, 13).expect("valid")
        );
    }
}
