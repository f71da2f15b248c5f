//! Shipping tiers, zones, and computed options.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use colibri_core::Money;

/// A shipping tier offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingTier {
    /// Ground shipping, free above the threshold.
    Standard,
    /// Expedited shipping, never discounted.
    Express,
    /// Same-day courier, metro zone only.
    SameDay,
    /// In-store pickup.
    Pickup,
}

impl ShippingTier {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Standard => "STANDARD",
            Self::Express => "EXPRESS",
            Self::SameDay => "SAME_DAY",
            Self::Pickup => "PICKUP",
        }
    }
}

impl std::str::FromStr for ShippingTier {
    type Err = colibri_core::UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STANDARD" => Ok(Self::Standard),
            "EXPRESS" => Ok(Self::Express),
            "SAME_DAY" => Ok(Self::SameDay),
            "PICKUP" => Ok(Self::Pickup),
            other => Err(colibri_core::UnknownStatus(other.to_owned())),
        }
    }
}

impl std::fmt::Display for ShippingTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A geographic shipping zone.
///
/// Zones are a static mapping from federal entity to base cost and lead time;
/// `Otra` is the catch-all bucket, so every address resolves to a zone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShippingZoneName {
    /// CDMX and Estado de México. Same-day eligible.
    Metro,
    /// States adjacent to the capital.
    Centro,
    /// Northern border states.
    Norte,
    /// Southern and peninsular states.
    Sur,
    /// Everything else.
    Otra,
}

impl std::fmt::Display for ShippingZoneName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Metro => "Metro",
            Self::Centro => "Centro",
            Self::Norte => "Norte",
            Self::Sur => "Sur",
            Self::Otra => "Otra",
        };
        f.write_str(name)
    }
}

/// Static zone data: costs and lead times per tier.
#[derive(Debug, Clone, Copy)]
pub struct ShippingZone {
    /// Zone identifier.
    pub name: ShippingZoneName,
    /// Standard tier cost in centavos (before the free-shipping rule).
    pub standard_cost_centavos: i64,
    /// Express tier cost in centavos.
    pub express_cost_centavos: i64,
    /// Standard lead time in business days.
    pub standard_days: u32,
    /// Express lead time in business days.
    pub express_days: u32,
    /// Whether same-day courier service exists in this zone.
    pub same_day_eligible: bool,
}

/// A shipping option computed for a specific address and cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingOption {
    /// Tier of service.
    pub tier: ShippingTier,
    /// Zone the option was computed for.
    pub zone: ShippingZoneName,
    /// Cost after discounts.
    pub cost: Money,
    /// Whether the cost was waived by the free-shipping rule.
    pub is_free: bool,
    /// Estimated delivery date.
    pub estimated_delivery: NaiveDate,
    /// Human-readable description.
    pub description: String,
}

/// The shipping choice stored on a checkout session and order snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingSelection {
    /// Selected tier.
    pub tier: ShippingTier,
    /// Zone it was priced in.
    pub zone: ShippingZoneName,
    /// Cost locked in at selection time.
    pub cost: Money,
    /// Estimated delivery date at selection time.
    pub estimated_delivery: NaiveDate,
}

impl From<&ShippingOption> for ShippingSelection {
    fn from(option: &ShippingOption) -> Self {
        Self {
            tier: option.tier,
            zone: option.zone,
            cost: option.cost,
            estimated_delivery: option.estimated_delivery,
        }
    }
}
