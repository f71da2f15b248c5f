//! Shipping address domain types.
//!
//! Addresses are Mexican postal addresses: street + exterior/interior number,
//! colonia (neighborhood), and a state drawn from the 32 federal entities.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use colibri_core::{AddressId, UserId};

/// A user shipping address (domain type).
///
/// Invariant: at most one address per user has `is_default = true`. The
/// repository enforces this in a single transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    /// Unique address ID.
    pub id: AddressId,
    /// Owning user.
    pub user_id: UserId,
    /// Recipient full name.
    pub recipient_name: String,
    /// 10-digit Mexican phone number, optionally prefixed with +52/52.
    pub phone: String,
    /// Contact email, if provided.
    pub email: Option<String>,
    /// Street name.
    pub street: String,
    /// Exterior (building) number.
    pub exterior_number: String,
    /// Interior (apartment/suite) number, if any.
    pub interior_number: Option<String>,
    /// Colonia / neighborhood.
    pub neighborhood: String,
    /// City or municipality.
    pub city: String,
    /// Federal entity.
    pub state: MxState,
    /// 5-digit postal code.
    pub postal_code: String,
    /// ISO country code. Always "MX" today.
    pub country: String,
    /// Whether this is the user's pre-selected address in checkout.
    pub is_default: bool,
    /// User-facing label.
    pub label: AddressLabel,
    /// When the address was created.
    pub created_at: DateTime<Utc>,
    /// When the address was last updated.
    pub updated_at: DateTime<Utc>,
}

/// User-facing address label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AddressLabel {
    #[default]
    Home,
    Work,
    Other,
}

impl AddressLabel {
    /// Storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Home => "HOME",
            Self::Work => "WORK",
            Self::Other => "OTHER",
        }
    }
}

impl std::str::FromStr for AddressLabel {
    type Err = colibri_core::UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HOME" => Ok(Self::Home),
            "WORK" => Ok(Self::Work),
            "OTHER" => Ok(Self::Other),
            other => Err(colibri_core::UnknownStatus(other.to_owned())),
        }
    }
}

/// The 32 Mexican federal entities.
///
/// Serialized (and persisted) by canonical display name, accents included.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MxState {
    Aguascalientes,
    #[serde(rename = "Baja California")]
    BajaCalifornia,
    #[serde(rename = "Baja California Sur")]
    BajaCaliforniaSur,
    Campeche,
    Chiapas,
    Chihuahua,
    #[serde(rename = "Ciudad de México")]
    CiudadDeMexico,
    Coahuila,
    Colima,
    Durango,
    Guanajuato,
    Guerrero,
    Hidalgo,
    Jalisco,
    #[serde(rename = "Estado de México")]
    EstadoDeMexico,
    #[serde(rename = "Michoacán")]
    Michoacan,
    Morelos,
    Nayarit,
    #[serde(rename = "Nuevo León")]
    NuevoLeon,
    Oaxaca,
    Puebla,
    #[serde(rename = "Querétaro")]
    Queretaro,
    #[serde(rename = "Quintana Roo")]
    QuintanaRoo,
    #[serde(rename = "San Luis Potosí")]
    SanLuisPotosi,
    Sinaloa,
    Sonora,
    Tabasco,
    Tamaulipas,
    Tlaxcala,
    Veracruz,
    #[serde(rename = "Yucatán")]
    Yucatan,
    Zacatecas,
}

impl MxState {
    /// All 32 federal entities.
    pub const ALL: [Self; 32] = [
        Self::Aguascalientes,
        Self::BajaCalifornia,
        Self::BajaCaliforniaSur,
        Self::Campeche,
        Self::Chiapas,
        Self::Chihuahua,
        Self::CiudadDeMexico,
        Self::Coahuila,
        Self::Colima,
        Self::Durango,
        Self::Guanajuato,
        Self::Guerrero,
        Self::Hidalgo,
        Self::Jalisco,
        Self::EstadoDeMexico,
        Self::Michoacan,
        Self::Morelos,
        Self::Nayarit,
        Self::NuevoLeon,
        Self::Oaxaca,
        Self::Puebla,
        Self::Queretaro,
        Self::QuintanaRoo,
        Self::SanLuisPotosi,
        Self::Sinaloa,
        Self::Sonora,
        Self::Tabasco,
        Self::Tamaulipas,
        Self::Tlaxcala,
        Self::Veracruz,
        Self::Yucatan,
        Self::Zacatecas,
    ];

    /// Canonical display name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Aguascalientes => "Aguascalientes",
            Self::BajaCalifornia => "Baja California",
            Self::BajaCaliforniaSur => "Baja California Sur",
            Self::Campeche => "Campeche",
            Self::Chiapas => "Chiapas",
            Self::Chihuahua => "Chihuahua",
            Self::CiudadDeMexico => "Ciudad de México",
            Self::Coahuila => "Coahuila",
            Self::Colima => "Colima",
            Self::Durango => "Durango",
            Self::Guanajuato => "Guanajuato",
            Self::Guerrero => "Guerrero",
            Self::Hidalgo => "Hidalgo",
            Self::Jalisco => "Jalisco",
            Self::EstadoDeMexico => "Estado de México",
            Self::Michoacan => "Michoacán",
            Self::Morelos => "Morelos",
            Self::Nayarit => "Nayarit",
            Self::NuevoLeon => "Nuevo León",
            Self::Oaxaca => "Oaxaca",
            Self::Puebla => "Puebla",
            Self::Queretaro => "Querétaro",
            Self::QuintanaRoo => "Quintana Roo",
            Self::SanLuisPotosi => "San Luis Potosí",
            Self::Sinaloa => "Sinaloa",
            Self::Sonora => "Sonora",
            Self::Tabasco => "Tabasco",
            Self::Tamaulipas => "Tamaulipas",
            Self::Tlaxcala => "Tlaxcala",
            Self::Veracruz => "Veracruz",
            Self::Yucatan => "Yucatán",
            Self::Zacatecas => "Zacatecas",
        }
    }

    /// Parse a canonical state name.
    #[must_use]
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        Self::ALL.into_iter().find(|s| s.name() == trimmed)
    }
}

impl std::fmt::Display for MxState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_states_parse_by_name() {
        for state in MxState::ALL {
            assert_eq!(MxState::parse(state.name()), Some(state));
        }
        assert_eq!(MxState::ALL.len(), 32);
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert_eq!(MxState::parse("Texas"), None);
        assert_eq!(MxState::parse(""), None);
    }

    #[test]
    fn test_serde_uses_display_names() {
        let json = serde_json::to_string(&MxState::NuevoLeon).expect("serialize");
        assert_eq!(json, "\"Nuevo León\"");
        let back: MxState = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, MxState::NuevoLeon);
    }

    #[test]
    fn test_address_label_round_trip() {
        for label in [AddressLabel::Home, AddressLabel::Work, AddressLabel::Other] {
            assert_eq!(label.as_str().parse::<AddressLabel>().expect("parse"), label);
        }
    }
}
