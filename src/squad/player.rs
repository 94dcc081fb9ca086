// Player reference data: roles, fixed-point credits, and the player record.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Playing roles, declared in the fixed display order used throughout the
/// crate (goalkeepers first, forwards last). The derived `Ord` follows
/// declaration order, so sorting by role gives display order directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "GK")]
    Goalkeeper,
    #[serde(rename = "DEF")]
    Defender,
    #[serde(rename = "MID")]
    Midfielder,
    #[serde(rename = "FWD")]
    Forward,
}

impl Role {
    /// All roles in display order.
    pub const ALL: [Role; 4] = [
        Role::Goalkeeper,
        Role::Defender,
        Role::Midfielder,
        Role::Forward,
    ];

    /// Parse a short role code ("GK", "DEF", "MID", "FWD"), case-insensitive
    /// and tolerant of surrounding whitespace.
    pub fn from_code(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "GK" => Some(Role::Goalkeeper),
            "DEF" => Some(Role::Defender),
            "MID" => Some(Role::Midfielder),
            "FWD" => Some(Role::Forward),
            _ => None,
        }
    }

    /// Short code used in data files and persisted rosters.
    pub fn code(&self) -> &'static str {
        match self {
            Role::Goalkeeper => "GK",
            Role::Defender => "DEF",
            Role::Midfielder => "MID",
            Role::Forward => "FWD",
        }
    }

    /// Plural heading for grouped presentation.
    pub fn group_label(&self) -> &'static str {
        match self {
            Role::Goalkeeper => "Goalkeepers",
            Role::Defender => "Defenders",
            Role::Midfielder => "Midfielders",
            Role::Forward => "Forwards",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

// ---------------------------------------------------------------------------
// Credits (fixed-point budget units)
// ---------------------------------------------------------------------------

/// A credit amount held as integer tenths, so budget arithmetic is exact.
///
/// External representations (data files, persisted rosters, display) use
/// decimals with one fractional digit; conversion happens only at those
/// boundaries. 8.5 credits is `Credits::from_tenths(85)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Credits(u32);

/// A decimal value that cannot be represented as a credit amount.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("invalid credit amount {value}: {reason}")]
pub struct CreditError {
    pub value: f64,
    pub reason: &'static str,
}

impl Credits {
    pub const ZERO: Credits = Credits(0);

    /// Construct from integer tenths (85 is 8.5 credits).
    pub const fn from_tenths(tenths: u32) -> Self {
        Credits(tenths)
    }

    pub const fn tenths(&self) -> u32 {
        self.0
    }

    /// Convert a decimal amount, rounding to the nearest tenth. Rejects
    /// negative and non-finite values.
    pub fn try_from_decimal(value: f64) -> Result<Self, CreditError> {
        if !value.is_finite() {
            return Err(CreditError {
                value,
                reason: "not a finite number",
            });
        }
        if value < 0.0 {
            return Err(CreditError {
                value,
                reason: "negative",
            });
        }
        let tenths = (value * 10.0).round();
        if tenths > u32::MAX as f64 {
            return Err(CreditError {
                value,
                reason: "too large",
            });
        }
        Ok(Credits(tenths as u32))
    }

    /// Decimal view for formatting and serialization.
    pub fn as_decimal(&self) -> f64 {
        f64::from(self.0) / 10.0
    }

    pub fn saturating_add(self, other: Credits) -> Credits {
        Credits(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Credits) -> Credits {
        Credits(self.0.saturating_sub(other.0))
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for Credits {
    /// Always one fractional digit ("91.0", "8.5"), matching how credit
    /// balances are shown to users.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

impl Serialize for Credits {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_decimal())
    }
}

impl<'de> Deserialize<'de> for Credits {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Credits::try_from_decimal(value).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// Immutable player reference data drawn from the match catalog. `credit` is
/// the cost of selecting the player. Never mutated by the selection core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: u32,
    pub name: String,
    pub team: String,
    pub role: Role,
    pub credit: Credits,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
