//! Named requirement presets attached to protected operations.

use crate::{AccessError, AccessRequirement};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The closed set of access presets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Preset {
    /// Open to every user.
    Public,
    EmailOnly,
    Basic,
    Full,
    /// Full verification plus a liveness pass from the last 24 hours.
    Booking,
    /// Full verification plus at least one liveness pass, any age.
    Payment,
}

impl Preset {
    pub const ALL: [Preset; 6] = [
        Self::Public,
        Self::EmailOnly,
        Self::Basic,
        Self::Full,
        Self::Booking,
        Self::Payment,
    ];

    pub fn requirement(&self) -> &'static AccessRequirement {
        match self {
            Self::Public => &AccessRequirement::NONE,
            Self::EmailOnly => &AccessRequirement::EMAIL_ONLY,
            Self::Basic => &AccessRequirement::BASIC,
            Self::Full => &AccessRequirement::FULL,
            Self::Booking => &AccessRequirement::BOOKING,
            Self::Payment => &AccessRequirement::PAYMENT,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::EmailOnly => "EMAIL_ONLY",
            Self::Basic => "BASIC",
            Self::Full => "FULL",
            Self::Booking => "BOOKING",
            Self::Payment => "PAYMENT",
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = AccessError;

    /// Accepts the short names as well as the `*_VERIFICATION` aliases used
    /// by route metadata, case-insensitively, with `-` or `_` separators.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        let base = normalized
            .strip_suffix("_VERIFICATION")
            .unwrap_or(&normalized);
        match base {
            "PUBLIC" | "NONE" => Ok(Self::Public),
            "EMAIL_ONLY" | "EMAIL" => Ok(Self::EmailOnly),
            "BASIC" => Ok(Self::Basic),
            "FULL" => Ok(Self::Full),
            "BOOKING" => Ok(Self::Booking),
            "PAYMENT" => Ok(Self::Payment),
            _ => Err(AccessError::UnknownPreset(s.to_string())),
        }
    }
}
