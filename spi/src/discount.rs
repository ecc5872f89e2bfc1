//! Loyalty-discount selection.
//!
//! A discount is the share of the cart value the payer settles with loyalty
//! tokens instead of the primary currency. It is a routing hint for the
//! settlement algorithm; it never changes the total being paid.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// One of the five loyalty shares offered at checkout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum Discount {
    /// 0% - paid entirely in the primary currency.
    #[default]
    Zero,
    /// 25% loyalty share.
    Quarter,
    /// 50% loyalty share.
    Half,
    /// 75% loyalty share.
    ThreeQuarters,
    /// 100% loyalty share.
    Full,
}

/// A percentage outside the offered set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("unsupported discount percentage {0}; expected one of 0, 25, 50, 75, 100")]
pub struct UnsupportedDiscount(pub u32);

impl Discount {
    /// Every selectable discount, in ascending order.
    pub const ALL: [Self; 5] = [
        Self::Zero,
        Self::Quarter,
        Self::Half,
        Self::ThreeQuarters,
        Self::Full,
    ];

    /// The percentage as an integer in `0..=100`.
    #[must_use]
    pub const fn percent(self) -> u32 {
        match self {
            Self::Zero => 0,
            Self::Quarter => 25,
            Self::Half => 50,
            Self::ThreeQuarters => 75,
            Self::Full => 100,
        }
    }

    /// Returns `true` if any share is settled with loyalty tokens.
    #[must_use]
    pub const fn uses_loyalty(self) -> bool {
        !matches!(self, Self::Zero)
    }
}

impl TryFrom<u32> for Discount {
    type Error = UnsupportedDiscount;

    fn try_from(percent: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|d| d.percent() == percent)
            .ok_or(UnsupportedDiscount(percent))
    }
}

impl From<Discount> for u32 {
    fn from(discount: Discount) -> Self {
        discount.percent()
    }
}

/// Error parsing a discount from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscountParseError {
    /// Not a bare unsigned integer.
    #[error("discount is not an integer: {0:?}")]
    NotAnInteger(String),
    /// An integer outside the offered set.
    #[error(transparent)]
    Unsupported(#[from] UnsupportedDiscount),
}

impl FromStr for Discount {
    type Err = DiscountParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let percent = parse_percent(s).ok_or_else(|| DiscountParseError::NotAnInteger(s.to_owned()))?;
        Ok(Self::try_from(percent)?)
    }
}

/// Parses a bare run of ASCII digits; signs and whitespace are rejected.
pub(crate) fn parse_percent(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

impl fmt::Display for Discount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.percent())
    }
}

impl Serialize for Discount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.percent())
    }
}

impl<'de> Deserialize<'de> for Discount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let percent = u32::deserialize(deserializer)?;
        Self::try_from(percent).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_only_enumerated_values() {
        for d in Discount::ALL {
            assert_eq!(Discount::try_from(d.percent()).unwrap(), d);
        }
        for bad in [1, 10, 30, 99, 101, 250] {
            assert_eq!(Discount::try_from(bad), Err(UnsupportedDiscount(bad)));
        }
    }

    #[test]
    fn test_from_str_rejects_signs_and_unknown_values() {
        assert_eq!("75".parse::<Discount>().unwrap(), Discount::ThreeQuarters);
        assert!(matches!("+25".parse::<Discount>(), Err(DiscountParseError::NotAnInteger(_))));
        assert!(matches!("30".parse::<Discount>(), Err(DiscountParseError::Unsupported(_))));
    }

    #[test]
    fn test_serde_as_integer() {
        assert_eq!(serde_json::to_string(&Discount::Half).unwrap(), "50");
        assert_eq!(serde_json::from_str::<Discount>("100").unwrap(), Discount::Full);
        assert!(serde_json::from_str::<Discount>("30").is_err());
    }

    #[test]
    fn test_uses_loyalty() {
        assert!(!Discount::Zero.uses_loyalty());
        assert!(Discount::Quarter.uses_loyalty());
    }
}
