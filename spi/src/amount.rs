//! Non-negative currency amounts.
//!
//! Amounts are carried as [`rust_decimal::Decimal`] so that cart arithmetic
//! and token formatting never go through binary floating point.
//!
//! # Rounding
//!
//! Currency values are rounded half-to-even to [`FRACTION_DIGITS`] digits and
//! always rendered with exactly that many digits: `629.965` becomes
//! `"629.96"`, `629.975` becomes `"629.98"` and `5` becomes `"5.00"`. The
//! same rule is used by the token encoder and by every display of the amount.

use std::fmt;
use std::str::FromStr;

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

/// Number of fraction digits in a formatted currency amount.
pub const FRACTION_DIGITS: u32 = 2;

/// A non-negative decimal currency amount.
///
/// Equality compares values, so `5` and `5.00` are equal; [`Display`](fmt::Display)
/// preserves the scale the amount was parsed or constructed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Amount(Decimal);

/// Errors produced when constructing or parsing an [`Amount`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AmountError {
    /// The value is below zero.
    #[error("amount must not be negative: {0}")]
    Negative(Decimal),
    /// The string is not a plain `digits[.digits]` decimal.
    #[error("not a plain decimal amount: {0:?}")]
    Syntax(String),
}

impl Amount {
    /// Zero.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Creates an amount, rejecting negative values.
    ///
    /// # Errors
    ///
    /// Returns [`AmountError::Negative`] if `value` is below zero.
    pub fn new(value: Decimal) -> Result<Self, AmountError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(AmountError::Negative(value));
        }
        Ok(Self(value))
    }

    /// An amount of whole cents, so `from_cents(62_997)` is `629.97`.
    #[must_use]
    pub fn from_cents(cents: u32) -> Self {
        Self(Decimal::new(i64::from(cents), FRACTION_DIGITS))
    }

    /// Returns the underlying decimal.
    #[must_use]
    pub const fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Returns `true` if the amount is strictly greater than zero.
    #[must_use]
    pub fn is_positive(&self) -> bool {
        self.0 > Decimal::ZERO
    }

    /// Rounds half-to-even to two fraction digits and fixes the scale at two,
    /// so the amount displays as e.g. `"629.97"`.
    #[must_use]
    pub fn to_currency(self) -> Self {
        let mut value = self
            .0
            .round_dp_with_strategy(FRACTION_DIGITS, RoundingStrategy::MidpointNearestEven);
        value.rescale(FRACTION_DIGITS);
        Self(value)
    }

    /// Adds two amounts, saturating at the largest representable value.
    #[must_use]
    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    /// Multiplies by a quantity, saturating at the largest representable value.
    #[must_use]
    pub fn saturating_mul(self, quantity: u32) -> Self {
        Self(self.0.saturating_mul(Decimal::from(quantity)))
    }
}

fn is_plain_decimal(s: &str) -> bool {
    let (int, frac) = match s.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (s, None),
    };
    !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.is_none_or(|f| !f.is_empty() && f.bytes().all(|b| b.is_ascii_digit()))
}

impl FromStr for Amount {
    type Err = AmountError;

    /// Parses `digits[.digits]`. Signs, exponents, separators and whitespace
    /// are rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if !is_plain_decimal(s) {
            return Err(AmountError::Syntax(s.to_owned()));
        }
        let value = Decimal::from_str(s).map_err(|_| AmountError::Syntax(s.to_owned()))?;
        Self::new(value)
    }
}

impl TryFrom<Decimal> for Amount {
    type Error = AmountError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Amount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Amount {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}
