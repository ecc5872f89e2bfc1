//! Session token encoding and decoding.
//!
//! A session token is the literal path segment that addresses one payment
//! attempt:
//!
//! ```text
//! <reference>-<amount>-<discount>
//! 9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM-629.97-25
//! ```
//!
//! The base58 alphabet and plain decimal digits never contain `-`, so the
//! delimiter is unambiguous. Tokens are created once at checkout and only
//! ever re-parsed afterwards, by the payment page and by the merchant
//! endpoint independently.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};

use crate::address::Address;
use crate::amount::{Amount, FRACTION_DIGITS};
use crate::cart::CartSnapshot;
use crate::discount::{Discount, parse_percent};
use crate::error::DecodeError;

/// Separator between the three token fields.
pub const DELIMITER: char = '-';

/// An encoded session token.
///
/// Construct with [`encode`] or parse with [`SessionToken::from_str`], which
/// validates the token by decoding it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionToken(String);

/// The typed fields carried by a [`SessionToken`].
///
/// `discount_percent` is only checked to be an integer here; membership in
/// the offered set is a trust decision made by
/// [`resolve_server_side`](crate::intent::resolve_server_side).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DecodedSession {
    /// Reference key correlating the checkout with its on-chain settlement.
    pub reference: Address,
    /// Amount due, as written in the token.
    pub amount: Amount,
    /// Loyalty share in percent, as written in the token.
    pub discount_percent: u32,
}

impl DecodedSession {
    /// Returns the discount if it is one of the offered percentages.
    #[must_use]
    pub fn discount(&self) -> Option<Discount> {
        Discount::try_from(self.discount_percent).ok()
    }

    /// Re-encodes the fields into a token.
    #[must_use]
    pub fn encode(&self) -> SessionToken {
        join(&self.reference, self.amount, self.discount_percent)
    }
}

impl SessionToken {
    /// The token as it appears in a URL path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the token into its typed fields.
    ///
    /// # Errors
    ///
    /// See [`decode`].
    pub fn decode(&self) -> Result<DecodedSession, DecodeError> {
        decode(&self.0)
    }
}

/// Encodes a cart total, a discount selection and a reference key.
///
/// The total is formatted with two fraction digits using the crate's
/// half-to-even rule (see [`crate::amount`]). The same inputs always produce
/// the same token.
#[must_use]
pub fn encode(cart: &CartSnapshot, discount: Discount, reference: &Address) -> SessionToken {
    encode_amount(reference, cart.total(), discount)
}

/// Encodes an already computed amount.
#[must_use]
pub fn encode_amount(reference: &Address, amount: Amount, discount: Discount) -> SessionToken {
    join(reference, amount, discount.percent())
}

fn join(reference: &Address, amount: Amount, discount_percent: u32) -> SessionToken {
    SessionToken(format!(
        "{reference}{DELIMITER}{}{DELIMITER}{discount_percent}",
        amount.to_currency()
    ))
}

/// Decodes a session token.
///
/// # Errors
///
/// - [`DecodeError::MalformedToken`] if the token does not have exactly three parts
/// - [`DecodeError::InvalidReference`] if part one is not a public key
/// - [`DecodeError::InvalidAmount`] if part two is not a non-negative decimal
///   with exactly two fraction digits, the only form [`encode`] writes
/// - [`DecodeError::InvalidDiscount`] if part three is not an unsigned integer
pub fn decode(token: &str) -> Result<DecodedSession, DecodeError> {
    let parts: Vec<&str> = token.split(DELIMITER).collect();
    let [reference, amount, discount] = parts[..] else {
        return Err(DecodeError::MalformedToken { parts: parts.len() });
    };
    let reference = reference
        .parse::<Address>()
        .map_err(|_| DecodeError::InvalidReference(reference.to_owned()))?;
    let amount = amount
        .parse::<Amount>()
        .ok()
        .filter(|a| a.as_decimal().scale() == FRACTION_DIGITS)
        .ok_or_else(|| DecodeError::InvalidAmount(amount.to_owned()))?;
    let discount_percent =
        parse_percent(discount).ok_or_else(|| DecodeError::InvalidDiscount(discount.to_owned()))?;
    Ok(DecodedSession {
        reference,
        amount,
        discount_percent,
    })
}

impl FromStr for SessionToken {
    type Err = DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        decode(s)?;
        Ok(Self(s.to_owned()))
    }
}

impl fmt::Display for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for SessionToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Serialize for SessionToken {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SessionToken {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}
