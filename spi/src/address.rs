//! Base58-encoded Solana public keys.
//!
//! [`Address`] is used both for the reference key that correlates a checkout
//! with its on-chain settlement and for the payer key a wallet submits to the
//! merchant endpoint.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use solana_keypair::Keypair;
use solana_pubkey::Pubkey;
use solana_signer::Signer;

/// A 32-byte Solana public key, displayed and serialized as base58.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address(Pubkey);

/// Error returned when a string is not a base58-encoded 32-byte key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a base58-encoded public key: {0:?}")]
pub struct AddressError(pub String);

impl Address {
    /// Wraps a raw public key.
    #[must_use]
    pub const fn new(pubkey: Pubkey) -> Self {
        Self(pubkey)
    }

    /// Returns the public key of a freshly generated keypair.
    ///
    /// Checkout uses this to mint a unique reference for every payment
    /// attempt; the secret half is discarded.
    #[must_use]
    pub fn generate() -> Self {
        let keypair = Keypair::new();
        Self(Pubkey::new_from_array(keypair.pubkey().to_bytes()))
    }

    /// Returns the underlying public key.
    #[must_use]
    pub const fn pubkey(&self) -> &Pubkey {
        &self.0
    }
}

impl From<Pubkey> for Address {
    fn from(pubkey: Pubkey) -> Self {
        Self(pubkey)
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Pubkey::from_str(s)
            .map(Self)
            .map_err(|_| AddressError(s.to_owned()))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";

    #[test]
    fn test_parse_and_display_roundtrip() {
        let address: Address = KEY.parse().unwrap();
        assert_eq!(address.to_string(), KEY);
    }

    #[test]
    fn test_rejects_non_base58() {
        // '0' and 'l' are outside the base58 alphabet
        assert!("0OlI0OlI0OlI0OlI0OlI0OlI0OlI0OlI".parse::<Address>().is_err());
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert!("9WzDXwBbmkg8".parse::<Address>().is_err());
        assert!("".parse::<Address>().is_err());
    }

    #[test]
    fn test_serde_as_string() {
        let address: Address = KEY.parse().unwrap();
        let json = serde_json::to_string(&address).unwrap();
        assert_eq!(json, format!("\"{KEY}\""));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, address);
    }

    #[test]
    fn test_generate_is_unique_and_base58() {
        let a = Address::generate();
        let b = Address::generate();
        assert_ne!(a, b);
        assert_eq!(a.to_string().parse::<Address>().unwrap(), a);
    }
}
