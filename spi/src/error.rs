//! Error taxonomy for checkout sessions.
//!
//! Decoding a session token, validating it as a trusted transfer intent and
//! talking to the settlement SDK each fail in their own way;
//! [`CheckoutError`] joins them for the merchant-side pipeline.

use crate::amount::Amount;
use crate::sdk::SdkError;

/// Reasons a session token fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The token does not split into exactly three `-`-delimited parts.
    #[error("malformed session token: expected 3 parts, found {parts}")]
    MalformedToken {
        /// Number of parts found.
        parts: usize,
    },
    /// The first part is not a base58-encoded public key.
    #[error("invalid reference key: {0:?}")]
    InvalidReference(String),
    /// The second part is not a non-negative decimal.
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),
    /// The third part is not an unsigned integer.
    #[error("invalid discount: {0:?}")]
    InvalidDiscount(String),
}

/// Why a decoded session was refused as a transfer intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum InvalidIntentReason {
    /// The amount must be strictly positive.
    #[error("amount must be greater than zero, got {0}")]
    NonPositiveAmount(Amount),
    /// The discount is not one of the offered percentages.
    #[error("discount {0}% is not offered")]
    UnsupportedDiscount(u32),
}

/// Server-side trust validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IntentError {
    /// The decoded session cannot become a transfer request.
    #[error("invalid transfer intent: {0}")]
    InvalidIntent(#[from] InvalidIntentReason),
}

/// Any failure on the path from an inbound token to an unsigned transaction.
#[derive(Debug, thiserror::Error)]
pub enum CheckoutError {
    /// The session token could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),
    /// The decoded session failed trust validation.
    #[error(transparent)]
    Intent(#[from] IntentError),
    /// The settlement SDK reported a failure.
    #[error(transparent)]
    Sdk(#[from] SdkError),
}
