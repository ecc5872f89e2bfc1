//! Merchant endpoint errors.
//!
//! Every failure becomes a JSON body `{ "error": "<message>" }`. Client
//! mistakes map to `400`, a well-formed token that fails trust validation to
//! `422`, and anything the settlement SDK reports to `502`. The `502` body
//! carries a fixed message; the upstream detail only goes to the log.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use spi::error::{CheckoutError, DecodeError, IntentError};
use spi::sdk::SdkError;

/// Body message for any settlement SDK failure.
pub const UPSTREAM_UNAVAILABLE: &str = "settlement service unavailable";

/// Errors returned by the merchant transaction request endpoint.
#[derive(Debug, thiserror::Error)]
pub enum MerchantError {
    /// The path token could not be decoded.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The token decoded but is not an acceptable transfer intent.
    #[error(transparent)]
    Intent(#[from] IntentError),

    /// The request body is not a JSON object.
    #[error("invalid request body: {0}")]
    InvalidBody(#[from] serde_json::Error),

    /// The request body has no `account` field.
    #[error("missing payer account")]
    MissingPayer,

    /// The `account` field is not a base58 public key.
    #[error("invalid payer account: {0:?}")]
    InvalidPayer(String),

    /// The settlement SDK failed to produce a response.
    #[error(transparent)]
    Sdk(#[from] SdkError),
}

impl From<CheckoutError> for MerchantError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::Decode(e) => Self::Decode(e),
            CheckoutError::Intent(e) => Self::Intent(e),
            CheckoutError::Sdk(e) => Self::Sdk(e),
        }
    }
}

impl MerchantError {
    /// HTTP status this error is reported with.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Decode(_) | Self::InvalidBody(_) | Self::MissingPayer | Self::InvalidPayer(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Intent(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Sdk(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Message sent to the wallet.
    fn public_message(&self) -> String {
        match self {
            Self::Sdk(_) => UPSTREAM_UNAVAILABLE.to_owned(),
            _ => self.to_string(),
        }
    }
}

impl IntoResponse for MerchantError {
    fn into_response(self) -> Response {
        let status = self.status();
        record_error(&self, status);
        let body = serde_json::json!({ "error": self.public_message() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(feature = "telemetry")]
fn record_error(err: &MerchantError, status: StatusCode) {
    if status.is_server_error() {
        tracing::error!(error = %err, %status, "Merchant request failed");
    } else {
        tracing::debug!(error = %err, %status, "Rejected merchant request");
    }
}

#[cfg(not(feature = "telemetry"))]
const fn record_error(_err: &MerchantError, _status: StatusCode) {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_sdk_failures_are_masked() {
        let upstream = MerchantError::Sdk(SdkError::new("HTTP 500 from transfer: pool exhausted"));
        assert_eq!(upstream.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(upstream.public_message(), UPSTREAM_UNAVAILABLE);
        assert_eq!(MerchantError::MissingPayer.public_message(), "missing payer account");
    }
}
