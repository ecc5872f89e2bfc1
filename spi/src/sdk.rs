//! Boundary with the external settlement SDK.
//!
//! Transaction construction, signing, on-chain confirmation and QR rendering
//! belong to the SDK. This module only names the four operations the
//! checkout flow relies on:
//!
//! | Operation | Trait | Side |
//! |-----------|-------|------|
//! | issue a transfer request descriptor | [`MerchantSdk`] | merchant |
//! | build an unsigned transfer | [`MerchantSdk`] | merchant |
//! | confirm a payment by reference | [`PaymentConfirmer`] | payer |
//! | render a payment QR code | [`QrRenderer`] | payer |
//!
//! SDK failures are carried as opaque [`SdkError`] / [`PollError`] values;
//! nothing in this crate interprets them.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::address::Address;
use crate::intent::TransferRequest;

/// A boxed, sendable future, as returned by the dyn-compatible SDK traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Boxed error type used for opaque SDK failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The payer-facing descriptor returned on `GET` of a transaction request.
///
/// Wallets display the label and icon before asking the merchant for a
/// transaction. Any further fields the SDK includes are passed through
/// untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequestDescriptor {
    /// Merchant label shown by the wallet.
    pub label: String,
    /// Icon URL shown by the wallet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    /// SDK-specific fields.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An unsigned transaction artifact produced by the SDK for the payer to sign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnsignedTransaction {
    /// Base64-encoded serialized transaction.
    pub transaction: String,
    /// Optional message for the wallet to display.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Opaque failure reported by the settlement SDK.
#[derive(Debug, thiserror::Error)]
#[error("settlement SDK failure: {0}")]
pub struct SdkError(#[source] pub BoxError);

impl SdkError {
    /// Wraps any error or message.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }
}

/// Transport or SDK failure while checking whether a reference was paid.
#[derive(Debug, thiserror::Error)]
#[error("payment confirmation check failed: {0}")]
pub struct PollError(#[source] pub BoxError);

impl PollError {
    /// Wraps any error or message.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self(err.into())
    }
}

/// Merchant-side SDK operations.
///
/// Implementations carry the merchant identity and network configuration
/// they were constructed with.
pub trait MerchantSdk: Send + Sync {
    /// Returns the descriptor wallets fetch before requesting a transaction.
    fn transfer_request_descriptor(&self) -> BoxFuture<'_, Result<TransferRequestDescriptor, SdkError>>;

    /// Builds the unsigned transaction that settles `request`.
    fn build_transfer(
        &self,
        request: TransferRequest,
    ) -> BoxFuture<'_, Result<UnsignedTransaction, SdkError>>;
}

/// The single source of truth for "has this reference been paid".
///
/// The check is read-only: polling the same reference any number of times
/// never confirms or charges anything twice.
pub trait PaymentConfirmer: Send + Sync {
    /// Returns `true` once a transfer carrying `reference` has been confirmed.
    fn confirm_payment(&self, reference: Address) -> BoxFuture<'_, Result<bool, PollError>>;
}

/// Client-side rendering of a payment deep link. Implementations must not
/// touch the network.
pub trait QrRenderer {
    /// The embeddable widget produced.
    type Widget;

    /// Renders `deep_link` as a square code `size_px` pixels wide.
    fn render_payment_qr_code(&self, deep_link: &str, size_px: u32) -> Self::Widget;
}

impl<T: MerchantSdk + ?Sized> MerchantSdk for Arc<T> {
    fn transfer_request_descriptor(&self) -> BoxFuture<'_, Result<TransferRequestDescriptor, SdkError>> {
        (**self).transfer_request_descriptor()
    }

    fn build_transfer(
        &self,
        request: TransferRequest,
    ) -> BoxFuture<'_, Result<UnsignedTransaction, SdkError>> {
        (**self).build_transfer(request)
    }
}

impl<T: PaymentConfirmer + ?Sized> PaymentConfirmer for Arc<T> {
    fn confirm_payment(&self, reference: Address) -> BoxFuture<'_, Result<bool, PollError>> {
        (**self).confirm_payment(reference)
    }
}
