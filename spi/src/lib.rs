#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for SPI checkout sessions on Solana.
//!
//! A storefront turns a cart total and a loyalty-discount selection into a
//! compact session token. The token addresses one payment attempt: the
//! payment page decodes it to show the amount and run a bounded countdown,
//! while the merchant endpoint decodes the same token to ask the settlement
//! SDK for an unsigned transaction.
//!
//! # Modules
//!
//! - [`address`] - Base58 public keys used as references and payer keys
//! - [`amount`] - Non-negative currency amounts with two-digit formatting
//! - [`cart`] - Cart line items and totals
//! - [`discount`] - The closed set of loyalty-discount percentages
//! - [`token`] - Session token encoding and decoding
//! - [`intent`] - Client-side display and server-side transfer resolution
//! - [`sdk`] - Boundary traits for the external settlement SDK
//! - [`link`] - Transaction request URLs and Solana Pay deep links
//! - [`session`] - The payment session state machine and its async driver
//! - [`error`] - Error taxonomy shared across the crate
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod address;
pub mod amount;
pub mod cart;
pub mod discount;
pub mod error;
pub mod intent;
pub mod link;
pub mod sdk;
pub mod session;
pub mod token;

pub use address::Address;
pub use amount::Amount;
pub use cart::{CartSnapshot, LineItem};
pub use discount::Discount;
pub use error::{CheckoutError, DecodeError, IntentError};
pub use intent::{DisplayAmount, MerchantConfig, TransferRequest};
pub use session::{
    PaymentSession, PaymentStatus, SessionEvent, SessionHandle, SessionObserver, SessionSnapshot,
};
pub use token::{DecodedSession, SessionToken};
