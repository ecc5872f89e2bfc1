#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! HTTP transport for SPI checkout.
//!
//! # Modules
//!
//! - [`client`] - [`SdkClient`](client::SdkClient), a remote settlement SDK
//!   over JSON HTTP (feature: `client`)
//! - [`server`] - The merchant transaction request endpoint (feature: `server`)
//! - [`error`] - Merchant endpoint errors and their HTTP mapping (feature: `server`)
//!
//! # Feature Flags
//!
//! - `client` - Settlement SDK client built on `reqwest`
//! - `server` - Merchant routes built on `axum`
//! - `telemetry` - Tracing instrumentation

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "server")]
pub mod error;
#[cfg(feature = "server")]
pub mod server;
