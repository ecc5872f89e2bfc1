//! SPI merchant server and terminal checkout.
//!
//! # Modules
//!
//! - [`config`] - TOML configuration with environment variable expansion
//! - [`console`] - Demo cart and terminal rendering for the checkout binary
//! - [`shutdown`] - Ctrl-C / SIGTERM handling

pub mod config;
pub mod console;
pub mod shutdown;

pub use config::{ConfigError, SdkConfig, ServerConfig};
pub use shutdown::shutdown_signal;

/// Installs the `tracing` subscriber shared by both binaries: formatted
/// output to stderr, filtered by `RUST_LOG` (default: `info`).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}
