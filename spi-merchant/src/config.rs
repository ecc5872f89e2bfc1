//! Merchant server configuration.
//!
//! Loads a TOML file whose string values may reference environment
//! variables as `$VAR` or `${VAR}`.
//!
//! # Example Configuration
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 3000
//! public_url = "https://shop.example"
//! support_email = "support@shop.example"
//!
//! [merchant]
//! label = "100xMerchant"
//! algorithm = "SPI_ALGO_2"
//! network = "https://api.devnet.solana.com"
//!
//! [sdk]
//! url = "http://127.0.0.1:4000/"
//! api_key = "$SPI_SDK_API_KEY"
//! timeout_secs = 15
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use spi::MerchantConfig;
use spi_http::client::{SdkClient, SdkClientError};
use url::Url;

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file exists but could not be read.
    #[error("failed to read {path}: {source}")]
    Read {
        /// Path that was read.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The file is not valid configuration TOML.
    #[error("failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level merchant server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    #[serde(default = "default_host")]
    pub host: IpAddr,

    /// Bind port (default: `3000`).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Public base URL wallets use to reach this server.
    #[serde(default = "default_public_url")]
    pub public_url: Url,

    /// Contact shown to payers whose session expired.
    #[serde(default = "default_support_email")]
    pub support_email: String,

    /// Merchant identity and settlement algorithm.
    #[serde(default)]
    pub merchant: MerchantConfig,

    /// Remote settlement SDK service.
    #[serde(default)]
    pub sdk: SdkConfig,
}

/// Where and how to reach the settlement SDK service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdkConfig {
    /// Base URL of the service.
    #[serde(default = "default_sdk_url")]
    pub url: Url,

    /// Bearer token for the service. Supports `$VAR` expansion; a value that
    /// is still an unresolved reference is treated as absent.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout. Without one, a hung service hangs the request.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

const fn default_port() -> u16 {
    3000
}

fn default_public_url() -> Url {
    Url::parse("http://localhost:3000/").expect("default public URL is valid")
}

fn default_support_email() -> String {
    "support@solanapay.example.com".to_owned()
}

fn default_sdk_url() -> Url {
    Url::parse("http://127.0.0.1:4000/").expect("default SDK URL is valid")
}

impl Default for SdkConfig {
    fn default() -> Self {
        Self {
            url: default_sdk_url(),
            api_key: None,
            timeout_secs: None,
        }
    }
}

impl SdkConfig {
    /// The API key, unless it is empty or an unresolved `$VAR` reference.
    #[must_use]
    pub fn resolved_api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty() && !key.starts_with('$'))
    }

    /// Builds a client for the service, acting for `merchant`.
    ///
    /// # Errors
    ///
    /// Returns [`SdkClientError`] if the URL or a header value is invalid.
    pub fn client(&self, merchant: &MerchantConfig) -> Result<SdkClient, SdkClientError> {
        let mut client = SdkClient::try_from(self.url.as_str())?.with_merchant(merchant)?;
        if let Some(key) = self.resolved_api_key() {
            client = client.with_bearer_auth(key)?;
        }
        if let Some(secs) = self.timeout_secs {
            client = client.with_timeout(Duration::from_secs(secs));
        }
        Ok(client)
    }
}

impl ServerConfig {
    /// Loads configuration from the path in `CONFIG`, falling back to
    /// `config.toml` in the current directory. A missing file yields the
    /// defaults. `HOST` and `PORT` override the file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("CONFIG").unwrap_or_else(|_| "config.toml".to_owned());
        Self::load_from(&path)
    }

    /// Loads configuration from a specific file path.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let content = if Path::new(path).exists() {
            std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                path: path.to_owned(),
                source,
            })?
        } else {
            String::new()
        };
        let mut config = Self::from_toml(&content)?;

        if let Some(host) = std::env::var("HOST").ok().and_then(|h| h.parse().ok()) {
            config.host = host;
        }
        if let Some(port) = std::env::var("PORT").ok().and_then(|p| p.parse().ok()) {
            config.port = port;
        }
        Ok(config)
    }

    /// Parses configuration text after expanding environment references.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the text is not valid configuration.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(&expand_env_vars(content))?)
    }
}

/// Replaces `$VAR` and `${VAR}` with the variable's value. References to
/// unset variables are kept verbatim.
fn expand_env_vars(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(dollar) = rest.find('$') {
        out.push_str(&rest[..dollar]);
        let after = &rest[dollar + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !c.is_ascii_alphanumeric() && c != '_')
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        let value = if name.is_empty() {
            None
        } else {
            std::env::var(name).ok()
        };
        match value {
            Some(value) => out.push_str(&value),
            None => out.push_str(&rest[dollar..=dollar + consumed]),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = ServerConfig::from_toml("").unwrap();
        assert_eq!(config.port, 3000);
        assert_eq!(config.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(config.merchant, MerchantConfig::default());
        assert_eq!(config.sdk.url.as_str(), "http://127.0.0.1:4000/");
        assert_eq!(config.sdk.timeout_secs, None);
    }

    #[test]
    fn test_full_file() {
        let config = ServerConfig::from_toml(
            r#"
            port = 8080
            public_url = "https://shop.example/pay"
            support_email = "help@shop.example"

            [merchant]
            label = "Corner Shop"
            algorithm = "SPI_ALGO_7"

            [sdk]
            url = "https://sdk.example/v1/"
            api_key = "k-123"
            timeout_secs = 15
            "#,
        )
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.public_url.as_str(), "https://shop.example/pay");
        assert_eq!(config.support_email, "help@shop.example");
        assert_eq!(config.merchant.label, "Corner Shop");
        assert_eq!(config.merchant.algorithm.as_str(), "SPI_ALGO_7");
        assert_eq!(
            config.merchant.network.as_str(),
            "https://api.devnet.solana.com/"
        );
        assert_eq!(config.sdk.resolved_api_key(), Some("k-123"));
        assert_eq!(config.sdk.timeout_secs, Some(15));
    }

    #[test]
    fn test_unresolved_api_key_is_absent() {
        let sdk = SdkConfig {
            api_key: Some("$SPI_TEST_SURELY_UNSET_KEY".into()),
            ..SdkConfig::default()
        };
        assert_eq!(sdk.resolved_api_key(), None);
        assert!(sdk.client(&MerchantConfig::default()).is_ok());
    }

    #[test]
    fn test_expand_env_vars() {
        let path = std::env::var("PATH").unwrap();
        assert_eq!(expand_env_vars("a=$PATH;"), format!("a={path};"));
        assert_eq!(expand_env_vars("a=${PATH}x"), format!("a={path}x"));
        assert_eq!(
            expand_env_vars("k=$SPI_TEST_SURELY_UNSET_KEY!"),
            "k=$SPI_TEST_SURELY_UNSET_KEY!"
        );
        assert_eq!(
            expand_env_vars("k=${SPI_TEST_SURELY_UNSET_KEY}"),
            "k=${SPI_TEST_SURELY_UNSET_KEY}"
        );
        assert_eq!(expand_env_vars("cost $ 5"), "cost $ 5");
        assert_eq!(expand_env_vars("open ${ brace"), "open ${ brace");
        assert_eq!(expand_env_vars("end$"), "end$");
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let err = ServerConfig::from_toml("port = \"x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
