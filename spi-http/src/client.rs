//! A settlement SDK reached over HTTP.
//!
//! [`SdkClient`] implements [`MerchantSdk`] and [`PaymentConfirmer`] against
//! a remote SDK service that holds the merchant keypair and talks to the
//! Solana cluster:
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | `GET` | `./transfer-request` | | [`TransferRequestDescriptor`] |
//! | `POST` | `./transfer` | [`TransferRequest`] | [`UnsignedTransaction`] |
//! | `GET` | `./confirm/<reference>` | | `{ "paid": bool }` |
//!
//! Failures are reported as [`SdkClientError`] and handed to the checkout
//! core as opaque [`SdkError`] / [`PollError`] values. No request is retried.

use std::fmt::Display;
use std::time::Duration;

use http::header::{AUTHORIZATION, InvalidHeaderValue};
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use reqwest::Client;
use serde::Deserialize;
use spi::intent::{MerchantConfig, TransferRequest};
use spi::sdk::{
    BoxFuture, MerchantSdk, PaymentConfirmer, PollError, SdkError, TransferRequestDescriptor,
    UnsignedTransaction,
};
use spi::Address;
use url::Url;

#[cfg(feature = "telemetry")]
use tracing::{Span, instrument};

/// Header carrying the merchant label to the SDK service.
pub const MERCHANT_HEADER: HeaderName = HeaderName::from_static("x-spi-merchant");

/// Header carrying the Solana RPC endpoint to the SDK service.
pub const NETWORK_HEADER: HeaderName = HeaderName::from_static("x-spi-network");

/// Errors that can occur while talking to the remote SDK service.
#[derive(Debug, thiserror::Error)]
pub enum SdkClientError {
    /// URL parse error.
    #[error("URL parse error: {context}: {source}")]
    UrlParse {
        /// Human-readable context.
        context: &'static str,
        /// The underlying parse error.
        #[source]
        source: url::ParseError,
    },
    /// A configured header value is not valid in HTTP.
    #[error("invalid value for header {name}: {source}")]
    InvalidHeader {
        /// Header being set.
        name: HeaderName,
        /// The underlying error.
        #[source]
        source: InvalidHeaderValue,
    },
    /// HTTP transport error, including timeouts.
    #[error("HTTP error: {context}: {source}")]
    Http {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// JSON deserialization error.
    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
    /// Unexpected HTTP status code.
    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        /// Human-readable context.
        context: &'static str,
        /// The HTTP status code.
        status: StatusCode,
        /// The response body.
        body: String,
    },
    /// Failed to read response body.
    #[error("Failed to read response body as text: {context}: {source}")]
    ResponseBodyRead {
        /// Human-readable context.
        context: &'static str,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },
}

#[derive(Debug, Deserialize)]
struct ConfirmResponse {
    paid: bool,
}

/// A client for a remote settlement SDK service.
#[derive(Clone, Debug)]
pub struct SdkClient {
    base_url: Url,
    transfer_request_url: Url,
    transfer_url: Url,
    confirm_url: Url,
    client: Client,
    headers: HeaderMap,
    timeout: Option<Duration>,
}

impl SdkClient {
    /// Constructs a client from the service's base URL.
    ///
    /// # Errors
    ///
    /// Returns [`SdkClientError::UrlParse`] if an endpoint URL cannot be
    /// derived from `base_url`.
    pub fn try_new(base_url: Url) -> Result<Self, SdkClientError> {
        let join = |path: &str, context: &'static str| {
            base_url
                .join(path)
                .map_err(|source| SdkClientError::UrlParse { context, source })
        };
        let transfer_request_url = join(
            "./transfer-request",
            "Failed to construct ./transfer-request URL",
        )?;
        let transfer_url = join("./transfer", "Failed to construct ./transfer URL")?;
        let confirm_url = join("./confirm/", "Failed to construct ./confirm/ URL")?;
        Ok(Self {
            base_url,
            transfer_request_url,
            transfer_url,
            confirm_url,
            client: Client::new(),
            headers: HeaderMap::new(),
            timeout: None,
        })
    }

    /// Returns the base URL used by this client.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Returns any custom headers configured on the client.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the configured timeout, if any.
    #[must_use]
    pub const fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Attaches custom headers to all future requests.
    #[must_use]
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers.extend(headers);
        self
    }

    /// Sets a timeout for all future requests. A request that exceeds it
    /// fails with [`SdkClientError::Http`].
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Authenticates all future requests with a bearer token.
    ///
    /// # Errors
    ///
    /// Returns [`SdkClientError::InvalidHeader`] if the token is not a valid
    /// header value.
    pub fn with_bearer_auth(self, token: &str) -> Result<Self, SdkClientError> {
        self.with_header(AUTHORIZATION, &format!("Bearer {token}"))
    }

    /// Sends the merchant label and network with every request, so the
    /// service settles on behalf of this merchant.
    ///
    /// # Errors
    ///
    /// Returns [`SdkClientError::InvalidHeader`] if the label is not a valid
    /// header value.
    pub fn with_merchant(self, config: &MerchantConfig) -> Result<Self, SdkClientError> {
        self.with_header(MERCHANT_HEADER, &config.label)?
            .with_header(NETWORK_HEADER, config.network.as_str())
    }

    fn with_header(mut self, name: HeaderName, value: &str) -> Result<Self, SdkClientError> {
        let value = HeaderValue::from_str(value).map_err(|source| SdkClientError::InvalidHeader {
            name: name.clone(),
            source,
        })?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Sends a `GET ./transfer-request` to fetch the payer-facing descriptor.
    ///
    /// # Errors
    ///
    /// Returns [`SdkClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "spi.sdk_client.transfer_request", skip_all, err)
    )]
    pub async fn transfer_request_descriptor(
        &self,
    ) -> Result<TransferRequestDescriptor, SdkClientError> {
        self.get_json(&self.transfer_request_url, "GET /transfer-request")
            .await
    }

    /// Sends a `POST ./transfer` to build an unsigned transaction.
    ///
    /// # Errors
    ///
    /// Returns [`SdkClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(
            name = "spi.sdk_client.build_transfer",
            skip_all,
            fields(reference = %request.reference_id),
            err
        )
    )]
    pub async fn build_transfer(
        &self,
        request: &TransferRequest,
    ) -> Result<UnsignedTransaction, SdkClientError> {
        self.post_json(&self.transfer_url, "POST /transfer", request)
            .await
    }

    /// Sends a `GET ./confirm/<reference>` and reports whether the reference
    /// has been paid. The check is read-only and safe to repeat.
    ///
    /// # Errors
    ///
    /// Returns [`SdkClientError`] if the HTTP request fails.
    #[cfg_attr(
        feature = "telemetry",
        instrument(name = "spi.sdk_client.confirm", skip(self), err)
    )]
    pub async fn confirm_payment(&self, reference: Address) -> Result<bool, SdkClientError> {
        let url = self
            .confirm_url
            .join(&reference.to_string())
            .map_err(|source| SdkClientError::UrlParse {
                context: "Failed to construct ./confirm/<reference> URL",
                source,
            })?;
        let response: ConfirmResponse = self.get_json(&url, "GET /confirm").await?;
        Ok(response.paid)
    }

    async fn post_json<T, R>(
        &self,
        url: &Url,
        context: &'static str,
        payload: &T,
    ) -> Result<R, SdkClientError>
    where
        T: serde::Serialize + Sync + ?Sized,
        R: serde::de::DeserializeOwned,
    {
        let req = self.client.post(url.clone()).json(payload);
        self.send(req, context).await
    }

    async fn get_json<R>(&self, url: &Url, context: &'static str) -> Result<R, SdkClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        let req = self.client.get(url.clone());
        self.send(req, context).await
    }

    /// Applies headers and timeout, sends, and maps any non-200 response to
    /// [`SdkClientError::HttpStatus`].
    async fn send<R>(
        &self,
        mut req: reqwest::RequestBuilder,
        context: &'static str,
    ) -> Result<R, SdkClientError>
    where
        R: serde::de::DeserializeOwned,
    {
        req = req.headers(self.headers.clone());
        if let Some(timeout) = self.timeout {
            req = req.timeout(timeout);
        }
        let http_response = req
            .send()
            .await
            .map_err(|e| SdkClientError::Http { context, source: e })?;

        let result = if http_response.status() == StatusCode::OK {
            http_response
                .json::<R>()
                .await
                .map_err(|e| SdkClientError::JsonDeserialization { context, source: e })
        } else {
            let status = http_response.status();
            let body = http_response
                .text()
                .await
                .map_err(|e| SdkClientError::ResponseBodyRead { context, source: e })?;
            Err(SdkClientError::HttpStatus {
                context,
                status,
                body,
            })
        };

        record_result_on_span(&result);

        result
    }
}

impl MerchantSdk for SdkClient {
    fn transfer_request_descriptor(
        &self,
    ) -> BoxFuture<'_, Result<TransferRequestDescriptor, SdkError>> {
        Box::pin(async move {
            Self::transfer_request_descriptor(self)
                .await
                .map_err(SdkError::new)
        })
    }

    fn build_transfer(
        &self,
        request: TransferRequest,
    ) -> BoxFuture<'_, Result<UnsignedTransaction, SdkError>> {
        Box::pin(async move {
            Self::build_transfer(self, &request)
                .await
                .map_err(SdkError::new)
        })
    }
}

impl PaymentConfirmer for SdkClient {
    fn confirm_payment(&self, reference: Address) -> BoxFuture<'_, Result<bool, PollError>> {
        Box::pin(async move {
            Self::confirm_payment(self, reference)
                .await
                .map_err(PollError::new)
        })
    }
}

/// Parses a base URL, normalizing it to a single trailing slash so relative
/// endpoint paths resolve beneath it.
impl TryFrom<&str> for SdkClient {
    type Error = SdkClientError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let mut normalized = value.trim_end_matches('/').to_string();
        normalized.push('/');
        let url = Url::parse(&normalized).map_err(|e| SdkClientError::UrlParse {
            context: "Failed to parse base url",
            source: e,
        })?;
        Self::try_new(url)
    }
}

/// Records the outcome of a request on the current span.
#[cfg(feature = "telemetry")]
fn record_result_on_span<R, E: Display>(result: &Result<R, E>) {
    let span = Span::current();
    match result {
        Ok(_) => {
            span.record("otel.status_code", "OK");
        }
        Err(err) => {
            span.record("otel.status_code", "ERROR");
            tracing::event!(tracing::Level::ERROR, error = %err, "Request to settlement SDK failed");
        }
    }
}

#[cfg(not(feature = "telemetry"))]
fn record_result_on_span<R, E: Display>(_result: &Result<R, E>) {}
