//! The merchant transaction request endpoint.
//!
//! A wallet that scanned the payment QR code calls
//! `/api/create-transaction/<token>` twice: a `GET` for the merchant
//! descriptor it shows the payer, then a `POST` with the payer's account to
//! receive an unsigned transaction to sign.

use std::fmt;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::get;
use serde::Deserialize;
use spi::intent::{self, MerchantConfig};
use spi::sdk::{MerchantSdk, TransferRequestDescriptor, UnsignedTransaction};
use spi::{Address, token};

use crate::error::MerchantError;

/// Route serving transaction requests, keyed by session token.
pub const CREATE_TRANSACTION_PATH: &str = "/api/create-transaction/{token}";

/// Shared state for the merchant routes.
#[derive(Clone)]
pub struct MerchantState {
    /// Settlement SDK that builds transactions.
    pub sdk: Arc<dyn MerchantSdk>,
    /// Merchant identity and settlement algorithm.
    pub config: Arc<MerchantConfig>,
}

impl MerchantState {
    /// Creates route state from an SDK and configuration.
    #[must_use]
    pub fn new<S>(sdk: S, config: MerchantConfig) -> Self
    where
        S: MerchantSdk + 'static,
    {
        Self {
            sdk: Arc::new(sdk),
            config: Arc::new(config),
        }
    }
}

impl fmt::Debug for MerchantState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MerchantState")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// `POST` body sent by the wallet.
#[derive(Debug, Deserialize)]
struct CreateTransactionBody {
    account: Option<String>,
}

/// `GET /api/create-transaction/{token}` - Returns the merchant descriptor.
///
/// # Errors
///
/// Returns 400 if the token does not decode, or 502 if the SDK fails.
pub async fn get_transaction_request(
    State(state): State<MerchantState>,
    Path(token): Path<String>,
) -> Result<Json<TransferRequestDescriptor>, MerchantError> {
    token::decode(&token)?;
    let descriptor = state.sdk.transfer_request_descriptor().await?;
    Ok(Json(descriptor))
}

/// `POST /api/create-transaction/{token}` - Builds an unsigned transaction for
/// the payer named in the body.
///
/// The SDK is not called unless both the token and the payer account are
/// valid.
///
/// # Errors
///
/// Returns 400 for a bad token or body, 422 if the token's amount or discount
/// is not acceptable, or 502 if the SDK fails.
pub async fn post_create_transaction(
    State(state): State<MerchantState>,
    Path(token): Path<String>,
    body: Bytes,
) -> Result<Json<UnsignedTransaction>, MerchantError> {
    let payer = parse_payer(&body)?;
    let transaction =
        intent::create_transaction(state.sdk.as_ref(), &state.config, &token, payer).await?;
    Ok(Json(transaction))
}

fn parse_payer(body: &[u8]) -> Result<Address, MerchantError> {
    let body: CreateTransactionBody = serde_json::from_slice(body)?;
    let account = body.account.ok_or(MerchantError::MissingPayer)?;
    account
        .parse()
        .map_err(|_| MerchantError::InvalidPayer(account))
}

/// Creates an Axum [`Router`] with the merchant endpoints.
///
/// Endpoints:
/// - `GET /api/create-transaction/{token}` - merchant descriptor
/// - `POST /api/create-transaction/{token}` - unsigned transaction for a payer
pub fn merchant_router(state: MerchantState) -> Router {
    Router::new()
        .route(
            CREATE_TRANSACTION_PATH,
            get(get_transaction_request).post(post_create_transaction),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode};
    use serde_json::{Value, json};
    use spi::TransferRequest;
    use spi::sdk::{BoxFuture, SdkError};
    use std::sync::Mutex;
    use tower::ServiceExt;

    const REFERENCE: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const PAYER: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

    #[derive(Default)]
    struct FakeSdk {
        fail: bool,
        requests: Mutex<Vec<TransferRequest>>,
    }

    impl MerchantSdk for FakeSdk {
        fn transfer_request_descriptor(
            &self,
        ) -> BoxFuture<'_, Result<TransferRequestDescriptor, SdkError>> {
            Box::pin(async {
                Ok(TransferRequestDescriptor {
                    label: "100xMerchant".into(),
                    icon: None,
                    extra: serde_json::Map::new(),
                })
            })
        }

        fn build_transfer(
            &self,
            request: TransferRequest,
        ) -> BoxFuture<'_, Result<UnsignedTransaction, SdkError>> {
            self.requests.lock().unwrap().push(request);
            let fail = self.fail;
            Box::pin(async move {
                if fail {
                    return Err(SdkError::new("blockhash not found"));
                }
                Ok(UnsignedTransaction {
                    transaction: "AQAB".into(),
                    message: Some("Thanks for shopping".into()),
                })
            })
        }
    }

    fn app(sdk: &Arc<FakeSdk>) -> Router {
        let sdk: Arc<dyn MerchantSdk> = Arc::<FakeSdk>::clone(sdk);
        merchant_router(MerchantState {
            sdk,
            config: Arc::new(MerchantConfig::default()),
        })
    }

    async fn post(app: Router, token: &str, body: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method("POST")
            .uri(format!("/api/create-transaction/{token}"))
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_post_builds_transfer_from_token() {
        let sdk = Arc::new(FakeSdk::default());
        let token = format!("{REFERENCE}-629.97-25");
        let body = json!({ "account": PAYER }).to_string();

        let (status, json) = post(app(&sdk), &token, &body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["transaction"], "AQAB");
        assert_eq!(json["message"], "Thanks for shopping");

        let requests = sdk.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.reference_id.to_string(), REFERENCE);
        assert_eq!(request.total_amount.to_string(), "629.97");
        assert_eq!(u32::from(request.discount_percent), 25);
        assert_eq!(request.payer_key.to_string(), PAYER);
    }

    #[tokio::test]
    async fn test_post_without_account_skips_sdk() {
        let sdk = Arc::new(FakeSdk::default());
        let token = format!("{REFERENCE}-629.97-25");

        let (status, json) = post(app(&sdk), &token, "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "missing payer account");
        assert!(sdk.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_post_rejects_bad_input() {
        let sdk = Arc::new(FakeSdk::default());
        let good = format!("{REFERENCE}-629.97-25");
        let payer = json!({ "account": PAYER }).to_string();

        let cases = [
            (good.clone(), r#"{"account":"nope"}"#.to_owned(), StatusCode::BAD_REQUEST),
            (good, "not json".to_owned(), StatusCode::BAD_REQUEST),
            ("garbage".to_owned(), payer.clone(), StatusCode::BAD_REQUEST),
            (format!("{REFERENCE}-abc-25"), payer.clone(), StatusCode::BAD_REQUEST),
            (
                format!("{REFERENCE}-629.97-30"),
                payer.clone(),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (format!("{REFERENCE}-0.00-0"), payer, StatusCode::UNPROCESSABLE_ENTITY),
        ];
        for (token, body, expected) in cases {
            let (status, json) = post(app(&sdk), &token, &body).await;
            assert_eq!(status, expected, "token {token}, body {body}");
            assert!(json["error"].is_string());
        }
        assert!(sdk.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sdk_failure_is_bad_gateway() {
        let sdk = Arc::new(FakeSdk {
            fail: true,
            ..FakeSdk::default()
        });
        let token = format!("{REFERENCE}-10.00-0");
        let body = json!({ "account": PAYER }).to_string();

        let (status, json) = post(app(&sdk), &token, &body).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(json["error"], crate::error::UPSTREAM_UNAVAILABLE);
        assert!(!json.to_string().contains("blockhash"));
        assert_eq!(sdk.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_get_returns_descriptor() {
        let sdk = Arc::new(FakeSdk::default());
        let request = Request::builder()
            .uri(format!("/api/create-transaction/{REFERENCE}-10.00-50"))
            .body(Body::empty())
            .unwrap();
        let response = app(&sdk).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["label"], "100xMerchant");
    }

    #[tokio::test]
    async fn test_get_rejects_malformed_token() {
        let sdk = Arc::new(FakeSdk::default());
        let request = Request::builder()
            .uri("/api/create-transaction/only-two")
            .body(Body::empty())
            .unwrap();
        let response = app(&sdk).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
