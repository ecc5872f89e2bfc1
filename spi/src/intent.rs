//! Transfer intent resolution.
//!
//! The payment page and the merchant endpoint read the same session token
//! for different purposes. The page only needs something to show, so
//! [`resolve_client_side`] passes the decoded fields through unchanged. The
//! merchant endpoint is where the token becomes money movement:
//! [`resolve_server_side`] validates it and binds the merchant's settlement
//! algorithm, producing the [`TransferRequest`] handed to the SDK.
//!
//! # Integrity
//!
//! The amount and discount travel in a client-visible URL without any
//! integrity tag, and nothing server-side re-derives them from a real cart.
//! A payer can therefore construct a token for a different amount and the
//! resolver will accept it as long as it is well formed. Closing this needs
//! either a MAC over the token issued at checkout or a server-held session
//! keyed only by reference; neither exists here.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::address::Address;
use crate::amount::Amount;
use crate::discount::Discount;
use crate::error::{CheckoutError, IntentError, InvalidIntentReason};
use crate::sdk::{MerchantSdk, UnsignedTransaction};
use crate::token::{self, DecodedSession};

/// Settlement algorithm applied when none is configured.
pub const DEFAULT_ALGORITHM: &str = "SPI_ALGO_2";

/// Merchant label used when none is configured.
pub const DEFAULT_LABEL: &str = "100xMerchant";

/// Solana cluster used when none is configured.
pub const DEFAULT_NETWORK: &str = "https://api.devnet.solana.com";

/// Opaque tag selecting the SDK's settlement and splitting strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlgorithmId(String);

impl AlgorithmId {
    /// Creates a tag from any string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The tag as sent to the SDK.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AlgorithmId {
    fn default() -> Self {
        Self::new(DEFAULT_ALGORITHM)
    }
}

/// Merchant identity and network, read once at startup and passed by
/// reference to the resolver and the SDK client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantConfig {
    /// Label wallets display for this merchant.
    #[serde(default = "default_label")]
    pub label: String,

    /// Settlement algorithm bound into every transfer request.
    #[serde(default)]
    pub algorithm: AlgorithmId,

    /// Solana RPC endpoint the SDK settles on.
    #[serde(default = "default_network")]
    pub network: Url,
}

fn default_label() -> String {
    DEFAULT_LABEL.to_owned()
}

fn default_network() -> Url {
    Url::parse(DEFAULT_NETWORK).expect("default network URL is valid")
}

impl Default for MerchantConfig {
    fn default() -> Self {
        Self {
            label: default_label(),
            algorithm: AlgorithmId::default(),
            network: default_network(),
        }
    }
}

/// What the payment page renders for a decoded session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisplayAmount {
    /// Reference the payer can quote to support.
    pub reference: Address,
    /// Amount to pay, exactly as carried by the token.
    pub amount: Amount,
    /// Loyalty share in percent, exactly as carried by the token.
    pub discount_percent: u32,
}

impl DisplayAmount {
    /// Returns `true` if part of the payment is routed to loyalty tokens.
    #[must_use]
    pub const fn uses_loyalty(&self) -> bool {
        self.discount_percent != 0
    }
}

/// The fully specified instruction handed to the SDK to build a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferRequest {
    /// Reference key the transfer must carry.
    pub reference_id: Address,
    /// Amount to transfer.
    pub total_amount: Amount,
    /// Wallet that will sign and pay.
    pub payer_key: Address,
    /// Loyalty share to route through the secondary instrument.
    pub discount_percent: Discount,
    /// Settlement strategy tag.
    pub algorithm_id: AlgorithmId,
}

/// Passes the decoded amount and discount through for display.
///
/// The page never re-derives pricing; it has no cart to derive it from.
#[must_use]
pub const fn resolve_client_side(decoded: &DecodedSession) -> DisplayAmount {
    DisplayAmount {
        reference: decoded.reference,
        amount: decoded.amount,
        discount_percent: decoded.discount_percent,
    }
}

/// Validates a decoded session as a trusted transfer intent.
///
/// The token's amount is treated as the source of truth; see the module
/// documentation for why that trust is not enforced.
///
/// # Errors
///
/// Returns [`IntentError::InvalidIntent`] if the amount is zero or the
/// discount is not one of the offered percentages.
pub fn resolve_server_side(
    decoded: &DecodedSession,
    payer: Address,
    config: &MerchantConfig,
) -> Result<TransferRequest, IntentError> {
    if !decoded.amount.is_positive() {
        return Err(InvalidIntentReason::NonPositiveAmount(decoded.amount).into());
    }
    let discount = decoded
        .discount()
        .ok_or(InvalidIntentReason::UnsupportedDiscount(decoded.discount_percent))?;
    Ok(TransferRequest {
        reference_id: decoded.reference,
        total_amount: decoded.amount,
        payer_key: payer,
        discount_percent: discount,
        algorithm_id: config.algorithm.clone(),
    })
}

/// Runs the merchant-side pipeline: decode the path token, resolve the
/// transfer request and ask the SDK for an unsigned transaction.
///
/// The SDK is only called once decoding and validation have succeeded.
///
/// # Errors
///
/// Returns [`CheckoutError::Decode`], [`CheckoutError::Intent`] or
/// [`CheckoutError::Sdk`] for the step that failed.
pub async fn create_transaction<S>(
    sdk: &S,
    config: &MerchantConfig,
    token: &str,
    payer: Address,
) -> Result<UnsignedTransaction, CheckoutError>
where
    S: MerchantSdk + ?Sized,
{
    let decoded = token::decode(token)?;
    let request = resolve_server_side(&decoded, payer, config)?;
    #[cfg(feature = "telemetry")]
    tracing::debug!(
        reference = %request.reference_id,
        amount = %request.total_amount,
        discount = %request.discount_percent,
        algorithm = request.algorithm_id.as_str(),
        "Resolved transfer request"
    );
    let transaction = sdk.build_transfer(request).await?;
    Ok(transaction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sdk::{BoxFuture, SdkError, TransferRequestDescriptor};
    use std::sync::Mutex;

    const REFERENCE: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const PAYER: &str = "4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU";

    fn payer() -> Address {
        PAYER.parse().unwrap()
    }

    #[derive(Default)]
    struct RecordingSdk {
        requests: Mutex<Vec<TransferRequest>>,
    }

    impl MerchantSdk for RecordingSdk {
        fn transfer_request_descriptor(
            &self,
        ) -> BoxFuture<'_, Result<TransferRequestDescriptor, SdkError>> {
            Box::pin(async { Err(SdkError::new("unused")) })
        }

        fn build_transfer(
            &self,
            request: TransferRequest,
        ) -> BoxFuture<'_, Result<UnsignedTransaction, SdkError>> {
            self.requests.lock().unwrap().push(request);
            Box::pin(async {
                Ok(UnsignedTransaction {
                    transaction: "AQAB".into(),
                    message: None,
                })
            })
        }
    }

    #[test]
    fn test_client_side_is_pass_through() {
        let decoded = token::decode(&format!("{REFERENCE}-629.97-30")).unwrap();
        let display = resolve_client_side(&decoded);
        assert_eq!(display.amount.to_string(), "629.97");
        assert_eq!(display.discount_percent, 30);
        assert!(display.uses_loyalty());
    }

    #[test]
    fn test_server_side_binds_configured_algorithm() {
        let decoded = token::decode(&format!("{REFERENCE}-629.97-25")).unwrap();
        let config = MerchantConfig {
            algorithm: AlgorithmId::new("SPI_ALGO_7"),
            ..MerchantConfig::default()
        };
        let request = resolve_server_side(&decoded, payer(), &config).unwrap();
        assert_eq!(request.reference_id.to_string(), REFERENCE);
        assert_eq!(request.total_amount, "629.97".parse::<Amount>().unwrap());
        assert_eq!(request.payer_key, payer());
        assert_eq!(request.discount_percent, Discount::Quarter);
        assert_eq!(request.algorithm_id.as_str(), "SPI_ALGO_7");
    }

    #[test]
    fn test_server_side_rejects_unoffered_discount() {
        let decoded = token::decode(&format!("{REFERENCE}-629.97-30")).unwrap();
        let err = resolve_server_side(&decoded, payer(), &MerchantConfig::default()).unwrap_err();
        assert_eq!(
            err,
            IntentError::InvalidIntent(InvalidIntentReason::UnsupportedDiscount(30))
        );
    }

    #[test]
    fn test_server_side_rejects_zero_amount() {
        let decoded = token::decode(&format!("{REFERENCE}-0.00-0")).unwrap();
        let err = resolve_server_side(&decoded, payer(), &MerchantConfig::default()).unwrap_err();
        assert!(matches!(
            err,
            IntentError::InvalidIntent(InvalidIntentReason::NonPositiveAmount(_))
        ));
    }

    #[test]
    fn test_default_config() {
        let config = MerchantConfig::default();
        assert_eq!(config.label, "100xMerchant");
        assert_eq!(config.algorithm.as_str(), "SPI_ALGO_2");
        assert_eq!(config.network.as_str(), "https://api.devnet.solana.com/");
    }

    #[test]
    fn test_transfer_request_wire_shape() {
        let decoded = token::decode(&format!("{REFERENCE}-10.00-50")).unwrap();
        let request = resolve_server_side(&decoded, payer(), &MerchantConfig::default()).unwrap();
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["referenceId"], REFERENCE);
        assert_eq!(json["totalAmount"], "10.00");
        assert_eq!(json["payerKey"], PAYER);
        assert_eq!(json["discountPercent"], 50);
        assert_eq!(json["algorithmId"], "SPI_ALGO_2");
    }

    #[tokio::test]
    async fn test_create_transaction_calls_sdk_once_validated() {
        let sdk = RecordingSdk::default();
        let token = format!("{REFERENCE}-629.97-25");
        let tx = create_transaction(&sdk, &MerchantConfig::default(), &token, payer())
            .await
            .unwrap();
        assert_eq!(tx.transaction, "AQAB");
        assert_eq!(sdk.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_create_transaction_skips_sdk_on_bad_token() {
        let sdk = RecordingSdk::default();
        let config = MerchantConfig::default();
        let err = create_transaction(&sdk, &config, "bogus", payer()).await.unwrap_err();
        assert!(matches!(err, CheckoutError::Decode(_)));
        let err = create_transaction(&sdk, &config, &format!("{REFERENCE}-1.00-30"), payer())
            .await
            .unwrap_err();
        assert!(matches!(err, CheckoutError::Intent(_)));
        assert!(sdk.requests.lock().unwrap().is_empty());
    }
}
