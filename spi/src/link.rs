//! Transaction request URLs and Solana Pay deep links.
//!
//! A wallet scanning the payment QR code receives
//! `solana:<percent-encoded transaction request URL>`, and the request URL
//! itself is the merchant endpoint with the session token as its last path
//! segment.

use url::Url;
use url::form_urlencoded::byte_serialize;

use crate::token::SessionToken;

/// Path under the public base URL that serves transaction requests.
pub const TRANSACTION_ROUTE: &str = "api/create-transaction/";

/// URI scheme wallets register for Solana Pay.
pub const SOLANA_PAY_SCHEME: &str = "solana:";

/// Edge length of the payment QR code, in pixels.
pub const QR_SIZE_PX: u32 = 350;

/// Builds the merchant transaction request URL for a session token.
///
/// A base without a trailing slash is treated as a directory, so
/// `https://shop.example/pay` and `https://shop.example/pay/` both resolve to
/// `https://shop.example/pay/api/create-transaction/<token>`.
///
/// # Errors
///
/// Returns an error if `base` cannot be a base URL (e.g. `mailto:`).
pub fn transaction_request_url(base: &Url, token: &SessionToken) -> Result<Url, url::ParseError> {
    let mut base = base.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join(TRANSACTION_ROUTE)?.join(token.as_str())
}

/// Wraps a transaction request URL as a Solana Pay deep link.
#[must_use]
pub fn solana_pay_link(request_url: &Url) -> String {
    let encoded: String = byte_serialize(request_url.as_str().as_bytes()).collect();
    format!("{SOLANA_PAY_SCHEME}{encoded}")
}
