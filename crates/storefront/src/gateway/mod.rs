//! Payment gateway integration.
//!
//! # Contract
//!
//! - [`PaymentGateway::create_order`] registers the amount to collect (in minor
//!   units) with the gateway and returns the gateway's order reference.
//! - [`PaymentGateway::verify_signature`] checks the proof the gateway hands
//!   the browser after payment. A proof that verifies is treated as
//!   authoritative.
//!
//! [`RazorpayGateway`] is the production implementation.

pub mod razorpay;

pub use razorpay::RazorpayGateway;

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use thiserror::Error;

use clothaura_core::Currency;

/// Errors that can occur when talking to the payment gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Gateway returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Payment signature did not match.
    #[error("payment signature mismatch")]
    SignatureMismatch,

    /// Key secret unusable as an HMAC key.
    #[error("invalid signing key")]
    InvalidKey,
}

/// Order creation request, amounts in minor units (paise, cents).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateOrderRequest {
    pub amount: i64,
    pub currency: Currency,
    pub auto_capture: bool,
    /// Merchant-side reference, echoed back by the gateway.
    pub receipt: Option<String>,
}

/// Gateway-side order reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrderRef {
    pub id: String,
}

/// Proof of payment carried by the gateway's redirect back to the shop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentProof {
    pub payment_id: String,
    pub gateway_order_id: String,
    pub signature: String,
}

impl PaymentProof {
    /// Build a proof from callback parameters. Returns `None` if any of the
    /// three is missing or empty.
    #[must_use]
    pub fn from_callback(
        payment_id: Option<String>,
        gateway_order_id: Option<String>,
        signature: Option<String>,
    ) -> Option<Self> {
        let present = |v: Option<String>| v.filter(|s| !s.is_empty());
        Some(Self {
            payment_id: present(payment_id)?,
            gateway_order_id: present(gateway_order_id)?,
            signature: present(signature)?,
        })
    }
}

/// External payment collaborator.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a gateway order for `request.amount` minor units.
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<GatewayOrderRef, GatewayError>;

    /// Check that `proof` was issued by the gateway for its order/payment pair.
    fn verify_signature(&self, proof: &PaymentProof) -> Result<(), GatewayError>;
}

/// Hex HMAC-SHA256 of `"<order_id>|<payment_id>"` under `secret`.
///
/// # Errors
///
/// Returns `GatewayError::InvalidKey` if the secret cannot key the MAC.
pub fn sign(
    secret: &SecretString,
    gateway_order_id: &str,
    payment_id: &str,
) -> Result<String, GatewayError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.expose_secret().as_bytes())
        .map_err(|_| GatewayError::InvalidKey)?;
    mac.update(gateway_order_id.as_bytes());
    mac.update(b"|");
    mac.update(payment_id.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Verify `proof` against `secret`.
///
/// # Errors
///
/// Returns `GatewayError::SignatureMismatch` if the signature differs.
pub fn verify(secret: &SecretString, proof: &PaymentProof) -> Result<(), GatewayError> {
    let expected = sign(secret, &proof.gateway_order_id, &proof.payment_id)?;
    if !constant_time_compare(&expected, &proof.signature) {
        return Err(GatewayError::SignatureMismatch);
    }
    Ok(())
}

/// Constant-time string comparison to prevent timing attacks.
fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result: u8 = 0;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }

    result == 0
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn secret() -> SecretString {
        SecretString::from("test-key-secret".to_string())
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "abcd"));
    }

    #[test]
    fn test_sign_matches_manual_hmac() {
        let mut mac = Hmac::<Sha256>::new_from_slice(b"test-key-secret").unwrap();
        mac.update(b"order_9A33XWu170gUtm|pay_29QQoUBi66xm2f");
        let expected = hex::encode(mac.finalize().into_bytes());

        assert_eq!(
            sign(&secret(), "order_9A33XWu170gUtm", "pay_29QQoUBi66xm2f").unwrap(),
            expected
        );
    }

    #[test]
    fn test_verify_rejects_tampering() {
        let signature = sign(&secret(), "order_1", "pay_1").unwrap();
        let proof = PaymentProof {
            payment_id: "pay_1".into(),
            gateway_order_id: "order_1".into(),
            signature,
        };
        assert!(verify(&secret(), &proof).is_ok());

        let swapped = PaymentProof {
            payment_id: "pay_2".into(),
            ..proof.clone()
        };
        assert!(matches!(
            verify(&secret(), &swapped),
            Err(GatewayError::SignatureMismatch)
        ));

        let other_key = SecretString::from("another-secret".to_string());
        assert!(verify(&other_key, &proof).is_err());
    }

    #[test]
    fn test_from_callback_requires_all_fields() {
        let some = |s: &str| Some(s.to_string());
        assert!(PaymentProof::from_callback(some("p"), some("o"), some("s")).is_some());
        assert!(PaymentProof::from_callback(None, some("o"), some("s")).is_none());
        assert!(PaymentProof::from_callback(some("p"), None, some("s")).is_none());
        assert!(PaymentProof::from_callback(some("p"), some("o"), Some(String::new())).is_none());
    }
}
