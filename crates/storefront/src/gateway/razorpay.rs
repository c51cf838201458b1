//! Razorpay Orders API client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::{CreateOrderRequest, GatewayError, GatewayOrderRef, PaymentGateway, PaymentProof};
use crate::config::PaymentConfig;

/// Request timeout for gateway calls.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Serialize)]
struct OrderBody<'a> {
    amount: i64,
    currency: &'a str,
    payment_capture: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    receipt: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct OrderResponse {
    id: String,
}

/// Razorpay client authenticated with a key id and secret.
#[derive(Clone)]
pub struct RazorpayGateway {
    client: Client,
    api_base: String,
    key_id: String,
    key_secret: SecretString,
}

impl std::fmt::Debug for RazorpayGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RazorpayGateway")
            .field("api_base", &self.api_base)
            .field("key_id", &self.key_id)
            .field("key_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RazorpayGateway {
    /// Create a new Razorpay client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &PaymentConfig) -> Result<Self, GatewayError> {
        let client = Client::builder().timeout(REQUEST_TIMEOUT).build()?;

        Ok(Self {
            client,
            api_base: config.api_base.clone(),
            key_id: config.key_id.clone(),
            key_secret: config.key_secret.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    #[instrument(skip(self), fields(amount = request.amount, currency = %request.currency))]
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<GatewayOrderRef, GatewayError> {
        let url = format!("{}/orders", self.api_base);
        let body = OrderBody {
            amount: request.amount,
            currency: request.currency.code(),
            payment_capture: u8::from(request.auto_capture),
            receipt: request.receipt.as_deref(),
        };

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(self.key_secret.expose_secret()))
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "Gateway rejected order creation");
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let order: OrderResponse = response.json().await?;
        tracing::info!(gateway_order_id = %order.id, "Gateway order created");

        Ok(GatewayOrderRef { id: order.id })
    }

    #[instrument(skip(self, proof), fields(gateway_order_id = %proof.gateway_order_id))]
    fn verify_signature(&self, proof: &PaymentProof) -> Result<(), GatewayError> {
        super::verify(&self.key_secret, proof)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clothaura_core::Currency;

    use super::*;

    fn gateway() -> RazorpayGateway {
        RazorpayGateway::new(&PaymentConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: SecretString::from("rzp_test_secret".to_string()),
            api_base: "https://api.razorpay.com/v1".to_string(),
            currency: Currency::Inr,
        })
        .unwrap()
    }

    #[test]
    fn test_order_body_shape() {
        let body = OrderBody {
            amount: 59_950,
            currency: "INR",
            payment_capture: 1,
            receipt: None,
        };
        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            serde_json::json!({"amount": 59950, "currency": "INR", "payment_capture": 1})
        );
    }

    #[test]
    fn test_verify_signature_uses_key_secret() {
        let gateway = gateway();
        let secret = SecretString::from("rzp_test_secret".to_string());
        let proof = PaymentProof {
            payment_id: "pay_1".into(),
            gateway_order_id: "order_1".into(),
            signature: super::super::sign(&secret, "order_1", "pay_1").unwrap(),
        };
        assert!(gateway.verify_signature(&proof).is_ok());

        let tampered = PaymentProof {
            signature: "0".repeat(64),
            ..proof
        };
        assert!(matches!(
            gateway.verify_signature(&tampered),
            Err(GatewayError::SignatureMismatch)
        ));
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", gateway());
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("rzp_test_secret"));
    }
}
