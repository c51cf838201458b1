//! In-process stand-ins for the payment gateway and mail server.
//!
//! Enabled for unit tests and, through the `test-support` feature, for the
//! integration test crate.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use secrecy::SecretString;

use clothaura_core::{Currency, Email, OtpCode};

use crate::config::{EmailConfig, OtpPolicy, PaymentConfig, StorefrontConfig};
use crate::gateway::{
    self, CreateOrderRequest, GatewayError, GatewayOrderRef, PaymentGateway, PaymentProof,
};
use crate::services::email::{EmailError, Notifier};

const FAKE_KEY_SECRET: &str = "fake-gateway-secret";

/// Configuration for in-process tests. Nothing in it is ever dialled.
#[must_use]
pub fn test_config() -> StorefrontConfig {
    StorefrontConfig {
        database_url: SecretString::from("postgres://localhost/clothaura_test".to_string()),
        host: std::net::IpAddr::from([127, 0, 0, 1]),
        port: 3000,
        base_url: "http://localhost:3000".to_string(),
        session_secret: SecretString::from("t3st-Sess10n-S3cret-Kq8#vZ2!mW7@pL4$".to_string()),
        payment: PaymentConfig {
            key_id: "rzp_test_key".to_string(),
            key_secret: SecretString::from(FAKE_KEY_SECRET.to_string()),
            api_base: "http://127.0.0.1:9".to_string(),
            currency: Currency::Inr,
        },
        email: EmailConfig {
            smtp_host: "127.0.0.1".to_string(),
            smtp_port: 2525,
            smtp_username: "test".to_string(),
            smtp_password: SecretString::from("test".to_string()),
            from_address: "ClothAura <no-reply@clothaura.test>".to_string(),
        },
        otp: OtpPolicy::default(),
        sentry_dsn: None,
        sentry_environment: None,
    }
}

/// Gateway that issues sequential order ids and signs proofs with a fixed
/// secret, using the same HMAC scheme as the real gateway.
pub struct FakeGateway {
    secret: SecretString,
    next_id: AtomicU64,
    requests: Mutex<Vec<CreateOrderRequest>>,
    unavailable: AtomicBool,
}

impl FakeGateway {
    #[must_use]
    pub fn new() -> Self {
        Self {
            secret: SecretString::from(FAKE_KEY_SECRET.to_string()),
            next_id: AtomicU64::new(1),
            requests: Mutex::new(Vec::new()),
            unavailable: AtomicBool::new(false),
        }
    }

    /// Make subsequent `create_order` calls fail.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every order creation request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<CreateOrderRequest> {
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// A correctly signed proof for `gateway_order_id` / `payment_id`, as the
    /// gateway would hand to the browser.
    #[must_use]
    pub fn proof(&self, gateway_order_id: &str, payment_id: &str) -> PaymentProof {
        PaymentProof {
            payment_id: payment_id.to_owned(),
            gateway_order_id: gateway_order_id.to_owned(),
            signature: gateway::sign(&self.secret, gateway_order_id, payment_id)
                .unwrap_or_default(),
        }
    }
}

impl Default for FakeGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for FakeGateway {
    async fn create_order(
        &self,
        request: CreateOrderRequest,
    ) -> Result<GatewayOrderRef, GatewayError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(GatewayError::Api {
                status: 503,
                message: "gateway unavailable".to_owned(),
            });
        }
        self.requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(request);
        let n = self.next_id.fetch_add(1, Ordering::SeqCst);
        Ok(GatewayOrderRef {
            id: format!("order_fake{n:06}"),
        })
    }

    fn verify_signature(&self, proof: &PaymentProof) -> Result<(), GatewayError> {
        gateway::verify(&self.secret, proof)
    }
}

/// Notifier that keeps every code it is asked to send.
#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<(Email, OtpCode)>>,
    failing: AtomicBool,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent sends fail.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    #[must_use]
    pub fn sent(&self) -> Vec<(Email, OtpCode)> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Most recent code sent to `to`.
    #[must_use]
    pub fn last_code_for(&self, to: &str) -> Option<OtpCode> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .rev()
            .find(|(email, _)| email.as_str() == to)
            .map(|(_, code)| *code)
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_otp(&self, to: &Email, code: OtpCode) -> Result<(), EmailError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(EmailError::InvalidAddress(to.to_string()));
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((to.clone(), code));
        Ok(())
    }
}
