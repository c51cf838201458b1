//! Checkout: from session cart to gateway order to persisted order.
//!
//! ```text
//! initiate   cart non-empty -> grand total in minor units -> gateway order
//! confirm    callback proof complete -> gateway signature check
//!            -> VerifiedPayment
//! persist    signed-in user -> order already recorded for this gateway
//!            order? return it -> one transaction: order + one line per cart
//!            entry -> clear cart
//! ```
//!
//! The cart is cleared only after the order transaction has committed. A
//! replayed callback finds the order recorded under its gateway order id and
//! returns that receipt instead of writing another.

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::instrument;

use clothaura_core::{Currency, Money, MoneyError, OrderId, OrderStatus, ProductId};

use crate::db::{OrderStore, RepositoryError};
use crate::gateway::{CreateOrderRequest, GatewayError, PaymentGateway, PaymentProof};
use crate::models::order::DEFAULT_ADDRESS;
use crate::models::{CartView, CurrentUser, NewOrder, NewOrderItem, Order};
use crate::services::{ErrorKind, ServiceError};
use crate::session::{SessionContext, SessionError};

#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("cart is empty")]
    EmptyCart,

    #[error("payment callback is missing payment id, order id or signature")]
    MissingProof,

    #[error("payment verification failed")]
    VerificationFailed,

    #[error("payment verified but no user is signed in")]
    SessionLost,

    #[error("cart holds an unreadable product id: {0:?}")]
    CorruptCart(String),

    #[error("invalid amount: {0}")]
    Amount(#[from] MoneyError),

    #[error("payment gateway error: {0}")]
    Gateway(#[source] GatewayError),

    #[error("failed to record order: {0}")]
    Persist(#[source] RepositoryError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl From<GatewayError> for CheckoutError {
    fn from(e: GatewayError) -> Self {
        match e {
            GatewayError::SignatureMismatch => Self::VerificationFailed,
            other => Self::Gateway(other),
        }
    }
}

impl ServiceError for CheckoutError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingProof | Self::Amount(_) => ErrorKind::Validation,
            Self::EmptyCart | Self::SessionLost => ErrorKind::State,
            Self::VerificationFailed | Self::Gateway(_) | Self::Session(_) => {
                ErrorKind::ExternalService
            }
            Self::CorruptCart(_) | Self::Persist(_) => ErrorKind::Integrity,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::EmptyCart => "empty_cart",
            Self::MissingProof => "payment_incomplete",
            Self::VerificationFailed => "payment_verification_failed",
            Self::SessionLost => "session_lost",
            Self::Amount(_) => "invalid_amount",
            Self::Gateway(_) => "gateway_unavailable",
            Self::CorruptCart(_) | Self::Persist(_) | Self::Session(_) => "order_not_saved",
        }
    }
}

/// A gateway order ready for the payment widget.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayOrder {
    pub gateway_order_id: String,
    /// Amount sent to the gateway, in minor units.
    pub amount_minor: i64,
    pub currency: Currency,
    /// Display total in major units.
    pub total: Decimal,
    /// The cart this order was priced from.
    pub cart: CartView,
}

/// A payment proof whose signature has been checked by the gateway.
///
/// Only [`CheckoutService::confirm`] constructs this.
#[derive(Debug, Clone)]
pub struct VerifiedPayment {
    proof: PaymentProof,
}

impl VerifiedPayment {
    #[must_use]
    pub fn payment_id(&self) -> &str {
        &self.proof.payment_id
    }

    #[must_use]
    pub fn gateway_order_id(&self) -> &str {
        &self.proof.gateway_order_id
    }
}

/// Outcome of a successful persist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub order_id: OrderId,
    pub payment_id: String,
    pub gateway_order_id: String,
    pub total: Decimal,
    pub item_count: usize,
    /// The callback had already been processed; no new order was written.
    pub replayed: bool,
}

/// Checkout orchestration for one request.
pub struct CheckoutService<'a> {
    gateway: &'a dyn PaymentGateway,
    orders: &'a dyn OrderStore,
    currency: Currency,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        gateway: &'a dyn PaymentGateway,
        orders: &'a dyn OrderStore,
        currency: Currency,
    ) -> Self {
        Self {
            gateway,
            orders,
            currency,
        }
    }

    /// Create a gateway order for the current cart total. The returned order
    /// carries the cart view it was priced from.
    ///
    /// Nothing is written to the order store and the cart is left as is.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` without calling the gateway if the
    /// cart is empty; `CheckoutError::Gateway` if the gateway call fails.
    #[instrument(skip(self, session))]
    pub async fn initiate(&self, session: &SessionContext) -> Result<GatewayOrder, CheckoutError> {
        let cart = session.cart().await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let total = cart.grand_total();
        let amount_minor = Money::new(total, self.currency)?.to_minor_units()?;

        let reference = self
            .gateway
            .create_order(CreateOrderRequest {
                amount: amount_minor,
                currency: self.currency,
                auto_capture: true,
                receipt: None,
            })
            .await?;

        tracing::info!(
            gateway_order_id = %reference.id,
            amount_minor,
            lines = cart.len(),
            "Checkout initiated"
        );

        Ok(GatewayOrder {
            gateway_order_id: reference.id,
            amount_minor,
            currency: self.currency,
            total,
            cart: cart.view(),
        })
    }

    /// Check the gateway callback.
    ///
    /// `proof` is `None` when any of payment id, order id or signature was
    /// missing from the callback; see [`PaymentProof::from_callback`].
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::MissingProof` for an incomplete callback and
    /// `CheckoutError::VerificationFailed` for a signature that does not match.
    #[instrument(skip(self, proof))]
    pub fn confirm(&self, proof: Option<PaymentProof>) -> Result<VerifiedPayment, CheckoutError> {
        let proof = proof.ok_or(CheckoutError::MissingProof)?;
        if let Err(e) = self.gateway.verify_signature(&proof) {
            tracing::warn!(
                gateway_order_id = %proof.gateway_order_id,
                error = %e,
                "Payment verification failed"
            );
            return Err(e.into());
        }
        Ok(VerifiedPayment { proof })
    }

    /// Record the verified payment as a paid order built from the current
    /// cart, then empty the cart.
    ///
    /// `address` falls back to "Not Provided" when missing or blank.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::SessionLost` if nobody is signed in,
    /// `CheckoutError::EmptyCart` if there is nothing to record, and
    /// `CheckoutError::Persist` if the order transaction fails. In every error
    /// case the cart is left untouched and no order rows exist.
    #[instrument(skip(self, session, payment, address), fields(gateway_order_id = %payment.gateway_order_id()))]
    pub async fn persist(
        &self,
        session: &SessionContext,
        payment: VerifiedPayment,
        address: Option<&str>,
    ) -> Result<Receipt, CheckoutError> {
        let Some(user) = session.current_user().await? else {
            tracing::warn!(
                payment_id = %payment.payment_id(),
                "Verified payment has no signed-in user to attribute it to"
            );
            return Err(CheckoutError::SessionLost);
        };
        let proof = payment.proof;

        if let Some(existing) = self
            .orders
            .find_by_gateway_order_id(&proof.gateway_order_id)
            .await
            .map_err(CheckoutError::Persist)?
        {
            return self.replayed(existing, &user).await;
        }

        let cart = session.cart().await?;
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let items = cart
            .entries()
            .map(|(key, entry)| {
                let product_id: ProductId = key
                    .parse()
                    .map_err(|_| CheckoutError::CorruptCart(key.to_owned()))?;
                Ok(NewOrderItem {
                    product_id,
                    product_name: entry.name.clone(),
                    qty: entry.qty.get(),
                    unit_price: entry.unit_price,
                })
            })
            .collect::<Result<Vec<_>, CheckoutError>>()?;
        let item_count = items.len();

        let address = address
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .unwrap_or(DEFAULT_ADDRESS)
            .to_owned();

        let new_order = NewOrder {
            user_id: user.id,
            total_amount: cart.grand_total(),
            payment_id: proof.payment_id.clone(),
            gateway_order_id: proof.gateway_order_id.clone(),
            status: OrderStatus::Paid,
            address,
            items,
        };

        let order = match self.orders.create_order(new_order).await {
            Ok(order) => order,
            Err(RepositoryError::Conflict(_)) => {
                // Lost a race with a concurrent callback for the same order.
                let existing = self
                    .orders
                    .find_by_gateway_order_id(&proof.gateway_order_id)
                    .await
                    .map_err(CheckoutError::Persist)?
                    .ok_or(CheckoutError::Persist(RepositoryError::NotFound))?;
                return self.replayed(existing, &user).await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Order transaction rolled back");
                return Err(CheckoutError::Persist(e));
            }
        };

        session.clear_cart().await?;

        tracing::info!(order_id = %order.id, user_id = %user.id, items = item_count, "Order placed");

        Ok(Receipt {
            order_id: order.id,
            payment_id: proof.payment_id,
            gateway_order_id: proof.gateway_order_id,
            total: order.total_amount,
            item_count,
            replayed: false,
        })
    }

    /// Receipt for an order already recorded under the callback's gateway
    /// order id. The current cart is not touched.
    async fn replayed(&self, order: Order, user: &CurrentUser) -> Result<Receipt, CheckoutError> {
        if order.user_id != user.id {
            tracing::warn!(
                order_id = %order.id,
                user_id = %user.id,
                "Payment callback replayed by a different user"
            );
            return Err(CheckoutError::VerificationFailed);
        }

        let item_count = self
            .orders
            .items(order.id)
            .await
            .map_err(CheckoutError::Persist)?
            .len();
        tracing::info!(order_id = %order.id, "Payment callback already processed");

        Ok(Receipt {
            order_id: order.id,
            payment_id: order.payment_id.unwrap_or_default(),
            gateway_order_id: order.gateway_order_id.unwrap_or_default(),
            total: order.total_amount,
            item_count,
            replayed: true,
        })
    }
}
