//! Checkout route handlers.
//!
//! `/checkout` creates a gateway order for the cart and renders the payment
//! page; the gateway's browser widget then redirects to `/payment-success`
//! with the payment proof in the query string.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::error::{add_breadcrumb, redirect_with_error};
use crate::filters;
use crate::gateway::PaymentProof;
use crate::middleware::OptionalAuth;
use crate::routes::Nav;
use crate::services::checkout::{CheckoutError, CheckoutService, GatewayOrder, Receipt};
use crate::session::SessionContext;
use crate::state::AppState;

/// Query parameters the payment widget appends to the success URL.
#[derive(Debug, Default, Deserialize)]
pub struct PaymentCallbackQuery {
    pub payment_id: Option<String>,
    pub order_id: Option<String>,
    pub signature: Option<String>,
    pub address: Option<String>,
}

/// Payment page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/checkout.html")]
pub struct CheckoutTemplate {
    pub nav: Nav,
    /// Gateway order, with the cart it was priced from.
    pub order: GatewayOrder,
    /// Public gateway key for the browser widget.
    pub key_id: String,
    pub user_name: String,
    pub user_email: String,
}

/// Order confirmation template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout/payment_success.html")]
pub struct PaymentSuccessTemplate {
    pub nav: Nav,
    pub receipt: Receipt,
}

/// Create a gateway order for the current cart and render the payment page.
///
/// Signed-in shoppers get their name and email prefilled in the widget.
#[instrument(skip(state, session, user))]
pub async fn checkout(
    State(state): State<AppState>,
    session: SessionContext,
    OptionalAuth(user): OptionalAuth,
) -> Response {
    let service = CheckoutService::new(
        state.gateway(),
        state.orders(),
        state.config().payment.currency,
    );

    let order = match service.initiate(&session).await {
        Ok(order) => order,
        Err(e) => return redirect_with_error("/cart", &e),
    };

    let (user_name, user_email) = match user {
        Some(current) => {
            let email = match state.users().get_by_id(current.id).await {
                Ok(found) => found.map(|u| u.email.into_inner()).unwrap_or_default(),
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to load checkout prefill");
                    String::new()
                }
            };
            (current.name, email)
        }
        None => (String::new(), String::new()),
    };

    CheckoutTemplate {
        nav: Nav::load(&session).await,
        order,
        key_id: state.config().payment.key_id.clone(),
        user_name,
        user_email,
    }
    .into_response()
}

/// Verify the gateway callback, record the order and show the receipt.
///
/// Incomplete or forged proofs go back to checkout; a lost login goes to the
/// login page.
#[instrument(skip(state, session, query), fields(gateway_order_id = ?query.order_id))]
pub async fn payment_success(
    State(state): State<AppState>,
    session: SessionContext,
    Query(query): Query<PaymentCallbackQuery>,
) -> Response {
    let service = CheckoutService::new(
        state.gateway(),
        state.orders(),
        state.config().payment.currency,
    );

    let proof = PaymentProof::from_callback(query.payment_id, query.order_id, query.signature);
    let payment = match service.confirm(proof) {
        Ok(payment) => payment,
        Err(e) => return redirect_with_error("/checkout", &e),
    };

    match service
        .persist(&session, payment, query.address.as_deref())
        .await
    {
        Ok(receipt) => {
            let order_id = receipt.order_id.to_string();
            add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order_id.as_str())]));
            PaymentSuccessTemplate {
                nav: Nav::load(&session).await,
                receipt,
            }
            .into_response()
        }
        Err(e @ CheckoutError::SessionLost) => redirect_with_error("/login", &e),
        Err(e) => redirect_with_error("/cart", &e),
    }
}
