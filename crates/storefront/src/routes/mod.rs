//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                         - Home page
//! GET  /about                    - About page
//! GET  /contact                  - Contact page
//! GET  /health                   - Liveness check
//! GET  /health/ready             - Readiness check (database)
//!
//! # Products
//! GET  /products                 - Product listing
//! GET  /products/{id}            - Product detail with related products
//!
//! # Cart
//! GET  /cart                     - Cart page
//! GET|POST /add-to-cart/{id}     - Add a product (`qty` from query or form, default 1)
//! POST /cart/increase/{id}       - Quantity + 1
//! POST /cart/decrease/{id}       - Quantity - 1, never below 1
//! POST /cart/remove/{id}         - Drop the line
//!
//! # Checkout
//! GET  /checkout                 - Create gateway order, render payment page
//! GET  /payment-success          - Gateway callback: verify, record order
//!
//! # Auth (POSTs rate limited)
//! GET  /register                 - Registration form
//! POST /register                 - Send verification code
//! GET  /verify-otp               - Code entry form
//! POST /verify-otp               - Check code, create account
//! GET  /login                    - Login form
//! POST /login                    - Login action
//! POST /logout                   - Clear the whole session
//!
//! # Account (requires auth)
//! GET  /profile                  - Profile
//! GET  /orders                   - Order history
//! GET  /admin-dashboard          - All orders and shop totals
//! ```

pub mod account;
pub mod auth;
pub mod cart;
pub mod checkout;
pub mod health;
pub mod pages;
pub mod products;

use axum::{
    Router,
    routing::{get, post},
};
use serde::Deserialize;

use crate::middleware::auth_rate_limiter;
use crate::session::SessionContext;
use crate::state::AppState;

// =============================================================================
// Shared Page Data
// =============================================================================

/// Query parameters for error/success display.
#[derive(Debug, Default, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
    pub success: Option<String>,
}

impl MessageQuery {
    /// Text for the `error` code, if any.
    #[must_use]
    pub fn error_message(&self) -> Option<&'static str> {
        self.error.as_deref().map(error_message)
    }

    /// Text for the `success` code, if any.
    #[must_use]
    pub fn success_message(&self) -> Option<&'static str> {
        self.success.as_deref().map(success_message)
    }
}

/// Human-readable text for an `?error=` code.
#[must_use]
pub fn error_message(code: &str) -> &'static str {
    match code {
        "credentials" | "user_not_found" => "Invalid email or password.",
        "invalid_email" => "Please enter a valid email address.",
        "password_too_short" => "Password must be at least 8 characters.",
        "name_required" => "Please enter your name.",
        "email_taken" => "An account with this email already exists.",
        "otp_not_sent" => "We could not send the verification email. Please try again.",
        "no_pending_registration" => "Please fill in the registration form first.",
        "invalid_otp" => "Invalid OTP. Please try again.",
        "otp_expired" => "Your code has expired. Please register again.",
        "otp_locked" => "Too many incorrect codes. Please register again.",
        "unavailable" => "The service is temporarily unavailable. Please try again.",
        "empty_cart" => "Your cart is empty.",
        "cart_unavailable" => "We could not update your cart. Please try again.",
        "payment_incomplete" => "Payment details were incomplete.",
        "payment_verification_failed" => "Payment verification failed.",
        "session_lost" => "Please log in again. Your payment was received; contact us with your payment id.",
        "gateway_unavailable" => "The payment service is unavailable. Please try again shortly.",
        "order_not_saved" => "Your payment was received but we could not record the order. Please contact us.",
        _ => "Something went wrong. Please try again.",
    }
}

fn success_message(code: &str) -> &'static str {
    match code {
        "logged_out" => "You have been logged out.",
        "registered" => "Registration successful.",
        "welcome" => "Welcome back!",
        _ => "Done.",
    }
}

/// Header data shared by every page: who is signed in and how many items are
/// in the cart.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub user_name: Option<String>,
    pub cart_count: u64,
}

impl Nav {
    /// Read header data from the session. Store errors render as an anonymous
    /// visitor with an empty cart.
    pub async fn load(session: &SessionContext) -> Self {
        let user_name = session
            .current_user()
            .await
            .ok()
            .flatten()
            .map(|u| u.name);
        let cart_count = session
            .cart()
            .await
            .map(|c| c.view().item_count())
            .unwrap_or_default();
        Self {
            user_name,
            cart_count,
        }
    }
}

// =============================================================================
// Routers
// =============================================================================

/// Create the auth routes router.
///
/// Form submissions share one per-IP rate limiter.
pub fn auth_routes() -> Router<AppState> {
    let limiter = auth_rate_limiter();

    Router::new()
        .route(
            "/register",
            get(auth::register_page).merge(post(auth::register).layer(limiter.clone())),
        )
        .route(
            "/verify-otp",
            get(auth::verify_page).merge(post(auth::verify).layer(limiter.clone())),
        )
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(limiter)),
        )
        .route("/logout", post(auth::logout))
}

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/add-to-cart/{id}", get(cart::add).post(cart::add))
        .route("/cart", get(cart::show))
        .route("/cart/increase/{id}", post(cart::increase))
        .route("/cart/decrease/{id}", post(cart::decrease))
        .route("/cart/remove/{id}", post(cart::remove))
}

/// Create the account routes router.
pub fn account_routes() -> Router<AppState> {
    Router::new()
        .route("/profile", get(account::profile))
        .route("/orders", get(account::orders))
        .route("/admin-dashboard", get(account::admin_dashboard))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(pages::router())
        .merge(health::router())
        .nest("/products", product_routes())
        .merge(cart_routes())
        .route("/checkout", get(checkout::checkout))
        .route("/payment-success", get(checkout::payment_success))
        .merge(auth_routes())
        .merge(account_routes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_service_code_has_specific_text() {
        let fallback = error_message("no-such-code");
        for code in [
            "credentials",
            "email_taken",
            "invalid_otp",
            "otp_expired",
            "otp_locked",
            "empty_cart",
            "payment_verification_failed",
            "gateway_unavailable",
            "session_lost",
        ] {
            assert_ne!(error_message(code), fallback, "{code}");
        }
    }

    #[test]
    fn test_message_query() {
        let query = MessageQuery {
            error: Some("empty_cart".to_string()),
            success: None,
        };
        assert_eq!(query.error_message(), Some("Your cart is empty."));
        assert_eq!(query.success_message(), None);
    }
}
