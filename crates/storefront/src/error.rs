//! Unified error handling with Sentry integration.
//!
//! Handlers have two ways out of a failed service call:
//!
//! - [`redirect_with_error`] sends the visitor back to the previous step with
//!   `?error=<code>` for anything recoverable (bad input, empty cart, gateway
//!   hiccup), which the page renders as a message.
//! - [`AppError`] renders a status page for everything else. Server errors are
//!   captured to Sentry before responding.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use thiserror::Error;

use crate::services::{ErrorKind, ServiceError};

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Convert a service error that has no previous step to return to.
    pub fn from_service<E: ServiceError>(err: &E) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Self::NotFound(err.to_string()),
            ErrorKind::Validation | ErrorKind::State => Self::BadRequest(err.to_string()),
            ErrorKind::ExternalService | ErrorKind::Integrity => Self::Internal(err.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Internal(_) => {
                let event_id = sentry::capture_error(&self);
                tracing::error!(
                    error = %self,
                    sentry_event_id = %event_id,
                    "Request error"
                );
                // Don't expose internal error details to clients
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "Not found").into_response(),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, self.to_string()).into_response(),
        }
    }
}

/// Respond to a failed service call.
///
/// Recoverable errors redirect to `back_to` with the error's code appended as
/// `error=`; server-side ones are also reported to Sentry. Not-found errors
/// render a 404 instead.
pub fn redirect_with_error<E: ServiceError>(back_to: &str, err: &E) -> Response {
    let kind = err.kind();
    if !kind.is_recoverable() {
        tracing::info!(error = %err, "Not found");
        return AppError::from_service(err).into_response();
    }
    redirect_back(back_to, err)
}

/// Redirect to `back_to` with the error's code appended as `error=`, whatever
/// its kind. For forms that report every failure inline.
pub fn redirect_back<E: ServiceError>(back_to: &str, err: &E) -> Response {
    if err.kind().is_server_side() {
        let event_id = sentry::capture_error(err);
        tracing::error!(
            error = %err,
            code = err.code(),
            sentry_event_id = %event_id,
            "Service failure"
        );
    } else {
        tracing::warn!(error = %err, code = err.code(), "Request rejected");
    }

    Redirect::to(&with_query(back_to, "error", err.code())).into_response()
}

/// Append `key=value` to `path`, which may already carry a query string.
///
/// Values are the fixed codes and identifiers this crate generates, so no
/// percent-encoding is applied.
#[must_use]
pub fn with_query(path: &str, key: &str, value: &str) -> String {
    let sep = if path.contains('?') { '&' } else { '?' };
    format!("{path}{sep}{key}={value}")
}

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on logout to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "12")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
