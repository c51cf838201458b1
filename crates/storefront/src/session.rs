//! Typed access to per-visitor session state.
//!
//! [`SessionContext`] wraps a `tower_sessions::Session` and is passed
//! explicitly to every cart, checkout, registration and auth operation. Each
//! session key has exactly one typed accessor here.
//!
//! Overlapping requests for the same session are serialised by
//! [`session_lock_middleware`](crate::middleware::session_lock_middleware)
//! before they reach the session layer, so the accessors here read and write
//! without further locking.

use axum::extract::FromRequestParts;
use axum::http::StatusCode;
use axum::http::request::Parts;
use thiserror::Error;
use tower_sessions::Session;

use clothaura_core::UserId;

use crate::models::session::keys;
use crate::models::{Cart, CurrentUser, PendingRegistration, User};

/// Session storage failure.
#[derive(Debug, Error)]
#[error("session store error: {0}")]
pub struct SessionError(#[from] tower_sessions::session::Error);

/// Explicit, typed view of one visitor's session.
#[derive(Clone)]
pub struct SessionContext {
    session: Session,
}

impl SessionContext {
    #[must_use]
    pub const fn new(session: Session) -> Self {
        Self { session }
    }

    // -------------------------------------------------------------------------
    // Authentication
    // -------------------------------------------------------------------------

    /// The signed-in user, if any.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store read fails.
    pub async fn current_user(&self) -> Result<Option<CurrentUser>, SessionError> {
        let Some(id) = self.session.get::<UserId>(keys::USER_ID).await? else {
            return Ok(None);
        };
        let name = self
            .session
            .get::<String>(keys::USER_NAME)
            .await?
            .unwrap_or_default();
        Ok(Some(CurrentUser { id, name }))
    }

    /// Bind the session to `user`, issuing a new session id.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store write fails.
    pub async fn sign_in(&self, user: &User) -> Result<(), SessionError> {
        self.session.cycle_id().await?;
        self.session.insert(keys::USER_ID, user.id).await?;
        self.session.insert(keys::USER_NAME, &user.name).await?;
        Ok(())
    }

    /// Drop everything in the session: identity, cart and any pending
    /// registration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store delete fails.
    pub async fn flush(&self) -> Result<(), SessionError> {
        self.session.flush().await?;
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Cart
    // -------------------------------------------------------------------------

    /// The session's cart, empty if none has been stored.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store read fails or the stored cart does
    /// not deserialize.
    pub async fn cart(&self) -> Result<Cart, SessionError> {
        Ok(self
            .session
            .get::<Cart>(keys::CART)
            .await?
            .unwrap_or_default())
    }

    /// Replace the stored cart.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store write fails.
    pub async fn store_cart(&self, cart: &Cart) -> Result<(), SessionError> {
        self.session.insert(keys::CART, cart).await?;
        Ok(())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store write fails.
    pub async fn clear_cart(&self) -> Result<(), SessionError> {
        self.store_cart(&Cart::new()).await
    }

    // -------------------------------------------------------------------------
    // Pending registration
    // -------------------------------------------------------------------------

    /// Registration awaiting its emailed code.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store read fails.
    pub async fn pending_registration(&self) -> Result<Option<PendingRegistration>, SessionError> {
        Ok(self
            .session
            .get::<PendingRegistration>(keys::PENDING_REGISTRATION)
            .await?)
    }

    /// Store (or replace) the pending registration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store write fails.
    pub async fn store_pending_registration(
        &self,
        pending: &PendingRegistration,
    ) -> Result<(), SessionError> {
        self.session
            .insert(keys::PENDING_REGISTRATION, pending)
            .await?;
        Ok(())
    }

    /// Discard the pending registration.
    ///
    /// # Errors
    ///
    /// Returns `SessionError` if the store write fails.
    pub async fn clear_pending_registration(&self) -> Result<(), SessionError> {
        self.session
            .remove::<PendingRegistration>(keys::PENDING_REGISTRATION)
            .await?;
        Ok(())
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, &'static str);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        Ok(Self::new(session))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use clothaura_core::Email;
    use tower_sessions::MemoryStore;

    use super::*;

    fn context() -> SessionContext {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        SessionContext::new(session)
    }

    fn user() -> User {
        User {
            id: UserId::new(4),
            name: "Asha".to_string(),
            email: Email::parse("asha@example.com").unwrap(),
            mobile: None,
            profile_image: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_sign_in_sets_identity_keys() {
        let ctx = context();
        assert!(ctx.current_user().await.unwrap().is_none());

        ctx.sign_in(&user()).await.unwrap();
        let current = ctx.current_user().await.unwrap().unwrap();
        assert_eq!(current.id, UserId::new(4));
        assert_eq!(current.name, "Asha");
    }

    #[tokio::test]
    async fn test_empty_cart_by_default_and_flush_clears() {
        let ctx = context();
        assert!(ctx.cart().await.unwrap().is_empty());

        ctx.sign_in(&user()).await.unwrap();
        ctx.flush().await.unwrap();
        assert!(ctx.current_user().await.unwrap().is_none());
    }
}
