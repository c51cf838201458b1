//! Authentication service.
//!
//! Email and password login against argon2 hashes, and logout.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{
        PasswordHash as ParsedHash, PasswordHasher, PasswordVerifier, SaltString,
        rand_core::OsRng,
    },
};
use tracing::instrument;

use clothaura_core::{Email, PasswordHash};

use crate::db::UserStore;
use crate::models::User;
use crate::session::SessionContext;

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Authentication service.
pub struct AuthService<'a> {
    users: &'a dyn UserStore,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(users: &'a dyn UserStore) -> Self {
        Self { users }
    }

    /// Login with email and password and bind the session to the user.
    ///
    /// The session id is cycled on success.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::UserNotFound` if no user has this exact email.
    /// Returns `AuthError::InvalidCredentials` if the password is wrong.
    #[instrument(skip(self, session, password))]
    pub async fn login(
        &self,
        session: &SessionContext,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let email = Email::parse(email.trim())?;

        let (user, password_hash) = self
            .users
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        verify_password(password, &password_hash)?;

        session.sign_in(&user).await?;
        tracing::info!(user_id = %user.id, "User logged in");

        Ok(user)
    }

    /// Clear the whole session: identity, cart and pending registration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Session` if the session store delete fails.
    pub async fn logout(session: &SessionContext) -> Result<(), AuthError> {
        session.flush().await?;
        Ok(())
    }
}

/// Validate password meets requirements.
///
/// # Errors
///
/// Returns `AuthError::WeakPassword` for passwords shorter than
/// [`MIN_PASSWORD_LENGTH`] characters.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }

    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<PasswordHash, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| PasswordHash::new(hash.to_string()))
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
///
/// # Errors
///
/// Returns `AuthError::InvalidCredentials` if the password does not match or
/// the stored hash is unreadable.
pub fn verify_password(password: &str, hash: &PasswordHash) -> Result<(), AuthError> {
    let parsed_hash = ParsedHash::new(hash.as_str()).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::{MemoryStore as SessionMemoryStore, Session};

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::NewUser;

    fn context() -> SessionContext {
        let session = Session::new(None, Arc::new(SessionMemoryStore::default()), None);
        SessionContext::new(session)
    }

    async fn store_with_user(password: &str) -> MemoryStore {
        let store = MemoryStore::new();
        UserStore::create(
            &store,
            NewUser {
                name: "Asha".to_string(),
                email: Email::parse("asha@example.com").unwrap(),
                password_hash: hash_password(password).unwrap(),
                mobile: None,
            },
        )
        .await
        .unwrap();
        store
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }

    #[test]
    fn test_hash_is_not_plaintext_and_verifies() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash.as_str(), "correct horse");
        assert!(verify_password("correct horse", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong horse", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_login_binds_session() {
        let store = store_with_user("hunter2hunter2").await;
        let session = context();

        let user = AuthService::new(&store)
            .login(&session, "asha@example.com", "hunter2hunter2")
            .await
            .unwrap();

        let current = session.current_user().await.unwrap().unwrap();
        assert_eq!(current.id, user.id);
        assert_eq!(current.name, "Asha");
    }

    #[tokio::test]
    async fn test_login_unknown_email_and_wrong_password() {
        let store = store_with_user("hunter2hunter2").await;
        let session = context();
        let auth = AuthService::new(&store);

        assert!(matches!(
            auth.login(&session, "nobody@example.com", "hunter2hunter2")
                .await,
            Err(AuthError::UserNotFound)
        ));
        assert!(matches!(
            auth.login(&session, "asha@example.com", "not-the-password")
                .await,
            Err(AuthError::InvalidCredentials)
        ));
        // Exact match: a differently cased address is a different user.
        assert!(matches!(
            auth.login(&session, "Asha@example.com", "hunter2hunter2")
                .await,
            Err(AuthError::UserNotFound)
        ));
        assert!(session.current_user().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_logout_wipes_everything() {
        let store = store_with_user("hunter2hunter2").await;
        let session = context();
        AuthService::new(&store)
            .login(&session, "asha@example.com", "hunter2hunter2")
            .await
            .unwrap();

        AuthService::logout(&session).await.unwrap();
        assert!(session.current_user().await.unwrap().is_none());
        assert!(session.cart().await.unwrap().is_empty());
    }
}
