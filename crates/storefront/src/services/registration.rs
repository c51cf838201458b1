//! Registration with emailed one-time code.
//!
//! ```text
//! start:  validate -> reject taken email -> generate code -> email it
//!         -> store PendingRegistration in session
//! verify: no pending -> NoPendingRegistration
//!         expired    -> Expired (pending discarded)
//!         mismatch   -> InvalidCode, or Locked on the last allowed attempt
//!                       (pending discarded)
//!         match      -> hash password, create user, sign in, discard pending
//! ```

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::instrument;

use clothaura_core::{Email, OtpError};

use crate::config::OtpPolicy;
use crate::db::{RepositoryError, UserStore};
use crate::models::{NewUser, PendingRegistration, User};
use crate::services::auth::{self, AuthError};
use crate::services::email::{self, EmailError, Notifier};
use crate::services::{ErrorKind, ServiceError};
use crate::session::{SessionContext, SessionError};

#[derive(Debug, Error)]
pub enum RegistrationError {
    #[error("name is required")]
    MissingName,

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] clothaura_core::EmailError),

    #[error(transparent)]
    Password(#[from] AuthError),

    #[error("email already registered")]
    DuplicateEmail,

    #[error("no registration awaiting verification")]
    NoPendingRegistration,

    #[error("verification code expired")]
    Expired,

    #[error("too many incorrect codes")]
    Locked,

    #[error("incorrect verification code ({attempts_remaining} attempts remaining)")]
    InvalidCode { attempts_remaining: u32 },

    #[error("failed to send verification code: {0}")]
    Delivery(#[source] EmailError),

    #[error("failed to generate verification code: {0}")]
    Code(#[from] OtpError),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ServiceError for RegistrationError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingName
            | Self::InvalidEmail(_)
            | Self::DuplicateEmail
            | Self::InvalidCode { .. } => ErrorKind::Validation,
            Self::Password(e) => e.kind(),
            Self::NoPendingRegistration | Self::Expired | Self::Locked => ErrorKind::State,
            Self::Delivery(_) | Self::Code(_) | Self::Session(_) => ErrorKind::ExternalService,
            Self::Repository(e) => e.kind(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::MissingName => "name_required",
            Self::InvalidEmail(_) => "invalid_email",
            Self::Password(e) => e.code(),
            Self::DuplicateEmail => "email_taken",
            Self::NoPendingRegistration => "no_pending_registration",
            Self::Expired => "otp_expired",
            Self::Locked => "otp_locked",
            Self::InvalidCode { .. } => "invalid_otp",
            Self::Delivery(_) => "otp_not_sent",
            Self::Code(_) | Self::Repository(_) | Self::Session(_) => "unavailable",
        }
    }
}

/// Signup form fields.
#[derive(Debug, Clone, Copy)]
pub struct Signup<'f> {
    pub name: &'f str,
    pub email: &'f str,
    pub password: &'f str,
}

/// Two-step registration.
pub struct RegistrationService<'a> {
    users: &'a dyn UserStore,
    notifier: &'a dyn Notifier,
    policy: OtpPolicy,
}

impl<'a> RegistrationService<'a> {
    #[must_use]
    pub const fn new(users: &'a dyn UserStore, notifier: &'a dyn Notifier, policy: OtpPolicy) -> Self {
        Self {
            users,
            notifier,
            policy,
        }
    }

    /// Validate the signup, email a code and hold the registration in the
    /// session until it is confirmed. Replaces any earlier pending
    /// registration.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::DuplicateEmail` if the email is taken; no
    /// code is generated or sent in that case. Returns
    /// `RegistrationError::Delivery` if the email cannot be sent; nothing is
    /// stored in that case.
    pub async fn start(
        &self,
        session: &SessionContext,
        signup: Signup<'_>,
    ) -> Result<Email, RegistrationError> {
        self.start_at(session, signup, Utc::now()).await
    }

    /// [`start`](Self::start) with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start).
    #[instrument(skip(self, session, signup), fields(email = %signup.email))]
    pub async fn start_at(
        &self,
        session: &SessionContext,
        signup: Signup<'_>,
        now: DateTime<Utc>,
    ) -> Result<Email, RegistrationError> {
        let name = signup.name.trim();
        if name.is_empty() {
            return Err(RegistrationError::MissingName);
        }
        let email = Email::parse(signup.email.trim())?;
        auth::validate_password(signup.password)?;

        if self.users.email_exists(&email).await? {
            return Err(RegistrationError::DuplicateEmail);
        }

        let code = email::generate_verification_code()?;
        self.notifier
            .send_otp(&email, code)
            .await
            .map_err(RegistrationError::Delivery)?;

        let pending = PendingRegistration {
            name: name.to_owned(),
            email: email.clone(),
            password: signup.password.to_owned(),
            code,
            issued_at: now,
            expires_at: now + self.policy.ttl,
            failed_attempts: 0,
        };

        session.store_pending_registration(&pending).await?;

        tracing::info!("Verification code issued");
        Ok(email)
    }

    /// Check a submitted code against the pending registration and, on a
    /// match, create the user and sign them in.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationError::InvalidCode` on a mismatch that leaves
    /// attempts, `Locked` on the last allowed mismatch, `Expired` after the
    /// code's lifetime and `NoPendingRegistration` when there is nothing to
    /// verify.
    pub async fn verify(
        &self,
        session: &SessionContext,
        submitted: &str,
    ) -> Result<User, RegistrationError> {
        self.verify_at(session, submitted, Utc::now()).await
    }

    /// [`verify`](Self::verify) with an explicit clock.
    ///
    /// # Errors
    ///
    /// See [`verify`](Self::verify).
    #[instrument(skip(self, session, submitted))]
    pub async fn verify_at(
        &self,
        session: &SessionContext,
        submitted: &str,
        now: DateTime<Utc>,
    ) -> Result<User, RegistrationError> {
        let Some(mut pending) = session.pending_registration().await? else {
            return Err(RegistrationError::NoPendingRegistration);
        };

        if pending.is_expired(now) {
            session.clear_pending_registration().await?;
            return Err(RegistrationError::Expired);
        }

        if !pending.code.matches(submitted) {
            pending.failed_attempts += 1;
            if pending.failed_attempts >= self.policy.max_attempts {
                session.clear_pending_registration().await?;
                tracing::warn!(email = %pending.email, "Verification locked after repeated failures");
                return Err(RegistrationError::Locked);
            }
            session.store_pending_registration(&pending).await?;
            return Err(RegistrationError::InvalidCode {
                attempts_remaining: self.policy.max_attempts - pending.failed_attempts,
            });
        }

        let password_hash = auth::hash_password(&pending.password)?;
        let user = self
            .users
            .create(NewUser {
                name: pending.name,
                email: pending.email,
                password_hash,
                mobile: None,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => RegistrationError::DuplicateEmail,
                other => RegistrationError::Repository(other),
            })?;

        session.clear_pending_registration().await?;
        session.sign_in(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::Duration;
    use clothaura_core::OtpCode;
    use tower_sessions::{MemoryStore as SessionMemoryStore, Session};

    use super::*;
    use crate::db::memory::MemoryStore;

    #[derive(Default)]
    struct Outbox {
        sent: Mutex<Vec<(Email, OtpCode)>>,
    }

    impl Outbox {
        fn last_code(&self) -> OtpCode {
            self.sent.lock().unwrap().last().unwrap().1
        }
    }

    #[async_trait]
    impl Notifier for Outbox {
        async fn send_otp(&self, to: &Email, code: OtpCode) -> Result<(), EmailError> {
            self.sent.lock().unwrap().push((to.clone(), code));
            Ok(())
        }
    }

    fn context() -> SessionContext {
        let session = Session::new(None, Arc::new(SessionMemoryStore::default()), None);
        SessionContext::new(session)
    }

    fn policy() -> OtpPolicy {
        OtpPolicy {
            ttl: Duration::minutes(10),
            max_attempts: 3,
        }
    }

    const SIGNUP: Signup<'static> = Signup {
        name: "Asha",
        email: "asha@example.com",
        password: "a-long-password",
    };

    fn wrong(code: OtpCode) -> String {
        let n = if code.as_u32() == OtpCode::MAX {
            OtpCode::MIN
        } else {
            code.as_u32() + 1
        };
        n.to_string()
    }

    #[tokio::test]
    async fn test_correct_code_registers_and_signs_in() {
        let store = MemoryStore::new();
        let outbox = Outbox::default();
        let session = context();
        let service = RegistrationService::new(&store, &outbox, policy());

        service.start(&session, SIGNUP).await.unwrap();
        let code = outbox.last_code();
        let user = service.verify(&session, &code.to_string()).await.unwrap();

        assert_eq!(UserStore::count(&store).await.unwrap(), 1);
        let (_, hash) = store
            .get_credentials(&Email::parse("asha@example.com").unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_ne!(hash.as_str(), "a-long-password");
        assert!(auth::verify_password("a-long-password", &hash).is_ok());

        assert_eq!(session.current_user().await.unwrap().unwrap().id, user.id);
        assert!(session.pending_registration().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_wrong_code_allows_resubmission() {
        let store = MemoryStore::new();
        let outbox = Outbox::default();
        let session = context();
        let service = RegistrationService::new(&store, &outbox, policy());

        service.start(&session, SIGNUP).await.unwrap();
        let code = outbox.last_code();

        let err = service.verify(&session, &wrong(code)).await.unwrap_err();
        assert!(matches!(
            err,
            RegistrationError::InvalidCode {
                attempts_remaining: 2
            }
        ));
        assert_eq!(UserStore::count(&store).await.unwrap(), 0);

        service.verify(&session, &code.to_string()).await.unwrap();
        assert_eq!(UserStore::count(&store).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_email_sends_nothing() {
        let store = MemoryStore::new();
        let outbox = Outbox::default();
        let service = RegistrationService::new(&store, &outbox, policy());

        let first = context();
        service.start(&first, SIGNUP).await.unwrap();
        service
            .verify(&first, &outbox.last_code().to_string())
            .await
            .unwrap();
        assert_eq!(outbox.sent.lock().unwrap().len(), 1);

        let second = context();
        let err = service.start(&second, SIGNUP).await.unwrap_err();
        assert!(matches!(err, RegistrationError::DuplicateEmail));
        assert_eq!(outbox.sent.lock().unwrap().len(), 1);
        assert!(second.pending_registration().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_expired_code_discards_pending() {
        let store = MemoryStore::new();
        let outbox = Outbox::default();
        let session = context();
        let service = RegistrationService::new(&store, &outbox, policy());
        let issued = Utc::now();

        service.start_at(&session, SIGNUP, issued).await.unwrap();
        let code = outbox.last_code().to_string();

        let err = service
            .verify_at(&session, &code, issued + Duration::minutes(10))
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::Expired));
        assert!(matches!(
            service.verify(&session, &code).await.unwrap_err(),
            RegistrationError::NoPendingRegistration
        ));
        assert_eq!(UserStore::count(&store).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_locked_after_max_attempts() {
        let store = MemoryStore::new();
        let outbox = Outbox::default();
        let session = context();
        let service = RegistrationService::new(&store, &outbox, policy());

        service.start(&session, SIGNUP).await.unwrap();
        let code = outbox.last_code();

        for _ in 0..2 {
            service.verify(&session, &wrong(code)).await.unwrap_err();
        }
        let err = service.verify(&session, &wrong(code)).await.unwrap_err();
        assert!(matches!(err, RegistrationError::Locked));

        let err = service.verify(&session, &code.to_string()).await.unwrap_err();
        assert!(matches!(err, RegistrationError::NoPendingRegistration));
    }

    #[tokio::test]
    async fn test_input_validation() {
        let store = MemoryStore::new();
        let outbox = Outbox::default();
        let session = context();
        let service = RegistrationService::new(&store, &outbox, policy());

        let err = service
            .start(&session, Signup { name: "  ", ..SIGNUP })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::MissingName));

        let err = service
            .start(&session, Signup { email: "not-an-email", ..SIGNUP })
            .await
            .unwrap_err();
        assert!(matches!(err, RegistrationError::InvalidEmail(_)));

        let err = service
            .start(&session, Signup { password: "short", ..SIGNUP })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "password_too_short");
        assert!(outbox.sent.lock().unwrap().is_empty());
    }
}
