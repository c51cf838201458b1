//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;
use crate::services::{ErrorKind, ServiceError};
use crate::session::SessionError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] clothaura_core::EmailError),

    /// Password does not match the stored hash.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No user is registered under the email.
    #[error("user not found")]
    UserNotFound,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Session store error.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}

impl ServiceError for AuthError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEmail(_) | Self::InvalidCredentials | Self::WeakPassword(_) => {
                ErrorKind::Validation
            }
            Self::UserNotFound => ErrorKind::NotFound,
            Self::Repository(e) => e.kind(),
            Self::Session(_) | Self::PasswordHash => ErrorKind::ExternalService,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::InvalidEmail(_) => "invalid_email",
            Self::InvalidCredentials => "credentials",
            Self::UserNotFound => "user_not_found",
            Self::WeakPassword(_) => "password_too_short",
            Self::Repository(_) | Self::Session(_) | Self::PasswordHash => "unavailable",
        }
    }
}
