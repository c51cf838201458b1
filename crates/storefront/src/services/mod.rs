//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Password login and logout
//! - `registration` - Two-step signup gated by an emailed one-time code
//! - `catalog` - Product listing and lookup
//! - `cart` - Session cart mutations
//! - `checkout` - Gateway order creation, payment verification, order persistence
//! - `account` - Profile, order history and dashboard figures
//! - `email` - One-time code delivery over SMTP
//!
//! Services are cheap borrowed views over the stores and collaborators in
//! [`AppState`](crate::state::AppState), built per request. Every operation
//! that touches visitor state takes the caller's
//! [`SessionContext`](crate::session::SessionContext) explicitly.

pub mod account;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod email;
pub mod registration;

use crate::db::RepositoryError;

/// Failure classes shared by every service error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing input.
    Validation,
    /// Unknown product or user.
    NotFound,
    /// The session is not in the state this step needs.
    State,
    /// Gateway, mail server, session store or database unavailable. The
    /// visitor may retry.
    ExternalService,
    /// A multi-row write was rolled back.
    Integrity,
}

impl ErrorKind {
    /// Whether the visitor is sent back to the previous step with a message
    /// rather than shown an error page.
    #[must_use]
    pub const fn is_recoverable(self) -> bool {
        !matches!(self, Self::NotFound)
    }

    /// Whether the failure is ours rather than the visitor's.
    #[must_use]
    pub const fn is_server_side(self) -> bool {
        matches!(self, Self::ExternalService | Self::Integrity)
    }
}

/// Common surface of service errors, used by handlers to pick a response.
pub trait ServiceError: std::error::Error {
    fn kind(&self) -> ErrorKind;

    /// Short machine-readable code carried in `?error=` redirects.
    fn code(&self) -> &'static str;
}

impl ServiceError for RepositoryError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound => ErrorKind::NotFound,
            Self::Conflict(_) | Self::MissingReference(_) | Self::DataCorruption(_) => {
                ErrorKind::Integrity
            }
            Self::Database(_) => ErrorKind::ExternalService,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            _ => "unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_not_found_is_unrecoverable() {
        assert!(!ErrorKind::NotFound.is_recoverable());
        assert!(ErrorKind::Validation.is_recoverable());
        assert!(ErrorKind::State.is_recoverable());
        assert!(ErrorKind::ExternalService.is_recoverable());
        assert!(ErrorKind::Integrity.is_recoverable());
    }

    #[test]
    fn test_repository_error_kinds() {
        assert_eq!(RepositoryError::NotFound.kind(), ErrorKind::NotFound);
        assert_eq!(
            RepositoryError::Conflict("dup".into()).kind(),
            ErrorKind::Integrity
        );
        assert_eq!(
            RepositoryError::Database(sqlx::Error::PoolTimedOut).kind(),
            ErrorKind::ExternalService
        );
    }
}
