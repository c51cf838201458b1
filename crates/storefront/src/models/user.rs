//! User domain types.
//!
//! These types represent validated domain objects separate from database row types.

use chrono::{DateTime, Utc};

use clothaura_core::{Email, PasswordHash, UserId};

/// A registered shopper (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Display name entered at registration.
    pub name: String,
    /// Login email, unique across users (exact match).
    pub email: Email,
    /// Optional contact number.
    pub mobile: Option<String>,
    /// Optional avatar URL.
    pub profile_image: Option<String>,
    /// When the user completed registration.
    pub created_at: DateTime<Utc>,
}

/// Fields needed to create a user once their email is verified.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: Email,
    pub password_hash: PasswordHash,
    pub mobile: Option<String>,
}
