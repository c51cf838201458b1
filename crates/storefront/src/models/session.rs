//! Session-related types.
//!
//! Types stored in the session for authentication state.

use serde::{Deserialize, Serialize};

use clothaura_core::UserId;

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// Display name, shown in the header.
    pub name: String,
}

/// Session keys.
pub mod keys {
    /// Logged-in user's id.
    pub const USER_ID: &str = "user_id";

    /// Logged-in user's display name.
    pub const USER_NAME: &str = "user_name";

    /// Product id to cart entry map.
    pub const CART: &str = "cart";

    /// Registration awaiting its emailed code.
    pub const PENDING_REGISTRATION: &str = "pending_registration";
}
