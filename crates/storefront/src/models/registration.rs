//! Pending registration held in the session while an emailed code is outstanding.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use clothaura_core::{Email, OtpCode};

/// Registration details captured before the email address is confirmed.
///
/// The raw password is kept here only until the code is confirmed; sessions
/// are stored server-side so it never reaches the client.
#[derive(Clone, Serialize, Deserialize)]
pub struct PendingRegistration {
    pub name: String,
    pub email: Email,
    pub password: String,
    pub code: OtpCode,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub failed_attempts: u32,
}

impl PendingRegistration {
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

impl std::fmt::Debug for PendingRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingRegistration")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("code", &self.code)
            .field("issued_at", &self.issued_at)
            .field("expires_at", &self.expires_at)
            .field("failed_attempts", &self.failed_attempts)
            .finish()
    }
}
