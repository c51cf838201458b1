//! One-time verification codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing an [`OtpCode`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    #[error("verification code must be exactly 6 digits")]
    Format,
    #[error("verification code {0} is outside 100000-999999")]
    OutOfRange(u32),
}

/// A six-digit numeric one-time code in `100000..=999999`.
///
/// ```
/// use clothaura_core::OtpCode;
///
/// let code = OtpCode::from_number(482_913).unwrap();
/// assert!(code.matches("482913"));
/// assert!(!code.matches("482914"));
/// assert!(!code.matches(" 482913"));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct OtpCode(u32);

impl OtpCode {
    pub const MIN: u32 = 100_000;
    pub const MAX: u32 = 999_999;

    /// Build a code from its numeric value.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::OutOfRange`] for values without exactly six digits.
    pub const fn from_number(n: u32) -> Result<Self, OtpError> {
        if n < Self::MIN || n > Self::MAX {
            return Err(OtpError::OutOfRange(n));
        }
        Ok(Self(n))
    }

    /// Parse a code from user input. No trimming or normalisation is applied.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::Format`] unless the input is six ASCII digits.
    pub fn parse(s: &str) -> Result<Self, OtpError> {
        if s.len() != 6 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(OtpError::Format);
        }
        let n = s.parse::<u32>().map_err(|_| OtpError::Format)?;
        Self::from_number(n)
    }

    /// Exact comparison of a submitted string against this code.
    ///
    /// Runs over all six digits regardless of where the first mismatch is.
    #[must_use]
    pub fn matches(&self, submitted: &str) -> bool {
        let expected = self.to_string();
        if submitted.len() != expected.len() {
            return false;
        }
        expected
            .bytes()
            .zip(submitted.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }

    #[must_use]
    pub const fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06}", self.0)
    }
}

impl fmt::Debug for OtpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("OtpCode(******)")
    }
}

impl TryFrom<u32> for OtpCode {
    type Error = OtpError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::from_number(n)
    }
}

impl From<OtpCode> for u32 {
    fn from(code: OtpCode) -> Self {
        code.0
    }
}
