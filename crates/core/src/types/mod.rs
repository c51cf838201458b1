//! Core types for ClothAura.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod credential;
pub mod email;
pub mod id;
pub mod money;
pub mod otp;
pub mod status;

pub use credential::PasswordHash;
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Currency, Discount, Money, MoneyError};
pub use otp::{OtpCode, OtpError};
pub use status::*;
