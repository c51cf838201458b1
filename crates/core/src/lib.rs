//! ClothAura Core - Shared domain types.
//!
//! This crate provides the types shared by every ClothAura component:
//! - `storefront` - Public shop (catalog, cart, checkout, accounts)
//! - `cli` - Migrations and catalog seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Enable the `postgres` feature to get `sqlx`
//! encode/decode support for the types that are stored in columns.
//!
//! # Modules
//!
//! - [`types`] - Typed IDs, emails, money, statuses, one-time codes

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
