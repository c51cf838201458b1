//! Database operations for storefront `PostgreSQL`.
//!
//! # Schema: `storefront`
//!
//! ## Tables
//!
//! - `users` - Registered shoppers (argon2 password hashes)
//! - `products` - Catalog
//! - `orders` - Paid orders, unique on `gateway_order_id`
//! - `order_items` - Order lines with name and price snapshots
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Store traits
//!
//! Services talk to persistence through [`UserStore`], [`CatalogStore`] and
//! [`OrderStore`]. The `PostgreSQL` repositories in this module implement them
//! for production; [`memory::MemoryStore`] implements them in-process for tests
//! (feature `test-support`).
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p clothaura-cli -- migrate
//! ```

pub mod orders;
pub mod products;
pub mod users;

#[cfg(any(test, feature = "test-support"))]
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use clothaura_core::{Email, OrderId, PasswordHash, ProductId, UserId};

use crate::models::{
    NewOrder, NewProduct, NewUser, Order, OrderItem, OrderWithItems, Product, User,
};

pub use orders::OrderRepository;
pub use products::ProductRepository;
pub use users::UserRepository;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),

    /// A referenced row (e.g., an order line's product) does not exist.
    #[error("missing reference: {0}")]
    MissingReference(String),
}

impl RepositoryError {
    /// Map unique and foreign-key violations to their typed variants.
    pub(crate) fn from_write(e: sqlx::Error, conflict: &str) -> Self {
        if let sqlx::Error::Database(ref db_err) = e {
            if db_err.is_unique_violation() {
                return Self::Conflict(conflict.to_owned());
            }
            if db_err.is_foreign_key_violation() {
                return Self::MissingReference(
                    db_err.constraint().unwrap_or("foreign key").to_owned(),
                );
            }
        }
        Self::Database(e)
    }
}

/// Identity store.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get a user by their ID.
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError>;

    /// Whether a user with exactly this email exists.
    async fn email_exists(&self, email: &Email) -> Result<bool, RepositoryError>;

    /// Get a user and their stored password hash for login.
    async fn get_credentials(
        &self,
        email: &Email,
    ) -> Result<Option<(User, PasswordHash)>, RepositoryError>;

    /// Create a user. Fails with `Conflict` if the email is taken.
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Number of registered users.
    async fn count(&self) -> Result<i64, RepositoryError>;
}

/// Catalog store.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// All products, newest first.
    async fn list(&self) -> Result<Vec<Product>, RepositoryError>;

    /// Get a product by ID.
    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Up to `limit` other products in the same category, newest first.
    async fn related(
        &self,
        product: &Product,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError>;

    /// Insert a product.
    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError>;

    /// Number of products.
    async fn count(&self) -> Result<i64, RepositoryError>;
}

/// Order store.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Insert an order and all its lines atomically.
    ///
    /// Fails with `Conflict` if an order already exists for the gateway order
    /// id and with `MissingReference` if a line's product no longer exists.
    /// Either way no rows are written.
    async fn create_order(&self, order: NewOrder) -> Result<Order, RepositoryError>;

    /// Look up the order created for a gateway order id.
    async fn find_by_gateway_order_id(
        &self,
        gateway_order_id: &str,
    ) -> Result<Option<Order>, RepositoryError>;

    /// Lines of one order.
    async fn items(&self, order_id: OrderId) -> Result<Vec<OrderItem>, RepositoryError>;

    /// A user's orders with their lines, newest first.
    async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<OrderWithItems>, RepositoryError>;

    /// Every order, newest first.
    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError>;

    /// Number of orders.
    async fn count(&self) -> Result<i64, RepositoryError>;

    /// Sum of totals over paid, shipped and delivered orders.
    async fn settled_revenue(&self) -> Result<Decimal, RepositoryError>;
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Arguments
///
/// * `database_url` - `PostgreSQL` connection string (wrapped in `SecretString`)
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
