//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::StorefrontConfig;
use crate::db::{CatalogStore, OrderRepository, OrderStore, ProductRepository, UserRepository, UserStore};
use crate::gateway::{GatewayError, PaymentGateway, RazorpayGateway};
use crate::services::email::{EmailService, Notifier};
use crate::middleware::SessionLocks;

/// Error assembling the production collaborators.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("payment gateway: {0}")]
    Gateway(#[from] GatewayError),
    #[error("email transport: {0}")]
    Email(#[from] lettre::transport::smtp::Error),
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like stores, collaborators and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: Option<PgPool>,
    users: Arc<dyn UserStore>,
    catalog: Arc<dyn CatalogStore>,
    orders: Arc<dyn OrderStore>,
    gateway: Arc<dyn PaymentGateway>,
    notifier: Arc<dyn Notifier>,
    session_locks: SessionLocks,
}

/// Stores and collaborators for [`AppState::from_parts`].
pub struct Parts {
    pub users: Arc<dyn UserStore>,
    pub catalog: Arc<dyn CatalogStore>,
    pub orders: Arc<dyn OrderStore>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Create the production state: `PostgreSQL` repositories, the Razorpay
    /// client and the SMTP notifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the gateway client or SMTP transport cannot be
    /// built.
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Result<Self, StateError> {
        let gateway = RazorpayGateway::new(&config.payment)?;
        let notifier = EmailService::new(&config.email, config.otp.ttl.num_minutes())?;

        let parts = Parts {
            users: Arc::new(UserRepository::new(pool.clone())),
            catalog: Arc::new(ProductRepository::new(pool.clone())),
            orders: Arc::new(OrderRepository::new(pool.clone())),
            gateway: Arc::new(gateway),
            notifier: Arc::new(notifier),
        };

        Ok(Self::build(config, Some(pool), parts))
    }

    /// Create state from explicit stores and collaborators, with no database
    /// pool. Used by tests.
    #[must_use]
    pub fn from_parts(config: StorefrontConfig, parts: Parts) -> Self {
        Self::build(config, None, parts)
    }

    fn build(config: StorefrontConfig, pool: Option<PgPool>, parts: Parts) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                users: parts.users,
                catalog: parts.catalog,
                orders: parts.orders,
                gateway: parts.gateway,
                notifier: parts.notifier,
                session_locks: SessionLocks::new(),
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Database pool, absent when running on in-memory stores.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.users.as_ref()
    }

    #[must_use]
    pub fn catalog(&self) -> &dyn CatalogStore {
        self.inner.catalog.as_ref()
    }

    #[must_use]
    pub fn orders(&self) -> &dyn OrderStore {
        self.inner.orders.as_ref()
    }

    #[must_use]
    pub fn gateway(&self) -> &dyn PaymentGateway {
        self.inner.gateway.as_ref()
    }

    #[must_use]
    pub fn notifier(&self) -> &dyn Notifier {
        self.inner.notifier.as_ref()
    }

    /// Per-session mutex registry.
    #[must_use]
    pub fn session_locks(&self) -> &SessionLocks {
        &self.inner.session_locks
    }
}
