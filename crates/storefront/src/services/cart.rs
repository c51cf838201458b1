//! Session cart operations.
//!
//! Every mutation reads the cart, changes it and writes it back; the session
//! layer persists it after the response. Requests for one session reach
//! these operations one at a time (see `middleware::session_lock`).

use thiserror::Error;
use tracing::instrument;

use clothaura_core::ProductId;

use crate::db::{CatalogStore, RepositoryError};
use crate::models::{Cart, CartView, Quantity};
use crate::services::{ErrorKind, ServiceError};
use crate::session::{SessionContext, SessionError};

#[derive(Debug, Error)]
pub enum CartError {
    #[error("product {0} not found")]
    ProductNotFound(ProductId),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Session(#[from] SessionError),
}

impl ServiceError for CartError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::ProductNotFound(_) => ErrorKind::NotFound,
            Self::Repository(e) => e.kind(),
            Self::Session(_) => ErrorKind::ExternalService,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::ProductNotFound(_) => "not_found",
            Self::Repository(_) | Self::Session(_) => "cart_unavailable",
        }
    }
}

/// Cart operations over one visitor's session.
pub struct CartService<'a> {
    catalog: &'a dyn CatalogStore,
}

impl<'a> CartService<'a> {
    #[must_use]
    pub const fn new(catalog: &'a dyn CatalogStore) -> Self {
        Self { catalog }
    }

    /// Add `qty` of a product, snapshotting its current final price if it is
    /// not in the cart yet.
    ///
    /// # Errors
    ///
    /// Returns `CartError::ProductNotFound` if the product does not exist.
    #[instrument(skip(self, session), fields(qty = qty.get()))]
    pub async fn add(
        &self,
        session: &SessionContext,
        product_id: ProductId,
        qty: Quantity,
    ) -> Result<CartView, CartError> {
        let product = self
            .catalog
            .get(product_id)
            .await?
            .ok_or(CartError::ProductNotFound(product_id))?;

        let view = mutate(session, |cart| {
            cart.add(&product, qty);
            true
        })
        .await?;

        tracing::debug!(product = %product.name, "Added to cart");
        Ok(view)
    }

    /// Raise a line's quantity by one. Unknown products are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` if the session store fails.
    pub async fn increase(
        &self,
        session: &SessionContext,
        product_id: ProductId,
    ) -> Result<CartView, CartError> {
        mutate(session, |cart| cart.increase(product_id)).await
    }

    /// Lower a line's quantity by one. A line at one, or an unknown product,
    /// is left alone.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` if the session store fails.
    pub async fn decrease(
        &self,
        session: &SessionContext,
        product_id: ProductId,
    ) -> Result<CartView, CartError> {
        mutate(session, |cart| cart.decrease(product_id)).await
    }

    /// Drop a line. Unknown products are ignored.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` if the session store fails.
    pub async fn remove(
        &self,
        session: &SessionContext,
        product_id: ProductId,
    ) -> Result<CartView, CartError> {
        mutate(session, |cart| cart.remove(product_id)).await
    }

    /// Current cart with line and grand totals.
    ///
    /// # Errors
    ///
    /// Returns `CartError::Session` if the session store fails.
    pub async fn view(session: &SessionContext) -> Result<CartView, CartError> {
        Ok(session.cart().await?.view())
    }
}

/// Apply `change` to the session cart. The cart is written back only when
/// `change` reports a modification.
async fn mutate<F>(session: &SessionContext, change: F) -> Result<CartView, CartError>
where
    F: FnOnce(&mut Cart) -> bool,
{
    let mut cart = session.cart().await?;
    if change(&mut cart) {
        session.store_cart(&cart).await?;
    }
    Ok(cart.view())
}
