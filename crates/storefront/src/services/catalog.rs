//! Product listing and lookup.

use thiserror::Error;

use clothaura_core::ProductId;

use crate::db::{CatalogStore, RepositoryError};
use crate::models::Product;
use crate::services::{ErrorKind, ServiceError};

/// Number of related products shown on a product page.
pub const RELATED_LIMIT: i64 = 4;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("product {0} not found")]
    NotFound(ProductId),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError for CatalogError {
    fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Repository(e) => e.kind(),
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Repository(e) => e.code(),
        }
    }
}

/// Read-only catalog access.
pub struct CatalogService<'a> {
    catalog: &'a dyn CatalogStore,
}

impl<'a> CatalogService<'a> {
    #[must_use]
    pub const fn new(catalog: &'a dyn CatalogStore) -> Self {
        Self { catalog }
    }

    /// All products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Repository` if the query fails.
    pub async fn list(&self) -> Result<Vec<Product>, CatalogError> {
        Ok(self.catalog.list().await?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this id.
    pub async fn get(&self, id: ProductId) -> Result<Product, CatalogError> {
        self.catalog
            .get(id)
            .await?
            .ok_or(CatalogError::NotFound(id))
    }

    /// A product and up to [`RELATED_LIMIT`] others from its category.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no product has this id.
    pub async fn detail(&self, id: ProductId) -> Result<(Product, Vec<Product>), CatalogError> {
        let product = self.get(id).await?;
        let related = self.catalog.related(&product, RELATED_LIMIT).await?;
        Ok((product, related))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::models::NewProduct;

    fn new_product(name: &str, category: &str) -> NewProduct {
        serde_yaml::from_str(&format!(
            "name: {name}\ncategory: {category}\nprice: \"100.00\"\nstock: 3\n"
        ))
        .unwrap()
    }

    #[tokio::test]
    async fn test_detail_excludes_self_and_limits_related() {
        let store = MemoryStore::new();
        let mut ids = Vec::new();
        for i in 0..6 {
            let p = CatalogStore::create(&store, new_product(&format!("Tee {i}"), "tops"))
                .await
                .unwrap();
            ids.push(p.id);
        }
        CatalogStore::create(&store, new_product("Jeans", "bottoms"))
            .await
            .unwrap();

        let service = CatalogService::new(&store);
        let (product, related) = service.detail(ids[0]).await.unwrap();

        assert_eq!(product.id, ids[0]);
        assert_eq!(related.len(), 4);
        assert!(related.iter().all(|p| p.id != ids[0]));
        assert!(related.iter().all(|p| p.category.as_deref() == Some("tops")));
        assert_eq!(product.price, Decimal::new(10000, 2));
    }

    #[tokio::test]
    async fn test_list_newest_first_and_missing_product() {
        let store = MemoryStore::new();
        let first = CatalogStore::create(&store, new_product("First", "tops"))
            .await
            .unwrap();
        let second = CatalogStore::create(&store, new_product("Second", "tops"))
            .await
            .unwrap();

        let service = CatalogService::new(&store);
        let listed: Vec<_> = service.list().await.unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(listed, vec![second.id, first.id]);

        let err = service.get(ProductId::new(999)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
