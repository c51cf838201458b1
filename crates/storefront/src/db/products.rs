//! Catalog repository for database operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::types::Json;

use clothaura_core::{Discount, ProductId, ProductSize};

use super::{CatalogStore, RepositoryError};
use crate::models::{NewProduct, Product};

/// Internal row type for `PostgreSQL` product queries.
#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i32,
    name: String,
    brand: Option<String>,
    category: Option<String>,
    color: Option<String>,
    material: Option<String>,
    gender: Option<String>,
    short_description: Option<String>,
    long_description: Option<String>,
    features: Option<String>,
    size: Option<ProductSize>,
    price: Decimal,
    discount: i16,
    in_stock: bool,
    stock: i32,
    main_image: Option<String>,
    gallery_images: Json<Vec<String>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let discount = Discount::new(i64::from(row.discount)).map_err(|e| {
            RepositoryError::DataCorruption(format!("product {}: {e}", row.id))
        })?;
        if row.price.is_sign_negative() && !row.price.is_zero() {
            return Err(RepositoryError::DataCorruption(format!(
                "product {}: negative price {}",
                row.id, row.price
            )));
        }

        Ok(Self {
            id: ProductId::new(row.id),
            name: row.name,
            brand: row.brand,
            category: row.category,
            color: row.color,
            material: row.material,
            gender: row.gender,
            short_description: row.short_description,
            long_description: row.long_description,
            features: row.features,
            size: row.size,
            price: row.price,
            discount,
            in_stock: row.in_stock,
            stock: row.stock,
            main_image: row.main_image,
            gallery_images: row.gallery_images.0,
            created_at: row.created_at,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, name, brand, category, color, material, gender, \
     short_description, long_description, features, size, price, discount, \
     in_stock, stock, main_image, gallery_images, created_at";

/// Repository for catalog database operations.
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogStore for ProductRepository {
    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.products ORDER BY id DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn get(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM storefront.products WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn related(
        &self,
        product: &Product,
        limit: i64,
    ) -> Result<Vec<Product>, RepositoryError> {
        // NULL categories match each other.
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS} FROM storefront.products
            WHERE category IS NOT DISTINCT FROM $1 AND id <> $2
            ORDER BY id DESC
            LIMIT $3
            "
        ))
        .bind(product.category.as_deref())
        .bind(product.id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn create(&self, product: NewProduct) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            INSERT INTO storefront.products (
                name, brand, category, color, material, gender,
                short_description, long_description, features, size,
                price, discount, in_stock, stock, main_image, gallery_images
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {PRODUCT_COLUMNS}
            "
        ))
        .bind(&product.name)
        .bind(product.brand.as_deref())
        .bind(product.category.as_deref())
        .bind(product.color.as_deref())
        .bind(product.material.as_deref())
        .bind(product.gender.as_deref())
        .bind(product.short_description.as_deref())
        .bind(product.long_description.as_deref())
        .bind(product.features.as_deref())
        .bind(product.size)
        .bind(product.price)
        .bind(i16::from(product.discount.percent()))
        .bind(product.in_stock)
        .bind(product.stock)
        .bind(product.main_image.as_deref())
        .bind(Json(&product.gallery_images))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RepositoryError::from_write(e, "product already exists"))?;

        row.try_into()
    }

    async fn count(&self) -> Result<i64, RepositoryError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM storefront.products")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
