//! Seed the catalog from a YAML file.
//!
//! The file holds a list of products in the same shape the storefront accepts
//! for new products:
//!
//! ```yaml
//! - name: Linen Shirt
//!   category: Shirts
//!   size: M
//!   price: "1299.00"
//!   discount: 10
//!   stock: 12
//!   gallery_images: []
//! ```

use std::path::Path;

use tracing::{error, info};

use clothaura_storefront::db::{self, CatalogStore, ProductRepository};
use clothaura_storefront::models::NewProduct;

/// Check every entry before anything is written.
///
/// Returns one message per problem found.
fn validate(products: &[NewProduct]) -> Vec<String> {
    let mut errors = Vec::new();

    for (index, product) in products.iter().enumerate() {
        let label = format!("entry {} ({})", index + 1, product.name);
        if product.name.trim().is_empty() {
            errors.push(format!("entry {}: name is empty", index + 1));
        }
        if product.price.is_sign_negative() && !product.price.is_zero() {
            errors.push(format!("{label}: price is negative"));
        }
        if product.stock < 0 {
            errors.push(format!("{label}: stock is negative"));
        }
    }

    errors
}

/// Insert every product in `file_path` into the catalog.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, any entry is
/// invalid, or an insert fails.
pub async fn products(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading products from file");

    // Parse and validate before connecting to the database
    let content = tokio::fs::read_to_string(path).await?;
    let products: Vec<NewProduct> = serde_yaml::from_str(&content)?;

    let errors = validate(&products);
    if !errors.is_empty() {
        error!("Product file validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let database_url = super::database_url()
        .ok_or("STOREFRONT_DATABASE_URL (or DATABASE_URL) not set")?;
    let pool = db::create_pool(&database_url).await?;
    info!("Connected to database");

    let repo = ProductRepository::new(pool);
    let total = products.len();
    for product in products {
        let created = repo.create(product).await?;
        info!(product_id = %created.id, name = %created.name, "Created product");
    }

    info!(total, "Seeding complete");
    Ok(())
}
