//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;

use clothaura_core::{Discount, ProductId, ProductSize};

/// A catalog entry (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub material: Option<String>,
    pub gender: Option<String>,
    pub short_description: Option<String>,
    pub long_description: Option<String>,
    /// Free-text bullet list, one feature per line.
    pub features: Option<String>,
    pub size: Option<ProductSize>,
    /// List price before discount, never negative.
    pub price: Decimal,
    pub discount: Discount,
    pub in_stock: bool,
    pub stock: i32,
    pub main_image: Option<String>,
    pub gallery_images: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Price after the percentage discount, rounded to cents.
    ///
    /// Computed on every read; this is the value a cart snapshots at add time.
    #[must_use]
    pub fn final_price(&self) -> Decimal {
        self.discount.apply(self.price)
    }

    /// Whether the product is shown as available to buy.
    #[must_use]
    pub const fn is_purchasable(&self) -> bool {
        self.in_stock && self.stock > 0
    }

    /// Feature lines with blanks removed.
    #[must_use]
    pub fn feature_list(&self) -> Vec<&str> {
        self.features
            .as_deref()
            .map(|f| f.lines().map(str::trim).filter(|l| !l.is_empty()).collect())
            .unwrap_or_default()
    }
}

/// Product fields accepted by catalog imports.
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default)]
    pub long_description: Option<String>,
    #[serde(default)]
    pub features: Option<String>,
    #[serde(default)]
    pub size: Option<ProductSize>,
    pub price: Decimal,
    #[serde(default)]
    pub discount: Discount,
    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
    #[serde(default)]
    pub stock: i32,
    #[serde(default)]
    pub main_image: Option<String>,
    #[serde(default)]
    pub gallery_images: Vec<String>,
}

const fn default_in_stock() -> bool {
    true
}
