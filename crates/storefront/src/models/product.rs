//! Catalog product types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use bazaar_core::{Price, ProductId, RatingDistribution};

/// A catalog product.
///
/// Products are maintained by catalog tooling; the storefront only reads them,
/// apart from the review aggregates which are recomputed on every review write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub slug: String,
    pub name: String,
    pub category: String,
    pub brand: String,
    pub description: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub price: Decimal,
    pub list_price: Decimal,
    pub count_in_stock: u32,
    pub is_published: bool,
    pub avg_rating: f64,
    pub num_reviews: u32,
    pub rating_distribution: RatingDistribution,
    pub num_sales: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Storefront path of the product page.
    #[must_use]
    pub fn href(&self) -> String {
        product_href(&self.slug)
    }

    /// First image, used for cards and cart lines.
    #[must_use]
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    #[must_use]
    pub const fn price(&self) -> Price {
        Price::usd(self.price)
    }

    /// List price, shown struck through when above the selling price.
    #[must_use]
    pub fn compare_at_price(&self) -> Option<Price> {
        (self.list_price > self.price).then(|| Price::usd(self.list_price))
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.count_in_stock > 0
    }
}

/// Storefront path for a product slug.
#[must_use]
pub fn product_href(slug: &str) -> String {
    format!("/product/{slug}")
}

/// Narrow product projection used by home-page card rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCard {
    pub name: String,
    pub href: String,
    pub image: Option<String>,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            href: product.href(),
            image: product.primary_image().map(str::to_owned),
        }
    }
}
