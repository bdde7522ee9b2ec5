//! Seed the catalog from a YAML file.
//!
//! ```yaml
//! products:
//!   - slug: trail-runner
//!     name: Trail Runner
//!     category: Shoes
//!     brand: Stride
//!     tags: [featured, new-arrival]
//!     images: [/images/trail-runner.jpg]
//!     price: "89.00"
//!     list_price: "110.00"
//!     count_in_stock: 12
//! ```
//!
//! Products are matched on `slug`: existing rows are updated, review
//! aggregates are left alone.

use std::collections::HashSet;
use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{error, info};

use super::connect;

/// Top level of a catalog file.
#[derive(Debug, Deserialize)]
pub struct CatalogFile {
    pub products: Vec<SeedProduct>,
}

/// One product entry.
#[derive(Debug, Deserialize)]
pub struct SeedProduct {
    pub slug: String,
    pub name: String,
    pub category: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub images: Vec<String>,
    pub price: Decimal,
    pub list_price: Decimal,
    #[serde(default)]
    pub count_in_stock: u32,
    #[serde(default = "published_by_default")]
    pub is_published: bool,
    #[serde(default)]
    pub num_sales: u32,
}

const fn published_by_default() -> bool {
    true
}

/// Check a parsed catalog, returning every problem found.
pub fn validate(catalog: &CatalogFile) -> Vec<String> {
    let mut errors = Vec::new();
    let mut slugs = HashSet::new();

    for (index, product) in catalog.products.iter().enumerate() {
        let label = if product.slug.is_empty() {
            format!("product #{}", index + 1)
        } else {
            product.slug.clone()
        };

        if product.slug.is_empty() {
            errors.push(format!("{label}: slug is required"));
        } else if !product
            .slug
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            errors.push(format!("{label}: slug may only contain a-z, 0-9 and '-'"));
        } else if !slugs.insert(product.slug.as_str()) {
            errors.push(format!("{label}: duplicate slug"));
        }
        if product.name.trim().is_empty() {
            errors.push(format!("{label}: name is required"));
        }
        if product.category.trim().is_empty() {
            errors.push(format!("{label}: category is required"));
        }
        if product.price.is_sign_negative() || product.list_price.is_sign_negative() {
            errors.push(format!("{label}: prices must not be negative"));
        }
        if i32::try_from(product.count_in_stock).is_err() || i32::try_from(product.num_sales).is_err()
        {
            errors.push(format!("{label}: counts are out of range"));
        }
    }

    errors
}

/// Load `file_path` into `storefront.product`.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, fails validation,
/// or the database rejects a row.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading catalog from file");

    // Read and validate before connecting
    let content = tokio::fs::read_to_string(path).await?;
    let catalog: CatalogFile = serde_yaml::from_str(&content)?;
    info!(products = catalog.products.len(), "Parsed catalog");

    let errors = validate(&catalog);
    if !errors.is_empty() {
        error!("Catalog validation failed:");
        for err in &errors {
            error!("  - {err}");
        }
        return Err(format!("{} validation errors found", errors.len()).into());
    }

    let pool = connect().await?;

    let mut inserted = 0_u32;
    let mut updated = 0_u32;
    for product in &catalog.products {
        if upsert_product(&pool, product).await? {
            inserted += 1;
        } else {
            updated += 1;
        }
    }

    info!("Seeding complete!");
    info!("  Products inserted: {inserted}");
    info!("  Products updated: {updated}");
    Ok(())
}

/// Insert or update one product. Returns true when a new row was created.
async fn upsert_product(pool: &PgPool, product: &SeedProduct) -> Result<bool, sqlx::Error> {
    // validated above
    let count_in_stock = i32::try_from(product.count_in_stock).unwrap_or(i32::MAX);
    let num_sales = i32::try_from(product.num_sales).unwrap_or(i32::MAX);

    sqlx::query_scalar::<_, bool>(
        r"
        INSERT INTO storefront.product
            (slug, name, category, brand, description, tags, images,
             price, list_price, count_in_stock, is_published, num_sales)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        ON CONFLICT (slug) DO UPDATE SET
            name = EXCLUDED.name,
            category = EXCLUDED.category,
            brand = EXCLUDED.brand,
            description = EXCLUDED.description,
            tags = EXCLUDED.tags,
            images = EXCLUDED.images,
            price = EXCLUDED.price,
            list_price = EXCLUDED.list_price,
            count_in_stock = EXCLUDED.count_in_stock,
            is_published = EXCLUDED.is_published,
            num_sales = EXCLUDED.num_sales,
            updated_at = NOW()
        RETURNING (xmax = 0)
        ",
    )
    .bind(&product.slug)
    .bind(&product.name)
    .bind(&product.category)
    .bind(&product.brand)
    .bind(&product.description)
    .bind(&product.tags)
    .bind(&product.images)
    .bind(product.price)
    .bind(product.list_price)
    .bind(count_in_stock)
    .bind(product.is_published)
    .bind(num_sales)
    .fetch_one(pool)
    .await
}
