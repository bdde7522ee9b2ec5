//! Catalog repository backed by `storefront.product`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use tracing::instrument;

use bazaar_core::{Paginated, ProductId, RatingDistribution, page_offset, total_pages};

use super::{CatalogRepository, RelatedQuery, RepositoryError, non_negative};
use crate::models::product::{Product, ProductCard, product_href};

/// Column list matching [`ProductRow`].
pub(crate) const PRODUCT_COLUMNS: &str = "id, slug, name, category, brand, description, tags, \
     images, price, list_price, count_in_stock, is_published, avg_rating, num_reviews, \
     rating_distribution, num_sales, created_at, updated_at";

#[derive(sqlx::FromRow)]
pub(crate) struct ProductRow {
    id: ProductId,
    slug: String,
    name: String,
    category: String,
    brand: String,
    description: String,
    tags: Vec<String>,
    images: Vec<String>,
    price: Decimal,
    list_price: Decimal,
    count_in_stock: i32,
    is_published: bool,
    avg_rating: f64,
    num_reviews: i32,
    rating_distribution: Vec<i32>,
    num_sales: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let buckets: [i32; 5] = row.rating_distribution.try_into().map_err(|v: Vec<i32>| {
            RepositoryError::DataCorruption(format!(
                "product {} has {} rating buckets",
                row.id,
                v.len()
            ))
        })?;
        let mut counts = [0_u32; 5];
        for (slot, value) in counts.iter_mut().zip(buckets) {
            *slot = non_negative(value, "rating bucket")?;
        }

        Ok(Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
            category: row.category,
            brand: row.brand,
            description: row.description,
            tags: row.tags,
            images: row.images,
            price: row.price,
            list_price: row.list_price,
            count_in_stock: non_negative(row.count_in_stock, "count_in_stock")?,
            is_published: row.is_published,
            avg_rating: row.avg_rating,
            num_reviews: non_negative(row.num_reviews, "num_reviews")?,
            rating_distribution: RatingDistribution::from_counts(counts),
            num_sales: non_negative(row.num_sales, "num_sales")?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn into_products(rows: Vec<ProductRow>) -> Result<Vec<Product>, RepositoryError> {
    rows.into_iter().map(Product::try_from).collect()
}

/// `PostgreSQL` catalog repository.
#[derive(Clone)]
pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    #[instrument(skip(self))]
    async fn all_categories(&self) -> Result<Vec<String>, RepositoryError> {
        let categories = sqlx::query_scalar::<_, String>(
            r"
            SELECT DISTINCT category
            FROM storefront.product
            WHERE is_published
            ORDER BY category
            ",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(categories)
    }

    #[instrument(skip(self))]
    async fn products_for_card(
        &self,
        tag: &str,
        limit: u32,
    ) -> Result<Vec<ProductCard>, RepositoryError> {
        let rows = sqlx::query_as::<_, (String, String, Option<String>)>(
            r"
            SELECT name, slug, images[1]
            FROM storefront.product
            WHERE is_published AND $1 = ANY(tags)
            ORDER BY created_at DESC
            LIMIT $2
            ",
        )
        .bind(tag)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, slug, image)| ProductCard {
                name,
                href: product_href(&slug),
                image,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn products_by_tag(&self, tag: &str, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM storefront.product
            WHERE is_published AND $1 = ANY(tags)
            ORDER BY created_at DESC
            LIMIT $2
            "
        ))
        .bind(tag)
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        into_products(rows)
    }

    #[instrument(skip(self))]
    async fn product_by_slug(&self, slug: &str) -> Result<Product, RepositoryError> {
        let row = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM storefront.product
            WHERE is_published AND slug = $1
            "
        ))
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound("product"))?;

        Product::try_from(row)
    }

    #[instrument(skip(self))]
    async fn related_products_by_category(
        &self,
        query: &RelatedQuery,
    ) -> Result<Paginated<Product>, RepositoryError> {
        let total = sqlx::query_scalar::<_, i64>(
            r"
            SELECT COUNT(*)
            FROM storefront.product
            WHERE is_published AND category = $1 AND id <> $2
            ",
        )
        .bind(&query.category)
        .bind(query.exclude)
        .fetch_one(&self.pool)
        .await?;

        let offset = i64::try_from(page_offset(query.page, query.limit)).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, ProductRow>(&format!(
            r"
            SELECT {PRODUCT_COLUMNS}
            FROM storefront.product
            WHERE is_published AND category = $1 AND id <> $2
            ORDER BY num_sales DESC, id
            LIMIT $3 OFFSET $4
            "
        ))
        .bind(&query.category)
        .bind(query.exclude)
        .bind(i64::from(query.limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(Paginated {
            data: into_products(rows)?,
            total_pages: total_pages(u64::try_from(total).unwrap_or(0), query.limit),
        })
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}
