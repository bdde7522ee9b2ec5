//! Database operations for the storefront.
//!
//! # Database: `bazaar`
//!
//! ## Tables
//!
//! - `storefront.product` - Catalog (read-only here, apart from review aggregates)
//! - `storefront.review` - Product reviews, unique per (product, user)
//! - `storefront.user` - Site accounts with argon2 password hashes
//! - `tower_sessions.session` - Tower-sessions storage
//!
//! # Repositories
//!
//! Handlers depend on the [`CatalogRepository`], [`ReviewRepository`] and
//! [`UserRepository`] traits. The `PostgreSQL` implementations live in
//! [`products`], [`reviews`] and [`users`].
//!
//! # Migrations
//!
//! Migrations are stored in `crates/storefront/migrations/` and run via:
//! ```bash
//! cargo run -p bazaar-cli -- migrate
//! ```

pub mod products;
pub mod reviews;
pub mod users;

#[cfg(test)]
pub mod memory;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use bazaar_core::{Email, Paginated, ProductId, UserId};

use crate::models::{Product, ProductCard, Review, ReviewDetails, ReviewInput, UpsertOutcome, User};

pub use products::PgCatalogRepository;
pub use reviews::PgReviewRepository;
pub use users::PgUserRepository;

/// Errors returned by repository operations.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Constraint violation (e.g., unique email).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Default number of products in a home-page card row.
pub const CARD_LIMIT: u32 = 4;

/// Default number of products returned by a tag listing.
pub const TAG_LIMIT: u32 = 10;

/// Default page size for related products.
pub const RELATED_LIMIT: u32 = 4;

/// Parameters for [`CatalogRepository::related_products_by_category`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedQuery {
    pub category: String,
    /// The product being viewed, which is never part of its own related list.
    pub exclude: ProductId,
    pub limit: u32,
    /// 1-indexed page number.
    pub page: u32,
}

impl RelatedQuery {
    /// Related products for `product`, first page, default page size.
    #[must_use]
    pub fn for_product(product: &Product) -> Self {
        Self {
            category: product.category.clone(),
            exclude: product.id,
            limit: RELATED_LIMIT,
            page: 1,
        }
    }

    #[must_use]
    pub const fn page(mut self, page: u32) -> Self {
        self.page = if page == 0 { 1 } else { page };
        self
    }
}

/// Read access to published catalog products.
///
/// Every query is scoped to `is_published = true`.
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    /// Distinct categories, alphabetically.
    async fn all_categories(&self) -> Result<Vec<String>, RepositoryError>;

    /// Card projections of the newest products carrying `tag`.
    async fn products_for_card(
        &self,
        tag: &str,
        limit: u32,
    ) -> Result<Vec<ProductCard>, RepositoryError>;

    /// The newest products carrying `tag`.
    async fn products_by_tag(&self, tag: &str, limit: u32) -> Result<Vec<Product>, RepositoryError>;

    /// Look up a product by slug.
    ///
    /// Fails with [`RepositoryError::NotFound`] rather than returning `None`.
    async fn product_by_slug(&self, slug: &str) -> Result<Product, RepositoryError>;

    /// Same-category products, best sellers first, excluding the current one.
    async fn related_products_by_category(
        &self,
        query: &RelatedQuery,
    ) -> Result<Paginated<Product>, RepositoryError>;

    /// Verify the backing store is reachable.
    async fn health_check(&self) -> Result<(), RepositoryError>;
}

/// Review storage.
#[async_trait]
pub trait ReviewRepository: Send + Sync {
    /// Number of reviews for a product.
    async fn count_for_product(&self, product_id: ProductId) -> Result<u64, RepositoryError>;

    /// One page of a product's reviews, newest first, with author names.
    async fn page_for_product(
        &self,
        product_id: ProductId,
        page: u32,
        limit: u32,
    ) -> Result<Vec<ReviewDetails>, RepositoryError>;

    /// The review `user_id` wrote for `product_id`, if any.
    async fn find_by_user(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<Option<Review>, RepositoryError>;

    /// Create or replace the user's review of a product and refresh the
    /// product's rating aggregates.
    ///
    /// Fails with [`RepositoryError::NotFound`] if the product does not exist.
    async fn upsert(
        &self,
        user_id: UserId,
        input: &ReviewInput,
    ) -> Result<UpsertOutcome, RepositoryError>;
}

/// Account storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Get a user and their password hash by email.
    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError>;

    /// Create a user.
    ///
    /// Fails with [`RepositoryError::Conflict`] if the email is taken.
    async fn create(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError>;
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

/// Map unique violations to [`RepositoryError::Conflict`].
pub(crate) fn map_unique_violation(e: sqlx::Error, what: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(format!("{what} already exists"));
    }
    RepositoryError::Database(e)
}

/// Convert a non-negative database integer, flagging negative values as corruption.
pub(crate) fn non_negative(value: i32, column: &str) -> Result<u32, RepositoryError> {
    u32::try_from(value)
        .map_err(|_| RepositoryError::DataCorruption(format!("negative {column}: {value}")))
}
