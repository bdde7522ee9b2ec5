//! Integration tests for Bazaar.
//!
//! These tests run the `PostgreSQL` repositories against a real database.
//!
//! # Running Tests
//!
//! ```bash
//! export BAZAAR_TEST_DATABASE_URL=postgres://localhost/bazaar_test
//! cargo test -p bazaar-integration-tests
//! ```
//!
//! Without `BAZAAR_TEST_DATABASE_URL` (or `DATABASE_URL`) every test returns
//! early. Migrations are applied on connect. Tests share one database, so
//! each one works on uniquely named rows.

#![cfg_attr(not(test), forbid(unsafe_code))]

use secrecy::SecretString;
use sqlx::PgPool;

use bazaar_core::{Email, ProductId, UserId};
use bazaar_storefront::db::{self, PgUserRepository, UserRepository};

/// Connect to the test database and apply migrations.
///
/// Returns `None` when no database is configured.
///
/// # Panics
///
/// Panics if the database is configured but unreachable or migrations fail.
#[allow(clippy::print_stderr, clippy::expect_used)]
pub async fn test_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();

    let Ok(url) = std::env::var("BAZAAR_TEST_DATABASE_URL").or_else(|_| std::env::var("DATABASE_URL"))
    else {
        eprintln!("BAZAAR_TEST_DATABASE_URL not set, skipping database test");
        return None;
    };

    let pool = db::create_pool(&SecretString::from(url))
        .await
        .expect("test database should be reachable");
    sqlx::migrate!("../storefront/migrations")
        .run(&pool)
        .await
        .expect("migrations should apply");
    Some(pool)
}

/// A short random suffix for slugs, categories, tags and emails.
#[must_use]
pub fn unique(prefix: &str) -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &id[..12])
}

/// Product row to insert.
#[derive(Debug, Clone)]
pub struct NewProduct {
    pub slug: String,
    pub category: String,
    pub tags: Vec<String>,
    pub images: Vec<String>,
    pub num_sales: i32,
    pub is_published: bool,
}

impl NewProduct {
    /// A published product with a unique slug in `category`.
    #[must_use]
    pub fn in_category(category: &str) -> Self {
        Self {
            slug: unique("product"),
            category: category.to_string(),
            tags: Vec::new(),
            images: Vec::new(),
            num_sales: 0,
            is_published: true,
        }
    }

    #[must_use]
    pub fn tagged(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    #[must_use]
    pub fn images(mut self, images: &[&str]) -> Self {
        self.images = images.iter().map(ToString::to_string).collect();
        self
    }

    #[must_use]
    pub const fn sales(mut self, num_sales: i32) -> Self {
        self.num_sales = num_sales;
        self
    }

    #[must_use]
    pub const fn unpublished(mut self) -> Self {
        self.is_published = false;
        self
    }
}

/// Insert a product and return its ID.
///
/// # Panics
///
/// Panics if the insert fails.
#[allow(clippy::expect_used)]
pub async fn insert_product(pool: &PgPool, product: &NewProduct) -> ProductId {
    sqlx::query_scalar::<_, ProductId>(
        r"
        INSERT INTO storefront.product
            (slug, name, category, tags, images, price, list_price, count_in_stock,
             is_published, num_sales)
        VALUES ($1, $2, $3, $4, $5, 10.00, 12.50, 5, $6, $7)
        RETURNING id
        ",
    )
    .bind(&product.slug)
    .bind(format!("Name of {}", product.slug))
    .bind(&product.category)
    .bind(&product.tags)
    .bind(&product.images)
    .bind(product.is_published)
    .bind(product.num_sales)
    .fetch_one(pool)
    .await
    .expect("product insert should succeed")
}

/// Create an account with a unique email and return its ID.
///
/// # Panics
///
/// Panics if the insert fails.
#[allow(clippy::expect_used)]
pub async fn insert_user(pool: &PgPool, name: &str) -> UserId {
    let email = Email::parse(&format!("{}@bazaar.test", unique("user"))).expect("valid email");
    PgUserRepository::new(pool.clone())
        .create(name, &email, "not-a-real-hash")
        .await
        .expect("user insert should succeed")
        .id
}
