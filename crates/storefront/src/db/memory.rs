//! In-memory repositories for tests.
//!
//! Mirrors the ordering and filtering rules of the `PostgreSQL` queries and
//! counts calls so tests can assert that a repository was never touched.

#![allow(clippy::unwrap_used)]

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use rust_decimal::Decimal;

use bazaar_core::{
    Email, Paginated, ProductId, Rating, RatingDistribution, ReviewId, UserId, page_offset,
    total_pages,
};

use super::{CatalogRepository, RelatedQuery, RepositoryError, ReviewRepository, UserRepository};
use crate::models::{Product, ProductCard, Review, ReviewDetails, ReviewInput, UpsertOutcome, User};

/// A published product with predictable fields.
///
/// Slug is `product-{id}`; later IDs are newer.
pub fn product_fixture(id: i32) -> Product {
    let created_at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap() + Duration::days(id.into());
    Product {
        id: ProductId::new(id),
        slug: format!("product-{id}"),
        name: format!("Product {id}"),
        category: "Shoes".to_string(),
        brand: "Acme".to_string(),
        description: format!("Description of product {id}"),
        tags: Vec::new(),
        images: vec![format!("/images/p{id}.jpg")],
        price: Decimal::new(1000, 2),
        list_price: Decimal::new(1000, 2),
        count_in_stock: 10,
        is_published: true,
        avg_rating: 0.0,
        num_reviews: 0,
        rating_distribution: RatingDistribution::default(),
        num_sales: 0,
        created_at,
        updated_at: created_at,
    }
}

/// Shared in-memory store implementing every repository trait.
#[derive(Default)]
pub struct MemoryStore {
    pub products: Mutex<Vec<Product>>,
    pub reviews: Mutex<Vec<Review>>,
    users: Mutex<Vec<(User, String)>>,
    /// Number of `page_for_product` calls.
    pub review_page_fetches: AtomicUsize,
    /// Number of `upsert` calls.
    pub upserts: AtomicUsize,
    /// When set, every review operation fails with a database error.
    pub fail_reviews: AtomicBool,
    /// When set, product lookups by slug fail with a database error.
    pub fail_catalog: AtomicBool,
}

impl MemoryStore {
    pub fn with_products(products: Vec<Product>) -> Self {
        Self {
            products: Mutex::new(products),
            ..Self::default()
        }
    }

    /// Register a user directly, bypassing password hashing.
    pub fn add_user(&self, id: i32, name: &str, email: &str, password_hash: &str) -> User {
        let user = User {
            id: UserId::new(id),
            name: name.to_string(),
            email: Email::parse(email).unwrap(),
            created_at: Utc::now(),
        };
        self.users
            .lock()
            .unwrap()
            .push((user.clone(), password_hash.to_string()));
        user
    }

    /// Insert a review written `age_minutes` ago.
    pub fn add_review(&self, product_id: i32, user_id: i32, rating: i64, age_minutes: i64) {
        let mut reviews = self.reviews.lock().unwrap();
        let id = i32::try_from(reviews.len()).unwrap() + 1;
        let created_at = Utc::now() - Duration::minutes(age_minutes);
        reviews.push(Review {
            id: ReviewId::new(id),
            product_id: ProductId::new(product_id),
            user_id: UserId::new(user_id),
            title: format!("Review {id}"),
            comment: format!("Comment {id}"),
            rating: Rating::new(rating).unwrap(),
            is_verified_purchase: true,
            created_at,
            updated_at: created_at,
        });
    }

    pub fn review_page_fetches(&self) -> usize {
        self.review_page_fetches.load(Ordering::SeqCst)
    }

    pub fn upserts(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn product(&self, id: ProductId) -> Option<Product> {
        self.products
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
    }

    fn check_reviews(&self) -> Result<(), RepositoryError> {
        if self.fail_reviews.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }

    fn published(&self) -> Vec<Product> {
        self.products
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.is_published)
            .cloned()
            .collect()
    }

    fn newest_with_tag(&self, tag: &str, limit: u32) -> Vec<Product> {
        let mut products: Vec<Product> = self
            .published()
            .into_iter()
            .filter(|p| p.tags.iter().any(|t| t == tag))
            .collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        products.truncate(limit as usize);
        products
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn all_categories(&self) -> Result<Vec<String>, RepositoryError> {
        let mut categories: Vec<String> = self.published().into_iter().map(|p| p.category).collect();
        categories.sort();
        categories.dedup();
        Ok(categories)
    }

    async fn products_for_card(
        &self,
        tag: &str,
        limit: u32,
    ) -> Result<Vec<ProductCard>, RepositoryError> {
        Ok(self
            .newest_with_tag(tag, limit)
            .iter()
            .map(ProductCard::from)
            .collect())
    }

    async fn products_by_tag(&self, tag: &str, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        Ok(self.newest_with_tag(tag, limit))
    }

    async fn product_by_slug(&self, slug: &str) -> Result<Product, RepositoryError> {
        if self.fail_catalog.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        self.published()
            .into_iter()
            .find(|p| p.slug == slug)
            .ok_or(RepositoryError::NotFound("product"))
    }

    async fn related_products_by_category(
        &self,
        query: &RelatedQuery,
    ) -> Result<Paginated<Product>, RepositoryError> {
        let mut related: Vec<Product> = self
            .published()
            .into_iter()
            .filter(|p| p.category == query.category && p.id != query.exclude)
            .collect();
        related.sort_by(|a, b| b.num_sales.cmp(&a.num_sales).then(a.id.cmp(&b.id)));

        let total = related.len() as u64;
        let offset = usize::try_from(page_offset(query.page, query.limit)).unwrap();
        let data = related
            .into_iter()
            .skip(offset)
            .take(query.limit as usize)
            .collect();

        Ok(Paginated {
            data,
            total_pages: total_pages(total, query.limit),
        })
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}

#[async_trait]
impl ReviewRepository for MemoryStore {
    async fn count_for_product(&self, product_id: ProductId) -> Result<u64, RepositoryError> {
        self.check_reviews()?;
        let reviews = self.reviews.lock().unwrap();
        Ok(reviews.iter().filter(|r| r.product_id == product_id).count() as u64)
    }

    async fn page_for_product(
        &self,
        product_id: ProductId,
        page: u32,
        limit: u32,
    ) -> Result<Vec<ReviewDetails>, RepositoryError> {
        self.review_page_fetches.fetch_add(1, Ordering::SeqCst);
        self.check_reviews()?;

        let mut reviews: Vec<Review> = self
            .reviews
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.product_id == product_id)
            .cloned()
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let users = self.users.lock().unwrap();
        let offset = usize::try_from(page_offset(page, limit)).unwrap();
        Ok(reviews
            .into_iter()
            .skip(offset)
            .take(limit as usize)
            .map(|review| {
                let user_name = users
                    .iter()
                    .find(|(u, _)| u.id == review.user_id)
                    .map(|(u, _)| u.name.clone());
                ReviewDetails { review, user_name }
            })
            .collect())
    }

    async fn find_by_user(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<Option<Review>, RepositoryError> {
        self.check_reviews()?;
        Ok(self
            .reviews
            .lock()
            .unwrap()
            .iter()
            .find(|r| r.product_id == product_id && r.user_id == user_id)
            .cloned())
    }

    async fn upsert(
        &self,
        user_id: UserId,
        input: &ReviewInput,
    ) -> Result<UpsertOutcome, RepositoryError> {
        self.upserts.fetch_add(1, Ordering::SeqCst);
        self.check_reviews()?;
        if self.product(input.product_id).is_none() {
            return Err(RepositoryError::NotFound("product"));
        }

        let now = Utc::now();
        let mut reviews = self.reviews.lock().unwrap();
        let outcome = if let Some(existing) = reviews
            .iter_mut()
            .find(|r| r.product_id == input.product_id && r.user_id == user_id)
        {
            existing.title.clone_from(&input.title);
            existing.comment.clone_from(&input.comment);
            existing.rating = input.rating;
            existing.is_verified_purchase = input.is_verified_purchase;
            existing.updated_at = now;
            UpsertOutcome::Updated
        } else {
            let id = i32::try_from(reviews.len()).unwrap() + 1;
            reviews.push(Review {
                id: ReviewId::new(id),
                product_id: input.product_id,
                user_id,
                title: input.title.clone(),
                comment: input.comment.clone(),
                rating: input.rating,
                is_verified_purchase: input.is_verified_purchase,
                created_at: now,
                updated_at: now,
            });
            UpsertOutcome::Created
        };

        let distribution = RatingDistribution::tally(
            reviews
                .iter()
                .filter(|r| r.product_id == input.product_id)
                .map(|r| r.rating),
        );
        drop(reviews);

        let mut products = self.products.lock().unwrap();
        if let Some(product) = products.iter_mut().find(|p| p.id == input.product_id) {
            product.avg_rating = distribution.average();
            product.num_reviews = distribution.total();
            product.rating_distribution = distribution;
        }

        Ok(outcome)
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn get_with_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        Ok(self
            .users
            .lock()
            .unwrap()
            .iter()
            .find(|(u, _)| &u.email == email)
            .cloned())
    }

    async fn create(
        &self,
        name: &str,
        email: &Email,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|(u, _)| &u.email == email) {
            return Err(RepositoryError::Conflict("email already exists".to_string()));
        }
        let user = User {
            id: UserId::new(i32::try_from(users.len()).unwrap() + 1),
            name: name.to_string(),
            email: email.clone(),
            created_at: Utc::now(),
        };
        users.push((user.clone(), password_hash.to_string()));
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tagged(id: i32, tags: &[&str]) -> Product {
        Product {
            tags: tags.iter().map(|t| (*t).to_string()).collect(),
            ..product_fixture(id)
        }
    }

    #[tokio::test]
    async fn test_card_projection_newest_first_and_published_only() {
        let mut hidden = tagged(3, &["featured"]);
        hidden.is_published = false;
        let store = MemoryStore::with_products(vec![
            tagged(1, &["featured"]),
            tagged(2, &["featured", "new-arrival"]),
            hidden,
            tagged(4, &["best-seller"]),
        ]);

        let cards = store.products_for_card("featured", 4).await.unwrap();
        assert_eq!(
            cards,
            vec![
                ProductCard {
                    name: "Product 2".to_string(),
                    href: "/product/product-2".to_string(),
                    image: Some("/images/p2.jpg".to_string()),
                },
                ProductCard {
                    name: "Product 1".to_string(),
                    href: "/product/product-1".to_string(),
                    image: Some("/images/p1.jpg".to_string()),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_product_by_slug_not_found() {
        let store = MemoryStore::with_products(vec![product_fixture(1)]);
        assert!(store.product_by_slug("product-1").await.is_ok());
        assert!(matches!(
            store.product_by_slug("missing").await,
            Err(RepositoryError::NotFound("product"))
        ));
    }

    #[tokio::test]
    async fn test_related_excludes_current_and_sorts_by_sales() {
        let mut products: Vec<Product> = (1..=6).map(product_fixture).collect();
        for (i, p) in products.iter_mut().enumerate() {
            p.num_sales = u32::try_from(i).unwrap() * 10;
        }
        products[5].category = "Hats".to_string();
        let current = products[0].clone();
        let store = MemoryStore::with_products(products);

        let query = RelatedQuery {
            limit: 2,
            ..RelatedQuery::for_product(&current)
        };
        let first = store.related_products_by_category(&query).await.unwrap();
        assert_eq!(first.total_pages, 2);
        let ids: Vec<i32> = first.data.iter().map(|p| p.id.as_i32()).collect();
        assert_eq!(ids, vec![5, 4]);

        let second = store
            .related_products_by_category(&query.page(2))
            .await
            .unwrap();
        let ids: Vec<i32> = second.data.iter().map(|p| p.id.as_i32()).collect();
        assert_eq!(ids, vec![3, 2]);
    }
}
