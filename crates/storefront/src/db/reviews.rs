//! Review repository backed by `storefront.review`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::instrument;

use bazaar_core::{ProductId, Rating, RatingDistribution, ReviewId, UserId, page_offset};

use super::{RepositoryError, ReviewRepository};
use crate::models::review::{Review, ReviewDetails, ReviewInput, UpsertOutcome};

const REVIEW_COLUMNS: &str = "r.id, r.product_id, r.user_id, r.title, r.comment, r.rating, \
     r.is_verified_purchase, r.created_at, r.updated_at";

#[derive(sqlx::FromRow)]
struct ReviewRow {
    id: ReviewId,
    product_id: ProductId,
    user_id: UserId,
    title: String,
    comment: String,
    rating: Rating,
    is_verified_purchase: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ReviewRow> for Review {
    fn from(row: ReviewRow) -> Self {
        Self {
            id: row.id,
            product_id: row.product_id,
            user_id: row.user_id,
            title: row.title,
            comment: row.comment,
            rating: row.rating,
            is_verified_purchase: row.is_verified_purchase,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ReviewDetailsRow {
    #[sqlx(flatten)]
    review: ReviewRow,
    user_name: Option<String>,
}

/// `PostgreSQL` review repository.
#[derive(Clone)]
pub struct PgReviewRepository {
    pool: PgPool,
}

impl PgReviewRepository {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PgReviewRepository {
    #[instrument(skip(self))]
    async fn count_for_product(&self, product_id: ProductId) -> Result<u64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM storefront.review WHERE product_id = $1",
        )
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(u64::try_from(count).unwrap_or(0))
    }

    #[instrument(skip(self))]
    async fn page_for_product(
        &self,
        product_id: ProductId,
        page: u32,
        limit: u32,
    ) -> Result<Vec<ReviewDetails>, RepositoryError> {
        let offset = i64::try_from(page_offset(page, limit)).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, ReviewDetailsRow>(&format!(
            r"
            SELECT {REVIEW_COLUMNS}, u.name AS user_name
            FROM storefront.review r
            LEFT JOIN storefront.user u ON u.id = r.user_id
            WHERE r.product_id = $1
            ORDER BY r.created_at DESC, r.id DESC
            LIMIT $2 OFFSET $3
            "
        ))
        .bind(product_id)
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ReviewDetails {
                review: row.review.into(),
                user_name: row.user_name,
            })
            .collect())
    }

    #[instrument(skip(self))]
    async fn find_by_user(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<Option<Review>, RepositoryError> {
        let row = sqlx::query_as::<_, ReviewRow>(&format!(
            r"
            SELECT {REVIEW_COLUMNS}
            FROM storefront.review r
            WHERE r.product_id = $1 AND r.user_id = $2
            "
        ))
        .bind(product_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Review::from))
    }

    #[instrument(skip(self, input), fields(product_id = %input.product_id))]
    async fn upsert(
        &self,
        user_id: UserId,
        input: &ReviewInput,
    ) -> Result<UpsertOutcome, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        // Lock the product row: concurrent upserts recompute aggregates in turn
        sqlx::query_scalar::<_, i32>("SELECT id FROM storefront.product WHERE id = $1 FOR UPDATE")
            .bind(input.product_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or(RepositoryError::NotFound("product"))?;

        // xmax is zero only for freshly inserted rows
        let inserted = sqlx::query_scalar::<_, bool>(
            r"
            INSERT INTO storefront.review
                (product_id, user_id, title, comment, rating, is_verified_purchase)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (product_id, user_id) DO UPDATE SET
                title = EXCLUDED.title,
                comment = EXCLUDED.comment,
                rating = EXCLUDED.rating,
                is_verified_purchase = EXCLUDED.is_verified_purchase,
                updated_at = NOW()
            RETURNING (xmax = 0)
            ",
        )
        .bind(input.product_id)
        .bind(user_id)
        .bind(&input.title)
        .bind(&input.comment)
        .bind(input.rating)
        .bind(input.is_verified_purchase)
        .fetch_one(&mut *tx)
        .await?;

        let ratings = sqlx::query_scalar::<_, Rating>(
            "SELECT rating FROM storefront.review WHERE product_id = $1",
        )
        .bind(input.product_id)
        .fetch_all(&mut *tx)
        .await?;
        let distribution = RatingDistribution::tally(ratings);
        let counts: Vec<i32> = distribution
            .counts()
            .iter()
            .map(|c| i32::try_from(*c).unwrap_or(i32::MAX))
            .collect();

        sqlx::query(
            r"
            UPDATE storefront.product
            SET avg_rating = $2,
                num_reviews = $3,
                rating_distribution = $4,
                updated_at = NOW()
            WHERE id = $1
            ",
        )
        .bind(input.product_id)
        .bind(distribution.average())
        .bind(i32::try_from(distribution.total()).unwrap_or(i32::MAX))
        .bind(counts)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(if inserted {
            UpsertOutcome::Created
        } else {
            UpsertOutcome::Updated
        })
    }
}
