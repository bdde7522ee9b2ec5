//! Review feed and submission.
//!
//! The product page loads reviews as an incrementally growing feed: page 1
//! when the list scrolls into view, then one page per "See more reviews"
//! click. [`FeedCursor`] tracks where the feed is; [`ReviewService`] answers
//! page requests and handles create-or-update submissions.

use serde::{Deserialize, Serialize};
use tracing::instrument;

use bazaar_core::{Paginated, ProductId, Rating, UserId, total_pages};

use crate::db::{RepositoryError, ReviewRepository};
use crate::models::{ReviewDetails, ReviewInput};

/// Reviews per feed page.
pub const REVIEW_PAGE_SIZE: u32 = 9;

/// Position of an incrementally loaded review feed.
///
/// `next_page` is the page "See more" would request; `total_pages` is the
/// last page count the server reported, or `0` before anything was loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedCursor {
    pub next_page: u32,
    pub total_pages: u32,
}

impl FeedCursor {
    /// Cursor before any page has been loaded.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            next_page: 1,
            total_pages: 0,
        }
    }

    /// Cursor after `page` was served and the server reported `total_pages`.
    #[must_use]
    pub const fn after(page: u32, total_pages: u32) -> Self {
        Self {
            next_page: page.saturating_add(1),
            total_pages,
        }
    }

    /// The page to request next, or `None` once the feed is exhausted.
    ///
    /// Before the page count is known the request is always allowed.
    #[must_use]
    pub const fn next_request(&self) -> Option<u32> {
        if self.total_pages != 0 && self.next_page > self.total_pages {
            None
        } else {
            Some(self.next_page)
        }
    }

    /// Whether the "See more reviews" control is shown.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.next_page <= self.total_pages
    }
}

impl Default for FeedCursor {
    fn default() -> Self {
        Self::new()
    }
}

/// Raw review form fields as submitted by the browser.
///
/// A rating of `0` means "not chosen yet".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub rating: i64,
}

/// Field-level validation messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldErrors {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
}

impl FieldErrors {
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.title.is_none() && self.comment.is_none() && self.rating.is_none()
    }

    /// First message, in form order.
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        self.title
            .as_deref()
            .or(self.comment.as_deref())
            .or(self.rating.as_deref())
    }
}

impl ReviewForm {
    /// Values for a user without a review: empty text and no rating.
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    /// Validate the form for `product_id`.
    ///
    /// # Errors
    ///
    /// Returns every failing field at once.
    pub fn validate(&self, product_id: ProductId) -> Result<ReviewInput, FieldErrors> {
        let title = self.title.trim();
        let comment = self.comment.trim();
        let mut errors = FieldErrors::default();

        if title.is_empty() {
            errors.title = Some("Title is required".to_string());
        }
        if comment.is_empty() {
            errors.comment = Some("Comment is required".to_string());
        }
        let rating = match Rating::new(self.rating) {
            Ok(rating) => Some(rating),
            Err(_) if self.rating < i64::from(Rating::MIN) => {
                errors.rating = Some("Rating must be at least 1".to_string());
                None
            }
            Err(_) => {
                errors.rating = Some("Rating must be at most 5".to_string());
                None
            }
        };

        match rating {
            Some(rating) if errors.is_empty() => Ok(ReviewInput {
                product_id,
                title: title.to_string(),
                comment: comment.to_string(),
                rating,
                is_verified_purchase: true,
            }),
            _ => Err(errors),
        }
    }
}

/// Outcome of a mutation, in the `{ success, message }` shape clients expect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    #[must_use]
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Errors from review submission.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// The form failed validation; nothing was written.
    #[error("invalid review")]
    Validation(FieldErrors),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Review operations over a [`ReviewRepository`].
pub struct ReviewService<'a> {
    reviews: &'a dyn ReviewRepository,
}

impl<'a> ReviewService<'a> {
    #[must_use]
    pub const fn new(reviews: &'a dyn ReviewRepository) -> Self {
        Self { reviews }
    }

    /// One feed page for a product.
    ///
    /// Page numbers past the last page return no items without querying them.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the count or page query fails.
    #[instrument(skip(self))]
    pub async fn page(
        &self,
        product_id: ProductId,
        page: u32,
    ) -> Result<Paginated<ReviewDetails>, RepositoryError> {
        let page = page.max(1);
        let total = self.reviews.count_for_product(product_id).await?;
        let total_pages = total_pages(total, REVIEW_PAGE_SIZE);
        if page > total_pages {
            return Ok(Paginated::empty(total_pages));
        }

        let data = self
            .reviews
            .page_for_product(product_id, page, REVIEW_PAGE_SIZE)
            .await?;
        Ok(Paginated { data, total_pages })
    }

    /// Values to pre-fill the review form with.
    ///
    /// The user's existing review when there is one, blank values otherwise.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the lookup fails.
    #[instrument(skip(self))]
    pub async fn form_values(
        &self,
        product_id: ProductId,
        user_id: UserId,
    ) -> Result<ReviewForm, RepositoryError> {
        let existing = self.reviews.find_by_user(product_id, user_id).await?;
        Ok(existing.map_or_else(ReviewForm::blank, |review| ReviewForm {
            title: review.title,
            comment: review.comment,
            rating: i64::from(review.rating.get()),
        }))
    }

    /// Validate and store the user's review of a product.
    ///
    /// # Errors
    ///
    /// Returns `ReviewError::Validation` without touching the repository if
    /// the form is invalid, or `ReviewError::Repository` if the write fails.
    #[instrument(skip(self, form))]
    pub async fn submit(
        &self,
        user_id: UserId,
        product_id: ProductId,
        form: &ReviewForm,
    ) -> Result<ActionResult, ReviewError> {
        let input = form.validate(product_id).map_err(ReviewError::Validation)?;
        let outcome = self.reviews.upsert(user_id, &input).await?;
        tracing::info!(?outcome, "review saved");
        Ok(ActionResult::ok(outcome.message()))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::db::memory::{MemoryStore, product_fixture};
    use crate::models::UpsertOutcome;

    use super::*;

    fn store_with_reviews(count: i32) -> MemoryStore {
        let store = MemoryStore::with_products(vec![product_fixture(1)]);
        for i in 0..count {
            store.add_review(1, i + 100, 4, i64::from(i));
        }
        store
    }

    fn form(title: &str, comment: &str, rating: i64) -> ReviewForm {
        ReviewForm {
            title: title.to_string(),
            comment: comment.to_string(),
            rating,
        }
    }

    #[test]
    fn test_cursor_never_requests_past_last_page() {
        for total in 1..=5 {
            let mut cursor = FeedCursor::after(1, total);
            let mut requested = vec![1];
            while let Some(page) = cursor.next_request() {
                requested.push(page);
                cursor = FeedCursor::after(page, total);
            }
            assert_eq!(requested, (1..=total).collect::<Vec<_>>());
            assert!(!cursor.has_more());
        }
    }

    #[test]
    fn test_cursor_with_two_pages() {
        let after_first = FeedCursor::after(1, 2);
        assert!(after_first.has_more());
        assert_eq!(after_first.next_request(), Some(2));

        let after_second = FeedCursor::after(2, 2);
        assert!(!after_second.has_more());
        assert_eq!(after_second.next_request(), None);
    }

    #[test]
    fn test_cursor_before_first_load_allows_request() {
        assert_eq!(FeedCursor::new().next_request(), Some(1));
        assert!(!FeedCursor::new().has_more());
    }

    #[test]
    fn test_validate_accepts_trimmed_input() {
        let input = form("  Great  ", " Fits well ", 5)
            .validate(ProductId::new(1))
            .unwrap();
        assert_eq!(input.title, "Great");
        assert_eq!(input.comment, "Fits well");
        assert_eq!(input.rating.get(), 5);
        assert!(input.is_verified_purchase);
    }

    #[test]
    fn test_validate_reports_every_field() {
        let errors = form(" ", "", 0).validate(ProductId::new(1)).unwrap_err();
        assert_eq!(errors.title.as_deref(), Some("Title is required"));
        assert_eq!(errors.comment.as_deref(), Some("Comment is required"));
        assert_eq!(errors.rating.as_deref(), Some("Rating must be at least 1"));
        assert_eq!(errors.first(), Some("Title is required"));

        let errors = form("t", "c", 6).validate(ProductId::new(1)).unwrap_err();
        assert_eq!(errors.rating.as_deref(), Some("Rating must be at most 5"));
        assert!(errors.title.is_none());
    }

    #[tokio::test]
    async fn test_page_past_end_fetches_nothing() {
        let store = store_with_reviews(12);
        let service = ReviewService::new(&store);

        let first = service.page(ProductId::new(1), 1).await.unwrap();
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.data.len(), 9);

        let second = service.page(ProductId::new(1), 2).await.unwrap();
        assert_eq!(second.data.len(), 3);
        assert_eq!(store.review_page_fetches(), 2);

        let third = service.page(ProductId::new(1), 3).await.unwrap();
        assert!(third.data.is_empty());
        assert_eq!(third.total_pages, 2);
        assert_eq!(store.review_page_fetches(), 2);
    }

    #[tokio::test]
    async fn test_page_is_newest_first() {
        let store = store_with_reviews(3);
        let page = ReviewService::new(&store)
            .page(ProductId::new(1), 1)
            .await
            .unwrap();
        let titles: Vec<&str> = page.data.iter().map(|r| r.review.title.as_str()).collect();
        assert_eq!(titles, vec!["Review 1", "Review 2", "Review 3"]);
    }

    #[tokio::test]
    async fn test_no_reviews_yields_zero_pages() {
        let store = store_with_reviews(0);
        let page = ReviewService::new(&store)
            .page(ProductId::new(1), 1)
            .await
            .unwrap();
        assert_eq!(page, Paginated::empty(0));
        assert_eq!(store.review_page_fetches(), 0);
    }

    #[tokio::test]
    async fn test_invalid_rating_never_reaches_repository() {
        let store = store_with_reviews(0);
        let service = ReviewService::new(&store);

        for rating in [0, 6, -1] {
            let result = service
                .submit(UserId::new(7), ProductId::new(1), &form("Title", "Comment", rating))
                .await;
            assert!(matches!(result, Err(ReviewError::Validation(_))));
        }
        assert_eq!(store.upserts(), 0);
    }

    #[tokio::test]
    async fn test_submit_creates_then_updates() {
        let store = store_with_reviews(0);
        let service = ReviewService::new(&store);
        let user = UserId::new(7);

        let created = service
            .submit(user, ProductId::new(1), &form("Nice", "Good shoe", 4))
            .await
            .unwrap();
        assert_eq!(created, ActionResult::ok(UpsertOutcome::Created.message()));

        let updated = service
            .submit(user, ProductId::new(1), &form("Nicer", "Great shoe", 2))
            .await
            .unwrap();
        assert_eq!(updated, ActionResult::ok(UpsertOutcome::Updated.message()));

        let product = store.product(ProductId::new(1)).unwrap();
        assert_eq!(product.num_reviews, 1);
        assert!((product.avg_rating - 2.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn test_form_values_prefill_or_default() {
        let store = store_with_reviews(0);
        let service = ReviewService::new(&store);
        let user = UserId::new(7);

        let blank = service.form_values(ProductId::new(1), user).await.unwrap();
        assert_eq!(blank, form("", "", 0));

        service
            .submit(user, ProductId::new(1), &form("Mine", "My words", 3))
            .await
            .unwrap();
        let filled = service.form_values(ProductId::new(1), user).await.unwrap();
        assert_eq!(filled, form("Mine", "My words", 3));
    }
}
