//! Review feed, dialog, and submission fragments (HTMX).
//!
//! The product page holds an empty `#review-feed` that requests page 1 when it
//! scrolls into view. Each feed page ends with a "See more reviews" button for
//! the next page, present only while pages remain, which replaces itself with
//! that page. A successful submission retargets the response at
//! `#review-feed`, replacing the whole list with a fresh page 1.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tracing::instrument;

use crate::db::RepositoryError;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireUser;
use crate::models::{Product, ReviewDetails};
use crate::services::reviews::{FeedCursor, FieldErrors, ReviewError, ReviewForm, ReviewService};
use crate::state::AppState;
use crate::toast::{HxTrigger, Toast, ToastOnly};

/// Query parameters for a feed page.
#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub page: Option<u32>,
}

/// One page of the review feed.
#[derive(Template, WebTemplate)]
#[template(path = "partials/review_page.html")]
pub struct ReviewPageTemplate {
    pub slug: String,
    pub reviews: Vec<ReviewDetails>,
    pub cursor: FeedCursor,
    pub first_page: bool,
}

impl ReviewPageTemplate {
    /// URL of the next page, requested by "See more reviews".
    #[must_use]
    pub fn next_page_href(&self) -> String {
        format!("/product/{}/reviews?page={}", self.slug, self.cursor.next_page)
    }
}

/// A radio choice in the rating picker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RatingOption {
    pub value: i64,
    pub selected: bool,
}

/// The review dialog form.
#[derive(Template, WebTemplate)]
#[template(path = "partials/review_form.html")]
pub struct ReviewFormTemplate {
    pub slug: String,
    pub form: ReviewForm,
    pub errors: FieldErrors,
}

impl ReviewFormTemplate {
    fn new(slug: String, form: ReviewForm) -> Self {
        Self {
            slug,
            form,
            errors: FieldErrors::default(),
        }
    }

    /// Rating choices, five stars first.
    #[must_use]
    pub fn rating_options(&self) -> Vec<RatingOption> {
        (1..=5)
            .rev()
            .map(|value| RatingOption {
                value,
                selected: self.form.rating == value,
            })
            .collect()
    }
}

/// Look up the product behind a fragment request.
///
/// Unknown slugs stay a 404. Any other lookup failure is logged and answered
/// with `on_failure`, so the HTMX caller still gets a response it can swap.
async fn fragment_product(
    state: &AppState,
    slug: &str,
    on_failure: impl FnOnce() -> Response,
) -> std::result::Result<Product, Response> {
    match state.catalog().product_by_slug(slug).await {
        Ok(product) => Ok(product),
        Err(RepositoryError::NotFound(what)) => {
            Err(AppError::from(RepositoryError::NotFound(what)).into_response())
        }
        Err(e) => {
            tracing::error!(slug, "Failed to look up product: {e}");
            Err(on_failure())
        }
    }
}

/// Response for a feed page that could not be loaded.
///
/// A failed first page still swaps in an empty list, replacing the loading
/// placeholder; later pages leave the feed as it was.
fn feed_failure(slug: String, page: u32) -> Response {
    if page == 1 {
        (
            HxTrigger::new().toast(&Toast::error("Failed to load initial reviews")),
            ReviewPageTemplate {
                slug,
                reviews: Vec::new(),
                cursor: FeedCursor::after(1, 0),
                first_page: true,
            },
        )
            .into_response()
    } else {
        ToastOnly(Toast::error("Failed to load more reviews")).into_response()
    }
}

/// Load one page of the product's review feed.
#[instrument(skip(state, query))]
pub async fn feed(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<FeedQuery>,
) -> Result<Response> {
    let page = query.page.unwrap_or(1).max(1);
    let product =
        match fragment_product(&state, &slug, || feed_failure(slug.clone(), page)).await {
            Ok(product) => product,
            Err(response) => return Ok(response),
        };

    match ReviewService::new(state.reviews()).page(product.id, page).await {
        Ok(result) => Ok(ReviewPageTemplate {
            slug,
            reviews: result.data,
            cursor: FeedCursor::after(page, result.total_pages),
            first_page: page == 1,
        }
        .into_response()),
        Err(e) => {
            tracing::error!(product_id = %product.id, page, "Failed to fetch reviews: {e}");
            Ok(feed_failure(slug, page))
        }
    }
}

/// Open the review dialog, pre-filled with the user's existing review.
///
/// If the lookup fails the dialog still opens with blank values.
#[instrument(skip(state, user))]
pub async fn form(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(slug): Path<String>,
) -> Result<Response> {
    let product = match fragment_product(&state, &slug, || {
        ToastOnly(Toast::error("Failed to load existing review")).into_response()
    })
    .await
    {
        Ok(product) => product,
        Err(response) => return Ok(response),
    };

    match ReviewService::new(state.reviews())
        .form_values(product.id, user.id)
        .await
    {
        Ok(values) => Ok(ReviewFormTemplate::new(slug, values).into_response()),
        Err(e) => {
            tracing::error!(product_id = %product.id, "Failed to load existing review: {e}");
            Ok((
                HxTrigger::new().toast(&Toast::error("Failed to load existing review")),
                ReviewFormTemplate::new(slug, ReviewForm::blank()),
            )
                .into_response())
        }
    }
}

/// Create or update the user's review, then reload the feed from page 1.
#[instrument(skip(state, user, form), fields(user_id = %user.id))]
pub async fn submit(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(slug): Path<String>,
    Form(form): Form<ReviewForm>,
) -> Result<Response> {
    let product = match fragment_product(&state, &slug, || {
        ToastOnly(Toast::error("Review submission failed")).into_response()
    })
    .await
    {
        Ok(product) => product,
        Err(response) => return Ok(response),
    };
    let service = ReviewService::new(state.reviews());

    let result = match service.submit(user.id, product.id, &form).await {
        Ok(result) => result,
        Err(ReviewError::Validation(errors)) => {
            return Ok(ReviewFormTemplate { slug, form, errors }.into_response());
        }
        Err(ReviewError::Repository(e)) => {
            tracing::error!(product_id = %product.id, "Failed to save review: {e}");
            return Ok(ToastOnly(Toast::error("Review submission failed")).into_response());
        }
    };
    add_breadcrumb("review", &result.message, &[("product", slug.as_str())]);

    let trigger = HxTrigger::new()
        .toast(&Toast::success(&result.message))
        .event("reviewSubmitted");

    match service.page(product.id, 1).await {
        Ok(page) => Ok((
            trigger,
            [("hx-retarget", "#review-feed"), ("hx-reswap", "innerHTML")],
            ReviewPageTemplate {
                slug,
                reviews: page.data,
                cursor: FeedCursor::after(1, page.total_pages),
                first_page: true,
            },
        )
            .into_response()),
        Err(e) => {
            tracing::error!(product_id = %product.id, "Failed to reload reviews: {e}");
            Ok((trigger, [("hx-reswap", "none")], ()).into_response())
        }
    }
}
