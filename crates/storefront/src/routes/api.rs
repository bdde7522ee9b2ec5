//! JSON API over the catalog and review services.
//!
//! Pagination responses are `{ "data": [...], "totalPages": n }`. Review
//! submission answers `{ "success": bool, "message": string }` for every
//! handled outcome; only unexpected failures produce an error status.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{Paginated, ProductId};

use crate::db::{CARD_LIMIT, RELATED_LIMIT, RelatedQuery, RepositoryError, TAG_LIMIT};
use crate::error::Result;
use crate::middleware::RequireUser;
use crate::models::{Product, ProductCard, ReviewDetails};
use crate::services::reviews::{ActionResult, ReviewError, ReviewForm, ReviewService};
use crate::state::AppState;

/// Largest `limit` a client may ask for.
const MAX_LIMIT: u32 = 48;

fn clamp_limit(limit: Option<u32>, default: u32) -> u32 {
    limit.unwrap_or(default).clamp(1, MAX_LIMIT)
}

#[derive(Debug, Deserialize)]
pub struct TagQuery {
    pub tag: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Review fields as sent by the review dialog.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewPayload {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub rating: i64,
    /// Accepted for compatibility; the server always marks reviews verified.
    #[serde(default)]
    pub is_verified_purchase: Option<bool>,
    pub product: ProductId,
}

/// Body of `POST /api/reviews`.
#[derive(Debug, Deserialize)]
pub struct SubmitReviewRequest {
    pub data: ReviewPayload,
    /// Page the review was written on.
    pub path: Option<String>,
}

#[instrument(skip(state))]
pub async fn categories(State(state): State<AppState>) -> Result<Json<Vec<String>>> {
    Ok(Json(state.catalog().all_categories().await?))
}

#[instrument(skip(state))]
pub async fn product_cards(
    State(state): State<AppState>,
    Query(query): Query<TagQuery>,
) -> Result<Json<Vec<ProductCard>>> {
    let limit = clamp_limit(query.limit, CARD_LIMIT);
    Ok(Json(state.catalog().products_for_card(&query.tag, limit).await?))
}

#[instrument(skip(state))]
pub async fn products_by_tag(
    State(state): State<AppState>,
    Query(query): Query<TagQuery>,
) -> Result<Json<Vec<Product>>> {
    let limit = clamp_limit(query.limit, TAG_LIMIT);
    Ok(Json(state.catalog().products_by_tag(&query.tag, limit).await?))
}

#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Json<Product>> {
    Ok(Json(state.catalog().product_by_slug(&slug).await?))
}

#[instrument(skip(state))]
pub async fn related_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<Product>>> {
    let catalog = state.catalog();
    let product = catalog.product_by_slug(&slug).await?;

    let mut related = RelatedQuery::for_product(&product).page(query.page.unwrap_or(1));
    related.limit = clamp_limit(query.limit, RELATED_LIMIT);
    Ok(Json(catalog.related_products_by_category(&related).await?))
}

#[instrument(skip(state))]
pub async fn reviews(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(query): Query<PageQuery>,
) -> Result<Json<Paginated<ReviewDetails>>> {
    let product = state.catalog().product_by_slug(&slug).await?;
    let page = ReviewService::new(state.reviews())
        .page(product.id, query.page.unwrap_or(1))
        .await?;
    Ok(Json(page))
}

/// The signed-in user's review values for a product, blank if none.
#[instrument(skip(state, user))]
pub async fn my_review(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Path(slug): Path<String>,
) -> Result<Json<ReviewForm>> {
    let product = state.catalog().product_by_slug(&slug).await?;
    let form = ReviewService::new(state.reviews())
        .form_values(product.id, user.id)
        .await?;
    Ok(Json(form))
}

/// Create or update the signed-in user's review.
#[instrument(skip(state, user, request), fields(user_id = %user.id, path = ?request.path))]
pub async fn submit_review(
    State(state): State<AppState>,
    RequireUser(user): RequireUser,
    Json(request): Json<SubmitReviewRequest>,
) -> Result<Json<ActionResult>> {
    let payload = request.data;
    let form = ReviewForm {
        title: payload.title,
        comment: payload.comment,
        rating: payload.rating,
    };

    let result = match ReviewService::new(state.reviews())
        .submit(user.id, payload.product, &form)
        .await
    {
        Ok(result) => result,
        Err(ReviewError::Validation(errors)) => {
            ActionResult::failed(errors.first().unwrap_or("Invalid review"))
        }
        Err(ReviewError::Repository(RepositoryError::NotFound(what))) => {
            ActionResult::failed(format!("{} not found", capitalize(what)))
        }
        Err(ReviewError::Repository(e)) => return Err(e.into()),
    };
    Ok(Json(result))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
