//! Product page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::instrument;

use bazaar_core::{Paginated, Rating};

use crate::db::RelatedQuery;
use crate::error::Result;
use crate::models::Product;
use crate::shell::Shell;
use crate::state::AppState;

/// Query parameters for the product page.
#[derive(Debug, Deserialize)]
pub struct ShowQuery {
    /// Page of the related-products row.
    pub page: Option<u32>,
}

/// One bar of the rating summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingBar {
    pub stars: u8,
    pub count: u32,
    pub percent: u32,
}

/// Rating summary bars, five stars first.
#[must_use]
pub fn rating_bars(product: &Product) -> Vec<RatingBar> {
    let distribution = &product.rating_distribution;
    Rating::all()
        .rev()
        .map(|rating| RatingBar {
            stars: rating.get(),
            count: distribution.count(rating),
            percent: distribution.percent(rating),
        })
        .collect()
}

#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub shell: Shell,
    pub product: Product,
    pub rating_bars: Vec<RatingBar>,
    pub related: Paginated<Product>,
    pub related_page: u32,
}

impl ProductShowTemplate {
    fn related_page_href(&self, page: u32) -> String {
        format!("{}?page={page}", self.product.href())
    }

    /// Link to the previous page of related products, if any.
    #[must_use]
    pub fn previous_related_href(&self) -> Option<String> {
        (self.related_page > 1).then(|| self.related_page_href(self.related_page - 1))
    }

    /// Link to the next page of related products, if any.
    #[must_use]
    pub fn next_related_href(&self) -> Option<String> {
        (self.related_page < self.related.total_pages)
            .then(|| self.related_page_href(self.related_page + 1))
    }

    /// Sign-in link that returns to this product.
    #[must_use]
    pub fn sign_in_href(&self) -> String {
        crate::middleware::auth::sign_in_url(&self.product.href())
    }
}

/// Display a product with its related products and review section.
///
/// Unknown slugs are a 404. A failing related-products query is logged and
/// rendered as an empty row.
#[instrument(skip(state, shell, query))]
pub async fn show(
    State(state): State<AppState>,
    shell: Shell,
    Path(slug): Path<String>,
    Query(query): Query<ShowQuery>,
) -> Result<impl IntoResponse> {
    let product = state.catalog().product_by_slug(&slug).await?;

    let related_query = RelatedQuery::for_product(&product).page(query.page.unwrap_or(1));
    let related = state
        .catalog()
        .related_products_by_category(&related_query)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(product_id = %product.id, "Failed to fetch related products: {e}");
            Paginated::empty(0)
        });

    Ok(ProductShowTemplate {
        shell,
        rating_bars: rating_bars(&product),
        related,
        related_page: related_query.page,
        product,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use bazaar_core::RatingDistribution;

    use super::*;
    use crate::db::memory::{MemoryStore, product_fixture};
    use crate::routes::test_support::{app, body_string, get, send};

    #[test]
    fn test_rating_bars_five_stars_first() {
        let mut product = product_fixture(1);
        product.rating_distribution = RatingDistribution::from_counts([0, 0, 1, 0, 3]);

        let bars = rating_bars(&product);
        assert_eq!(bars.len(), 5);
        assert_eq!(
            bars[0],
            RatingBar {
                stars: 5,
                count: 3,
                percent: 75
            }
        );
        assert_eq!(bars[2].percent, 25);
    }

    #[tokio::test]
    async fn test_product_page_renders_details_and_review_island() {
        let mut product = product_fixture(1);
        product.name = "Trail Runner".to_string();
        let store = Arc::new(MemoryStore::with_products(vec![product, product_fixture(2)]));

        let response = send(&app(&store), get("/product/product-1")).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_string(response).await;
        assert!(body.contains("Trail Runner"));
        assert!(body.contains("$10.00"));
        // lazy review feed
        assert!(body.contains("hx-get=\"/product/product-1/reviews?page=1\""));
        assert!(body.contains("hx-trigger=\"revealed\""));
        // signed out visitors get a sign-in link back to the product
        assert!(body.contains("/sign-in?callbackUrl=%2Fproduct%2Fproduct-1"));
        // related product in the same category
        assert!(body.contains("/product/product-2"));
    }

    #[tokio::test]
    async fn test_rating_summary_only_with_reviews() {
        let mut reviewed = product_fixture(1);
        reviewed.num_reviews = 4;
        reviewed.avg_rating = 4.5;
        reviewed.rating_distribution = RatingDistribution::from_counts([0, 0, 1, 0, 3]);
        let store = Arc::new(MemoryStore::with_products(vec![reviewed, product_fixture(2)]));
        let app = app(&store);

        let body = body_string(send(&app, get("/product/product-1")).await).await;
        assert!(body.contains("4.5 out of 5"));
        assert!(body.contains("class=\"rating-bars\""));

        let body = body_string(send(&app, get("/product/product-2")).await).await;
        assert!(!body.contains("out of 5"));
        assert!(!body.contains("class=\"rating-bars\""));
    }

    #[tokio::test]
    async fn test_related_products_paginate() {
        let products: Vec<_> = (1..=6).map(product_fixture).collect();
        let store = Arc::new(MemoryStore::with_products(products));
        let app = app(&store);

        let body = body_string(send(&app, get("/product/product-1")).await).await;
        assert!(body.contains("/product/product-1?page=2"));

        let body = body_string(send(&app, get("/product/product-1?page=2")).await).await;
        assert!(body.contains("/product/product-1?page=1"));
        assert!(!body.contains("/product/product-1?page=3"));
    }
}
