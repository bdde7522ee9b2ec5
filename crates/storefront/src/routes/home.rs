//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::{extract::State, response::IntoResponse};
use tracing::instrument;

use crate::db::{CARD_LIMIT, TAG_LIMIT};
use crate::models::{Product, ProductCard};
use crate::shell::Shell;
use crate::state::AppState;

/// Tag of the deals slider.
const TODAYS_DEAL_TAG: &str = "todays-deal";

/// Card rows on the home page: (heading, tag).
const CARD_ROWS: [(&str, &str); 3] = [
    ("New Arrivals", "new-arrival"),
    ("Featured Products", "featured"),
    ("Best Sellers", "best-seller"),
];

/// A titled row of product cards.
#[derive(Debug, Clone)]
pub struct CardRow {
    pub title: &'static str,
    pub cards: Vec<ProductCard>,
}

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub shell: Shell,
    pub categories: Vec<String>,
    pub card_rows: Vec<CardRow>,
    pub todays_deals: Vec<Product>,
}

/// Home page: categories, tag card rows, and today's deals.
///
/// A failing section is logged and rendered empty; the page still loads.
#[instrument(skip(state, shell))]
pub async fn home(State(state): State<AppState>, shell: Shell) -> impl IntoResponse {
    let catalog = state.catalog();

    let categories = catalog.all_categories().await.unwrap_or_else(|e| {
        tracing::error!("Failed to fetch categories: {e}");
        Vec::new()
    });

    let mut card_rows = Vec::with_capacity(CARD_ROWS.len());
    for (title, tag) in CARD_ROWS {
        let cards = catalog
            .products_for_card(tag, CARD_LIMIT)
            .await
            .unwrap_or_else(|e| {
                tracing::error!(tag, "Failed to fetch card row: {e}");
                Vec::new()
            });
        card_rows.push(CardRow { title, cards });
    }

    let todays_deals = catalog
        .products_by_tag(TODAYS_DEAL_TAG, TAG_LIMIT)
        .await
        .unwrap_or_else(|e| {
            tracing::error!("Failed to fetch today's deals: {e}");
            Vec::new()
        });

    HomeTemplate {
        shell,
        categories,
        card_rows,
        todays_deals,
    }
}
