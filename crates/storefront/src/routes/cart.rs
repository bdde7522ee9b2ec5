//! Cart route handlers.
//!
//! The cart lives in the session. Mutations answer with the count badge and
//! fire `cartUpdated` so the header and sidebar can refresh themselves.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use bazaar_core::ProductId;

use crate::error::Result;
use crate::models::{Cart, session_keys};
use crate::shell::{Shell, load_cart};
use crate::state::AppState;
use crate::toast::{HxTrigger, Toast, ToastOnly};

/// Event fired after every cart change.
pub const CART_UPDATED_EVENT: &str = "cartUpdated";

async fn save_cart(session: &Session, cart: &Cart) -> Result<()> {
    session.insert(session_keys::CART, cart).await?;
    Ok(())
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub slug: String,
    pub quantity: Option<u32>,
}

/// Remove from cart form data.
#[derive(Debug, Deserialize)]
pub struct RemoveFromCartForm {
    pub product_id: ProductId,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub shell: Shell,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u32,
}

/// Display cart page.
#[instrument(skip(shell))]
pub async fn show(shell: Shell) -> impl IntoResponse {
    CartShowTemplate { shell }
}

/// Add a product to the cart (HTMX).
///
/// Quantities are clamped to stock; an out-of-stock product only raises a
/// toast.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<AddToCartForm>,
) -> Result<Response> {
    let product = state.catalog().product_by_slug(&form.slug).await?;

    let mut cart = load_cart(&session).await;
    let in_cart = cart.add(&product, form.quantity.unwrap_or(1));
    if in_cart == 0 {
        return Ok(ToastOnly(Toast::error(format!("{} is out of stock", product.name))).into_response());
    }
    save_cart(&session, &cart).await?;

    let trigger = HxTrigger::new()
        .toast(&Toast::success(format!("Added {} to cart", product.name)))
        .event(CART_UPDATED_EVENT);
    Ok((
        trigger,
        CartCountTemplate {
            count: cart.item_count(),
        },
    )
        .into_response())
}

/// Remove a line from the cart (HTMX).
#[instrument(skip(session))]
pub async fn remove(session: Session, Form(form): Form<RemoveFromCartForm>) -> Result<Response> {
    let mut cart = load_cart(&session).await;
    if cart.remove(form.product_id) {
        save_cart(&session, &cart).await?;
    }

    Ok((
        HxTrigger::new().event(CART_UPDATED_EVENT),
        CartCountTemplate {
            count: cart.item_count(),
        },
    )
        .into_response())
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: load_cart(&session).await.item_count(),
    }
}
