//! Page shell: the header, cart sidebar, and toast host every full page shares.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use bazaar_core::Price;

use crate::middleware::auth::request_path;
use crate::models::{Cart, CurrentUser, session_keys};
use crate::state::AppState;

/// Paths on which the cart sidebar never opens.
const SIDEBAR_HIDDEN_PATHS: [&str; 5] = ["/cart", "/checkout", "/sign-in", "/sign-up", "/order"];

/// Whether the cart sidebar is shown next to the page content.
///
/// True iff the cart has items and `path` is neither one of the hidden
/// paths nor below one of them.
#[must_use]
pub fn cart_sidebar_open(cart: &Cart, path: &str) -> bool {
    if cart.is_empty() {
        return false;
    }
    !SIDEBAR_HIDDEN_PATHS.iter().any(|hidden| {
        path == *hidden
            || path
                .strip_prefix(hidden)
                .is_some_and(|rest| rest.starts_with('/'))
    })
}

/// Read the cart from the session; a missing or unreadable cart is empty.
pub async fn load_cart(session: &Session) -> Cart {
    session
        .get::<Cart>(session_keys::CART)
        .await
        .ok()
        .flatten()
        .unwrap_or_default()
}

/// Layout data shared by every full-page template.
#[derive(Debug, Clone)]
pub struct Shell {
    pub site_name: String,
    pub user: Option<CurrentUser>,
    pub cart: Cart,
    pub sidebar_open: bool,
    pub css_hash: &'static str,
}

impl Shell {
    /// Header greeting.
    #[must_use]
    pub fn greeting(&self) -> String {
        self.user.as_ref().map_or_else(
            || "Hello, Sign in".to_string(),
            |user| format!("Hello, {}", user.name),
        )
    }

    #[must_use]
    pub fn cart_count(&self) -> u32 {
        self.cart.item_count()
    }

    #[must_use]
    pub fn subtotal(&self) -> Price {
        self.cart.subtotal()
    }
}

impl FromRequestParts<AppState> for Shell {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let (user, cart) = match parts.extensions.get::<Session>() {
            Some(session) => {
                let user = session
                    .get::<CurrentUser>(session_keys::CURRENT_USER)
                    .await
                    .ok()
                    .flatten();
                (user, load_cart(session).await)
            }
            None => (None, Cart::default()),
        };
        let sidebar_open = cart_sidebar_open(&cart, &request_path(parts));

        Ok(Self {
            site_name: state.config().site_name.clone(),
            user,
            cart,
            sidebar_open,
            css_hash: env!("CSS_HASH"),
        })
    }
}
