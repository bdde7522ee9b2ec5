//! HTTP route handlers for the storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                              - Home page
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (checks the database)
//!
//! # Products
//! GET  /product/{slug}                - Product detail (?page= for related products)
//! GET  /product/{slug}/reviews        - Review feed page fragment (?page=)
//! GET  /product/{slug}/reviews/form   - Review dialog fragment (auth)
//! POST /product/{slug}/reviews        - Submit review (auth)
//!
//! # Cart (HTMX fragments)
//! GET  /cart                          - Cart page
//! POST /cart/add                      - Add to cart (triggers cartUpdated)
//! POST /cart/remove                   - Remove line (triggers cartUpdated)
//! GET  /cart/count                    - Cart count badge
//!
//! # Auth
//! GET  /sign-in, POST /sign-in        - Sign in (?callbackUrl=)
//! GET  /sign-up, POST /sign-up        - Create account
//! POST /sign-out                      - Sign out
//!
//! # JSON API
//! GET  /api/categories
//! GET  /api/products/cards?tag=&limit=
//! GET  /api/products?tag=&limit=
//! GET  /api/products/{slug}
//! GET  /api/products/{slug}/related?page=&limit=
//! GET  /api/products/{slug}/reviews?page=
//! GET  /api/products/{slug}/reviews/mine  (auth)
//! POST /api/reviews                       (auth)
//! ```

pub mod api;
pub mod auth;
pub mod cart;
pub mod home;
pub mod products;
pub mod reviews;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    routing::{get, post},
};

use crate::state::AppState;

/// Product page and review fragment routes.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/{slug}", get(products::show))
        .route("/{slug}/reviews", get(reviews::feed).post(reviews::submit))
        .route("/{slug}/reviews/form", get(reviews::form))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/remove", post(cart::remove))
        .route("/count", get(cart::count))
}

/// JSON API routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(api::categories))
        .route("/products", get(api::products_by_tag))
        .route("/products/cards", get(api::product_cards))
        .route("/products/{slug}", get(api::product))
        .route("/products/{slug}/related", get(api::related_products))
        .route("/products/{slug}/reviews", get(api::reviews))
        .route("/products/{slug}/reviews/mine", get(api::my_review))
        .route("/reviews", post(api::submit_review))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/product", product_routes())
        .nest("/cart", cart_routes())
        .route("/sign-in", get(auth::sign_in_page).post(auth::sign_in))
        .route("/sign-up", get(auth::sign_up_page).post(auth::sign_up))
        .route("/sign-out", post(auth::sign_out))
        .nest("/api", api_routes())
}

/// Liveness health check. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check.
///
/// Returns 503 Service Unavailable if the database is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.catalog().health_check().await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Router harness over in-memory repositories and sessions.

    #![allow(clippy::unwrap_used)]

    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request, Response, header},
    };
    use http_body_util::BodyExt;
    use secrecy::SecretString;
    use tower::ServiceExt;
    use tower_sessions::MemoryStore as SessionMemoryStore;
    use url::Url;

    use crate::config::{SentryConfig, StorefrontConfig};
    use crate::db::memory::MemoryStore;
    use crate::middleware::session;
    use crate::services::auth::hash_password;
    use crate::state::AppState;

    pub const PASSWORD: &str = "correct horse battery";

    pub fn config() -> StorefrontConfig {
        StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/bazaar_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: Url::parse("http://localhost:3000").unwrap(),
            site_name: "Bazaar".to_string(),
            sentry: SentryConfig::default(),
        }
    }

    /// A router wired to `store` for every repository.
    pub fn app(store: &Arc<MemoryStore>) -> Router {
        let state = AppState::new(config(), store.clone(), store.clone(), store.clone());
        super::routes()
            .layer(session::configure(SessionMemoryStore::default(), false))
            .with_state(state)
    }

    /// Add a user whose password is [`PASSWORD`].
    pub fn add_user(store: &MemoryStore, id: i32, name: &str, email: &str) {
        store.add_user(id, name, email, &hash_password(PASSWORD).unwrap());
    }

    pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
        app.clone().oneshot(request).await.unwrap()
    }

    pub async fn body_string(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub fn get(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    pub fn get_with_cookie(uri: &str, cookie: &str) -> Request<Body> {
        Request::get(uri)
            .header(header::COOKIE, cookie)
            .body(Body::empty())
            .unwrap()
    }

    pub fn post_form(uri: &str, body: &str, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header("hx-request", "true");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    pub fn post_json(uri: &str, body: &serde_json::Value, cookie: Option<&str>) -> Request<Body> {
        let mut builder = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    /// `name=value` of the session cookie set by `response`.
    pub fn session_cookie(response: &Response<Body>) -> String {
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_string()
    }

    /// Sign in through the form and return the session cookie.
    pub async fn sign_in(app: &Router, email: &str) -> String {
        let body = format!(
            "email={}&password={}",
            urlencoding::encode(email),
            urlencoding::encode(PASSWORD)
        );
        let response = send(app, post_form("/sign-in", &body, None)).await;
        session_cookie(&response)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;

    use super::test_support::{app, body_string, get, send};
    use crate::db::memory::{MemoryStore, product_fixture};

    #[tokio::test]
    async fn test_health() {
        let app = app(&Arc::new(MemoryStore::default()));

        let response = send(&app, get("/health")).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "ok");

        let response = send(&app, get("/health/ready")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_unknown_product_is_404() {
        let store = Arc::new(MemoryStore::with_products(vec![product_fixture(1)]));
        let app = app(&store);

        let response = send(&app, get("/product/does-not-exist")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&app, get("/api/products/does-not-exist")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
