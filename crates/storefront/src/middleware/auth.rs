//! Authentication extractors.
//!
//! The signed-in user lives in the session under
//! [`session_keys::CURRENT_USER`]; these extractors read it.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{HeaderMap, StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use url::Url;

use crate::models::{CurrentUser, session_keys};

/// Extractor that requires a signed-in user.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(RequireUser(user): RequireUser) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireUser(pub CurrentUser);

/// Rejection when a signed-in user is required but absent.
#[derive(Debug)]
pub enum AuthRejection {
    /// Full page request: send the browser to the sign-in page.
    RedirectToSignIn(String),
    /// HTMX request: ask HTMX to navigate to the sign-in page.
    HxRedirectToSignIn(String),
    /// API request.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToSignIn(location) => Redirect::to(&location).into_response(),
            Self::HxRedirectToSignIn(location) => {
                (StatusCode::OK, [("hx-redirect", location)]).into_response()
            }
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

/// Sign-in URL that returns to `callback` afterwards.
#[must_use]
pub fn sign_in_url(callback: &str) -> String {
    format!("/sign-in?callbackUrl={}", urlencoding::encode(callback))
}

/// Path the user should land on after signing in.
///
/// HTMX fragment requests report the page they were issued from in
/// `HX-Current-URL`; everything else returns to the requested path.
fn callback_path(headers: &HeaderMap, path: &str) -> String {
    headers
        .get("hx-current-url")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Url::parse(v).ok())
        .map_or_else(|| path.to_string(), |url| url.path().to_string())
}

/// Path as the client sent it; nested routers only see their own suffix.
pub(crate) fn request_path(parts: &Parts) -> String {
    parts
        .extensions
        .get::<OriginalUri>()
        .map_or_else(|| parts.uri.path(), |uri| uri.path())
        .to_string()
}

async fn session_user(parts: &Parts) -> Option<CurrentUser> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentUser>(session_keys::CURRENT_USER)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(user) = session_user(parts).await {
            return Ok(Self(user));
        }

        let path = request_path(parts);
        if path.starts_with("/api/") {
            return Err(AuthRejection::Unauthorized);
        }

        let location = sign_in_url(&callback_path(&parts.headers, &path));
        if parts.headers.contains_key("hx-request") {
            Err(AuthRejection::HxRedirectToSignIn(location))
        } else {
            Err(AuthRejection::RedirectToSignIn(location))
        }
    }
}

/// Extractor that optionally gets the signed-in user.
pub struct OptionalUser(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalUser
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(session_user(parts).await))
    }
}

/// Store the signed-in user in the session.
///
/// The session ID is rotated first to prevent fixation.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_user(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::CURRENT_USER, user).await
}

/// Remove the signed-in user from the session (sign out).
///
/// The cart is kept.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_user(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session
        .remove::<CurrentUser>(session_keys::CURRENT_USER)
        .await?;
    session.cycle_id().await
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    #[test]
    fn test_sign_in_url_encodes_callback() {
        assert_eq!(
            sign_in_url("/product/red shoe"),
            "/sign-in?callbackUrl=%2Fproduct%2Fred%20shoe"
        );
    }

    #[test]
    fn test_callback_prefers_htmx_current_url() {
        let mut headers = HeaderMap::new();
        assert_eq!(
            callback_path(&headers, "/product/shoe/reviews/form"),
            "/product/shoe/reviews/form"
        );

        headers.insert(
            "hx-current-url",
            HeaderValue::from_static("http://localhost:3000/product/shoe?tab=reviews"),
        );
        assert_eq!(
            callback_path(&headers, "/product/shoe/reviews/form"),
            "/product/shoe"
        );
    }
}
