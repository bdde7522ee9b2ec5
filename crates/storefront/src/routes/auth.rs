//! Authentication route handlers.
//!
//! Email and password sign-in, sign-up, and sign-out. Both forms carry a
//! `callbackUrl` that the user returns to afterwards, honoured only when it
//! is a local path.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{clear_current_user, set_current_user};
use crate::models::{CurrentUser, User};
use crate::services::auth::AuthService;
use crate::shell::Shell;
use crate::state::AppState;

/// Redirect target when no usable callback was given.
const DEFAULT_CALLBACK: &str = "/";

/// Return `callback` if it is a path on this site, `/` otherwise.
///
/// Rejects absolute URLs and protocol-relative `//host` paths so the sign-in
/// page cannot be used as an open redirect.
#[must_use]
pub fn safe_callback(callback: Option<&str>) -> &str {
    match callback {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => DEFAULT_CALLBACK,
    }
}

/// Query parameters of the auth pages.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackQuery {
    pub callback_url: Option<String>,
}

/// Sign-in form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignInForm {
    pub email: String,
    pub password: String,
    pub callback_url: Option<String>,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub callback_url: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/sign_in.html")]
pub struct SignInTemplate {
    pub shell: Shell,
    pub email: String,
    pub callback_url: String,
    pub error: Option<String>,
}

#[derive(Template, WebTemplate)]
#[template(path = "auth/sign_up.html")]
pub struct SignUpTemplate {
    pub shell: Shell,
    pub name: String,
    pub email: String,
    pub callback_url: String,
    pub error: Option<String>,
}

impl SignUpTemplate {
    /// Sign-in link carrying the same callback.
    #[must_use]
    pub fn sign_in_href(&self) -> String {
        format!(
            "/sign-in?callbackUrl={}",
            urlencoding::encode(&self.callback_url)
        )
    }
}

impl SignInTemplate {
    /// Sign-up link carrying the same callback.
    #[must_use]
    pub fn sign_up_href(&self) -> String {
        format!(
            "/sign-up?callbackUrl={}",
            urlencoding::encode(&self.callback_url)
        )
    }
}

async fn start_session(session: &Session, user: &User) -> Result<()> {
    set_current_user(session, &CurrentUser::from(user)).await?;
    set_sentry_user(&user.id, Some(user.email.as_str()));
    Ok(())
}

/// Display the sign-in page.
pub async fn sign_in_page(shell: Shell, Query(query): Query<CallbackQuery>) -> impl IntoResponse {
    SignInTemplate {
        shell,
        email: String::new(),
        callback_url: safe_callback(query.callback_url.as_deref()).to_string(),
        error: None,
    }
}

/// Handle sign-in form submission.
#[instrument(skip(state, session, shell, form))]
pub async fn sign_in(
    State(state): State<AppState>,
    session: Session,
    shell: Shell,
    Form(form): Form<SignInForm>,
) -> Result<Response> {
    let callback_url = safe_callback(form.callback_url.as_deref()).to_string();

    match AuthService::new(state.users())
        .login(&form.email, &form.password)
        .await
    {
        Ok(user) => {
            start_session(&session, &user).await?;
            tracing::info!(user_id = %user.id, "user signed in");
            Ok(Redirect::to(&callback_url).into_response())
        }
        Err(e) => {
            let err = AppError::from(e);
            if let AppError::Auth(ref auth) = err
                && err.status().is_client_error()
            {
                tracing::warn!("Sign-in failed: {auth}");
                return Ok((
                    err.status(),
                    SignInTemplate {
                        shell,
                        email: form.email,
                        callback_url,
                        error: Some(auth.public_message()),
                    },
                )
                    .into_response());
            }
            Err(err)
        }
    }
}

/// Display the sign-up page.
pub async fn sign_up_page(shell: Shell, Query(query): Query<CallbackQuery>) -> impl IntoResponse {
    SignUpTemplate {
        shell,
        name: String::new(),
        email: String::new(),
        callback_url: safe_callback(query.callback_url.as_deref()).to_string(),
        error: None,
    }
}

/// Handle sign-up form submission. Signs the new user in on success.
#[instrument(skip(state, session, shell, form))]
pub async fn sign_up(
    State(state): State<AppState>,
    session: Session,
    shell: Shell,
    Form(form): Form<SignUpForm>,
) -> Result<Response> {
    let callback_url = safe_callback(form.callback_url.as_deref()).to_string();
    let page = |shell, error: String| SignUpTemplate {
        shell,
        name: form.name.clone(),
        email: form.email.clone(),
        callback_url: callback_url.clone(),
        error: Some(error),
    };

    if form.password != form.confirm_password {
        return Ok((
            axum::http::StatusCode::BAD_REQUEST,
            page(shell, "Passwords don't match".to_string()),
        )
            .into_response());
    }

    match AuthService::new(state.users())
        .register(&form.name, &form.email, &form.password)
        .await
    {
        Ok(user) => {
            start_session(&session, &user).await?;
            Ok(Redirect::to(&callback_url).into_response())
        }
        Err(e) => {
            let err = AppError::from(e);
            if let AppError::Auth(ref auth) = err
                && err.status().is_client_error()
            {
                return Ok((err.status(), page(shell, auth.public_message())).into_response());
            }
            Err(err)
        }
    }
}

/// Sign out, keeping the cart.
#[instrument(skip(session))]
pub async fn sign_out(session: Session) -> Result<Redirect> {
    clear_current_user(&session).await?;
    clear_sentry_user();
    Ok(Redirect::to(DEFAULT_CALLBACK))
}
