//! Customer account commands.

use bazaar_storefront::db::PgUserRepository;
use bazaar_storefront::services::auth::{AuthError, AuthService};

use super::{CommandError, connect};

#[derive(Debug, thiserror::Error)]
pub enum UserCommandError {
    #[error(transparent)]
    Connect(#[from] CommandError),

    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Create a customer account with the same rules as the sign-up form.
pub async fn create(email: &str, name: &str, password: &str) -> Result<(), UserCommandError> {
    let pool = connect().await?;
    let users = PgUserRepository::new(pool);

    let user = AuthService::new(&users).register(name, email, password).await?;

    tracing::info!("User created! ID: {}, Email: {}", user.id, user.email);
    Ok(())
}
