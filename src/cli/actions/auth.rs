use crate::{
    api::{self, AuthState},
    token::TokenIssuer,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub access_secret: SecretString,
    pub refresh_secret: SecretString,
    pub access_ttl_seconds: i64,
    pub refresh_ttl_seconds: i64,
}

/// Build the token issuer from `args` and serve the auth routes.
///
/// # Errors
/// Returns an error if the configuration is rejected or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let issuer = TokenIssuer::new(
        &args.access_secret,
        &args.refresh_secret,
        args.access_ttl_seconds,
        args.refresh_ttl_seconds,
    )
    .context("Invalid token configuration")?;

    debug!(?issuer, "auth service configuration");

    let state = Arc::new(AuthState::new(issuer));

    api::serve("auth", args.port, api::auth_router(state)).await
}
