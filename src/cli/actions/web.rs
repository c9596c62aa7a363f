use crate::api::{self, WebConfig, WebState};
use anyhow::Result;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub access_secret: SecretString,
    pub session_secret: SecretString,
    pub user_origin: String,
    pub frontend_base_url: String,
    pub access_expiry_threshold: u64,
    pub refresh_timeout_seconds: u64,
    pub session_ttl_seconds: i64,
}

/// Build the gateway state from `args` and serve it.
///
/// # Errors
/// Returns an error if the configuration is rejected or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = WebConfig::new(args.frontend_base_url, args.user_origin)
        .with_access_expiry_threshold(args.access_expiry_threshold)
        .with_refresh_timeout_seconds(args.refresh_timeout_seconds)
        .with_session_ttl_seconds(args.session_ttl_seconds);

    debug!(?config, "web gateway configuration");

    let state = Arc::new(WebState::from_config(
        &config,
        &args.access_secret,
        &args.session_secret,
    )?);

    api::serve("web", args.port, api::web_router(state)).await
}
