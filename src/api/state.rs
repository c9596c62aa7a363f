//! Shared, immutable state for the web gateway and the auth service.

use crate::{
    clock::{Clock, SystemClock},
    refresh::{
        HttpTokenExchange, RefreshOrchestrator, DEFAULT_ACCESS_EXPIRY_THRESHOLD_SECONDS,
        DEFAULT_REFRESH_TIMEOUT_SECONDS,
    },
    session::{SessionStore, DEFAULT_SESSION_TTL_SECONDS},
    token::{AccessVerifier, TokenIssuer},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use url::Url;

pub const DEFAULT_FRONTEND_BASE_URL: &str = "http://localhost:3000";

#[derive(Clone, Debug)]
pub struct WebConfig {
    frontend_base_url: String,
    user_origin: String,
    access_expiry_threshold: u64,
    refresh_timeout_seconds: u64,
    session_ttl_seconds: i64,
}

impl WebConfig {
    #[must_use]
    pub fn new(frontend_base_url: String, user_origin: String) -> Self {
        Self {
            frontend_base_url,
            user_origin,
            access_expiry_threshold: DEFAULT_ACCESS_EXPIRY_THRESHOLD_SECONDS,
            refresh_timeout_seconds: DEFAULT_REFRESH_TIMEOUT_SECONDS,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        }
    }

    #[must_use]
    pub fn with_access_expiry_threshold(mut self, seconds: u64) -> Self {
        self.access_expiry_threshold = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_timeout_seconds(mut self, seconds: u64) -> Self {
        self.refresh_timeout_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn user_origin(&self) -> &str {
        &self.user_origin
    }

    #[must_use]
    pub fn access_expiry_threshold(&self) -> u64 {
        self.access_expiry_threshold
    }

    #[must_use]
    pub fn refresh_timeout_seconds(&self) -> u64 {
        self.refresh_timeout_seconds
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    /// Only mark cookies secure when the frontend is served over HTTPS.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

#[derive(Debug)]
pub struct WebState {
    store: SessionStore,
    orchestrator: RefreshOrchestrator<HttpTokenExchange>,
    frontend_base_url: Url,
}

impl WebState {
    #[must_use]
    pub fn new(
        store: SessionStore,
        orchestrator: RefreshOrchestrator<HttpTokenExchange>,
        frontend_base_url: Url,
    ) -> Self {
        Self {
            store,
            orchestrator,
            frontend_base_url,
        }
    }

    /// Build the gateway state, validating secrets and URLs up front.
    ///
    /// # Errors
    /// Returns an error if a secret is rejected or a URL does not parse.
    pub fn from_config(
        config: &WebConfig,
        access_secret: &SecretString,
        session_secret: &SecretString,
    ) -> Result<Self> {
        let frontend_base_url = Url::parse(config.frontend_base_url())
            .with_context(|| format!("Invalid frontend base URL: {}", config.frontend_base_url()))?;

        let verifier =
            AccessVerifier::new(access_secret).context("Invalid access token configuration")?;
        let store = SessionStore::new(session_secret, config.session_cookie_secure())
            .context("Invalid session configuration")?
            .with_ttl_seconds(config.session_ttl_seconds());
        let exchange = HttpTokenExchange::new(
            config.user_origin(),
            Duration::from_secs(config.refresh_timeout_seconds()),
        )?;
        let orchestrator = RefreshOrchestrator::new(verifier, exchange)
            .with_threshold_seconds(config.access_expiry_threshold());

        Ok(Self::new(store, orchestrator, frontend_base_url))
    }

    #[must_use]
    pub fn store(&self) -> &SessionStore {
        &self.store
    }

    #[must_use]
    pub fn orchestrator(&self) -> &RefreshOrchestrator<HttpTokenExchange> {
        &self.orchestrator
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &Url {
        &self.frontend_base_url
    }

    /// `<frontend>/signin?redirect_uri=<redirect_uri>`
    ///
    /// # Errors
    /// Returns an error if the frontend URL cannot be a base.
    pub fn signin_url(&self, redirect_uri: &str) -> Result<Url, url::ParseError> {
        let mut url = self.frontend_base_url.join("signin")?;
        url.query_pairs_mut()
            .append_pair("redirect_uri", redirect_uri);
        Ok(url)
    }
}

#[derive(Debug)]
pub struct AuthState {
    issuer: TokenIssuer,
    clock: Arc<dyn Clock>,
}

impl AuthState {
    #[must_use]
    pub fn new(issuer: TokenIssuer) -> Self {
        Self {
            issuer,
            clock: Arc::new(SystemClock),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    #[must_use]
    pub fn now(&self) -> i64 {
        self.clock.now_unix()
    }
}
