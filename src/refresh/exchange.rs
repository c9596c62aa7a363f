//! Upstream refresh-token exchange.

use crate::APP_USER_AGENT;
use anyhow::{Context, Result};
use reqwest::{header::CONTENT_TYPE, Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::{future::Future, time::Duration};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;
use utoipa::ToSchema;

pub const REFRESH_PATH: &str = "/api/auth/refresh";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const DEFAULT_REFRESH_TIMEOUT_SECONDS: u64 = 5;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("token exchange request failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("token exchange timed out")]
    Timeout,
    #[error("token exchange returned status {0}")]
    Status(StatusCode),
    #[error("token exchange returned content type {0}")]
    ContentType(String),
    #[error("token exchange returned an invalid body: {0}")]
    Body(String),
}

impl From<reqwest::Error> for UpstreamError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Body(err.to_string())
        } else {
            Self::Transport(err)
        }
    }
}

/// Body of a successful `POST /api/auth/refresh`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RefreshResponse {
    pub token_access: String,
}

/// Exchanges a refresh token for a new access token.
pub trait TokenExchange: Send + Sync {
    fn exchange(
        &self,
        token_refresh: &str,
    ) -> impl Future<Output = Result<String, UpstreamError>> + Send;
}

/// [`TokenExchange`] against the user service over HTTP.
#[derive(Debug, Clone)]
pub struct HttpTokenExchange {
    client: Client,
    url: Url,
    logout_url: Url,
}

impl HttpTokenExchange {
    /// # Errors
    /// Returns an error if `user_origin` is not a valid base URL or the HTTP
    /// client cannot be built.
    pub fn new(user_origin: &str, timeout: Duration) -> Result<Self> {
        let origin = Url::parse(user_origin)
            .with_context(|| format!("Invalid user service origin: {user_origin}"))?;
        let url = origin.join(REFRESH_PATH)?;
        let logout_url = origin.join(LOGOUT_PATH)?;

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build token exchange HTTP client")?;

        Ok(Self {
            client,
            url,
            logout_url,
        })
    }

    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    #[must_use]
    pub fn logout_url(&self) -> &Url {
        &self.logout_url
    }

    /// End `token_refresh` at the user service.
    ///
    /// # Errors
    /// Returns an error on transport failure, timeout, or a non-2xx status.
    #[instrument(skip_all, fields(url = %self.logout_url))]
    pub async fn revoke(&self, token_refresh: &str) -> Result<(), UpstreamError> {
        let response = self
            .client
            .delete(self.logout_url.clone())
            .bearer_auth(token_refresh)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        debug!("refresh token revoked upstream");
        Ok(())
    }
}

impl TokenExchange for HttpTokenExchange {
    #[instrument(skip_all, fields(url = %self.url))]
    async fn exchange(&self, token_refresh: &str) -> Result<String, UpstreamError> {
        let response = self
            .client
            .post(self.url.clone())
            .bearer_auth(token_refresh)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(UpstreamError::Status(status));
        }

        let media_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map_or_else(|| "text/plain".to_string(), |value| value.trim().to_string());
        if !media_type.eq_ignore_ascii_case("application/json") {
            return Err(UpstreamError::ContentType(media_type));
        }

        let body: RefreshResponse = response.json().await?;
        debug!("access token renewed upstream");

        Ok(body.token_access)
    }
}
