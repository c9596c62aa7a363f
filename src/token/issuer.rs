use super::{
    claims::{AccessTokenPayload, RefreshClaims},
    error::{ConfigurationError, VerificationError},
};
use crate::session::UserIdentity;
use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use utoipa::ToSchema;

pub const DEFAULT_ACCESS_TTL_SECONDS: i64 = 15 * 60;
pub const DEFAULT_REFRESH_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum IssueError {
    #[error("failed to sign token: {0}")]
    Sign(#[from] jsonwebtoken::errors::Error),
    #[error("token expiry out of range: {0}")]
    ExpiryOutOfRange(i64),
}

/// Access and refresh tokens handed out together at sign-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct TokenPair {
    pub token_access: String,
    pub token_refresh: String,
    /// Absolute expiry of `token_refresh`.
    pub expiry: DateTime<Utc>,
}

/// Mints HS256 access and refresh tokens.
///
/// Access and refresh tokens use distinct secrets so a leaked access secret
/// cannot forge refresh tokens. Refresh tokens ended by logout are kept in
/// memory until their own expiry.
pub struct TokenIssuer {
    access_key: EncodingKey,
    refresh_key: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_seconds: i64,
    refresh_ttl_seconds: i64,
    revoked: Mutex<HashMap<String, i64>>,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("access_key", &"***")
            .field("refresh_key", &"***")
            .field("access_ttl_seconds", &self.access_ttl_seconds)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish()
    }
}

impl TokenIssuer {
    /// # Errors
    /// Returns a `ConfigurationError` if a secret is empty, a TTL is not
    /// positive, or the refresh TTL does not outlive the access TTL.
    pub fn new(
        access_secret: &SecretString,
        refresh_secret: &SecretString,
        access_ttl_seconds: i64,
        refresh_ttl_seconds: i64,
    ) -> Result<Self, ConfigurationError> {
        let access_secret = access_secret.expose_secret();
        if access_secret.is_empty() {
            return Err(ConfigurationError::MissingSecret("access secret"));
        }
        let refresh_secret = refresh_secret.expose_secret();
        if refresh_secret.is_empty() {
            return Err(ConfigurationError::MissingSecret("refresh secret"));
        }
        for ttl in [access_ttl_seconds, refresh_ttl_seconds] {
            if ttl <= 0 {
                return Err(ConfigurationError::NonPositiveTtl(ttl));
            }
        }
        if refresh_ttl_seconds <= access_ttl_seconds {
            return Err(ConfigurationError::TtlOrder {
                access: access_ttl_seconds,
                refresh: refresh_ttl_seconds,
            });
        }

        Ok(Self {
            access_key: EncodingKey::from_secret(access_secret.as_bytes()),
            refresh_key: EncodingKey::from_secret(refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(refresh_secret.as_bytes()),
            access_ttl_seconds,
            refresh_ttl_seconds,
            revoked: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn access_ttl_seconds(&self) -> i64 {
        self.access_ttl_seconds
    }

    #[must_use]
    pub fn refresh_ttl_seconds(&self) -> i64 {
        self.refresh_ttl_seconds
    }

    /// Mint an access token. Its `exp` is clamped strictly below
    /// `refresh_exp` so it never outlives the refresh token that minted it.
    ///
    /// # Errors
    /// Returns `IssueError::Sign` if encoding fails.
    #[instrument(skip(self), fields(user_id = identity.id))]
    pub fn issue_access(
        &self,
        identity: &UserIdentity,
        now: i64,
        refresh_exp: i64,
    ) -> Result<String, IssueError> {
        let exp = (now + self.access_ttl_seconds).min(refresh_exp - 1);
        let payload = AccessTokenPayload {
            id: identity.id,
            username: identity.username.clone(),
            role: identity.role,
            iat: now,
            exp,
        };
        Ok(encode(&Header::default(), &payload, &self.access_key)?)
    }

    /// Mint a refresh token and return it with its absolute expiry.
    ///
    /// # Errors
    /// Returns an error if encoding fails or the expiry is not representable.
    #[instrument(skip(self), fields(user_id = identity.id))]
    pub fn issue_refresh(
        &self,
        identity: &UserIdentity,
        now: i64,
    ) -> Result<(String, DateTime<Utc>), IssueError> {
        let exp = now + self.refresh_ttl_seconds;
        let expiry = Utc
            .timestamp_opt(exp, 0)
            .single()
            .ok_or(IssueError::ExpiryOutOfRange(exp))?;
        let claims = RefreshClaims {
            id: identity.id,
            username: identity.username.clone(),
            role: identity.role,
            iat: now,
            exp,
        };
        let token = encode(&Header::default(), &claims, &self.refresh_key)?;
        Ok((token, expiry))
    }

    /// Mint a fresh access/refresh pair, as done on sign-in.
    ///
    /// # Errors
    /// Returns an error if either token cannot be minted.
    pub fn issue_pair(&self, identity: &UserIdentity, now: i64) -> Result<TokenPair, IssueError> {
        let (token_refresh, expiry) = self.issue_refresh(identity, now)?;
        let token_access = self.issue_access(identity, now, expiry.timestamp())?;
        Ok(TokenPair {
            token_access,
            token_refresh,
            expiry,
        })
    }

    /// Verify a refresh token at `now`.
    ///
    /// # Errors
    /// Returns `VerificationError::Expired` when `now >= exp`,
    /// `VerificationError::Revoked` after logout, otherwise the signature or
    /// decoding failure.
    #[instrument(skip_all)]
    pub async fn verify_refresh(
        &self,
        token: &str,
        now: i64,
    ) -> Result<RefreshClaims, VerificationError> {
        let claims = self.decode_refresh(token, now)?;
        if self.revoked.lock().await.contains_key(token) {
            return Err(VerificationError::Revoked);
        }
        Ok(claims)
    }

    /// End a refresh token so it can no longer mint access tokens.
    ///
    /// # Errors
    /// Returns the verification failure when the token is not a live refresh
    /// token; nothing is recorded in that case.
    #[instrument(skip_all)]
    pub async fn revoke_refresh(
        &self,
        token: &str,
        now: i64,
    ) -> Result<RefreshClaims, VerificationError> {
        let claims = self.decode_refresh(token, now)?;

        let mut revoked = self.revoked.lock().await;
        revoked.retain(|_, exp| *exp > now);
        revoked.insert(token.to_string(), claims.exp);
        debug!(user_id = claims.id, "refresh token revoked");

        Ok(claims)
    }

    fn decode_refresh(&self, token: &str, now: i64) -> Result<RefreshClaims, VerificationError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<RefreshClaims>(token, &self.refresh_decoding, &validation)?;
        if now >= data.claims.exp {
            return Err(VerificationError::Expired);
        }
        Ok(data.claims)
    }
}
