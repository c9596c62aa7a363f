//! Signed-cookie session store.
//!
//! The cookie carries the whole session (JSON, base64url, HMAC-signed), so
//! there is no server-side session table. A session cannot be revoked from
//! the server without rotating the session secret.

use super::{Flash, Session, SessionUser};
use crate::token::ConfigurationError;
use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use cookie::{time::Duration, Cookie, CookieJar, Key, SameSite};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

pub const SESSION_COOKIE_NAME: &str = "__foilctf_session";
pub const MIN_SESSION_SECRET_BYTES: usize = 32;
pub const DEFAULT_SESSION_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("session cookie was not signed")]
    Sign,
    #[error("invalid Set-Cookie header: {0}")]
    Header(#[from] InvalidHeaderValue),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user: Option<SessionUser>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    flash: Option<Flash>,
}

pub struct SessionStore {
    key: Key,
    secure: bool,
    ttl_seconds: i64,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("key", &"***")
            .field("secure", &self.secure)
            .field("ttl_seconds", &self.ttl_seconds)
            .finish()
    }
}

impl SessionStore {
    /// Build a store whose signing key is derived from `secret`.
    ///
    /// # Errors
    /// Returns a `ConfigurationError` if the secret is shorter than
    /// [`MIN_SESSION_SECRET_BYTES`].
    pub fn new(secret: &SecretString, secure: bool) -> Result<Self, ConfigurationError> {
        let secret = secret.expose_secret();
        if secret.is_empty() {
            return Err(ConfigurationError::MissingSecret("session secret"));
        }
        if secret.len() < MIN_SESSION_SECRET_BYTES {
            return Err(ConfigurationError::ShortSecret {
                name: "session secret",
                min: MIN_SESSION_SECRET_BYTES,
            });
        }

        Ok(Self {
            key: Key::derive_from(secret.as_bytes()),
            secure,
            ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
        })
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: i64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }

    /// Decode the session from a raw `Cookie` header.
    ///
    /// A missing, tampered, or undecodable cookie yields an empty session.
    #[instrument(skip_all)]
    pub fn read(&self, cookie_header: Option<&str>) -> Session {
        let Some(header) = cookie_header else {
            return Session::default();
        };

        let mut jar = CookieJar::new();
        for cookie in Cookie::split_parse(header).filter_map(Result::ok) {
            if cookie.name() == SESSION_COOKIE_NAME {
                jar.add_original(cookie.into_owned());
            }
        }

        let Some(cookie) = jar.signed(&self.key).get(SESSION_COOKIE_NAME) else {
            debug!("no verifiable session cookie");
            return Session::default();
        };

        let data = Base64UrlUnpadded::decode_vec(cookie.value())
            .ok()
            .and_then(|bytes| serde_json::from_slice::<SessionData>(&bytes).ok());

        match data {
            Some(data) => Session::restored(data.user, data.flash),
            None => {
                debug!("session cookie signed but not decodable");
                Session::default()
            }
        }
    }

    /// Decode the session from request headers, merging every `Cookie` header.
    #[must_use]
    pub fn read_headers(&self, headers: &HeaderMap) -> Session {
        let joined = headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .collect::<Vec<_>>()
            .join("; ");
        if joined.is_empty() {
            Session::default()
        } else {
            self.read(Some(&joined))
        }
    }

    /// Whether this cookie header decodes to a user.
    #[must_use]
    pub fn read_user(&self, cookie_header: Option<&str>) -> Option<SessionUser> {
        self.read(cookie_header).user().cloned()
    }

    /// Encode `session` into a `Set-Cookie` value. A flash set during this
    /// request wins; an incoming flash survives only if it was never taken.
    ///
    /// # Errors
    /// Returns an error if the session cannot be serialized or the cookie is
    /// not a valid header value.
    #[instrument(skip_all)]
    pub fn write(&self, session: &Session) -> Result<HeaderValue, SessionError> {
        let data = SessionData {
            user: session.user().cloned(),
            flash: session
                .outgoing_flash()
                .or_else(|| session.unread_flash())
                .cloned(),
        };
        let value = Base64UrlUnpadded::encode_string(&serde_json::to_vec(&data)?);

        let mut jar = CookieJar::new();
        jar.signed_mut(&self.key)
            .add(self.cookie(value, Duration::seconds(self.ttl_seconds)));
        let signed = jar.get(SESSION_COOKIE_NAME).ok_or(SessionError::Sign)?;

        Ok(HeaderValue::from_str(&signed.to_string())?)
    }

    /// A `Set-Cookie` value that removes the session cookie.
    ///
    /// # Errors
    /// Returns an error if the cookie is not a valid header value.
    pub fn destroy(&self) -> Result<HeaderValue, SessionError> {
        let cookie = self.cookie(String::new(), Duration::ZERO);
        Ok(HeaderValue::from_str(&cookie.to_string())?)
    }

    fn cookie(&self, value: String, max_age: Duration) -> Cookie<'static> {
        Cookie::build((SESSION_COOKIE_NAME, value))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(max_age)
            .build()
    }
}
