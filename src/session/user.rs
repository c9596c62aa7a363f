use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    User,
}

/// Who a session or token belongs to, without any credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserIdentity {
    pub id: i64,
    pub username: String,
    pub role: Role,
}

/// The authenticated user carried by a session cookie.
///
/// Every field is required when decoding, so a cookie never yields a
/// half-populated user.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub token_access: String,
    pub token_refresh: String,
    /// Absolute expiry of `token_refresh`.
    pub expiry: DateTime<Utc>,
}

impl SessionUser {
    #[must_use]
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }

    /// Whether the refresh token is expired at `now` (Unix seconds).
    /// Compared at millisecond precision.
    #[must_use]
    pub fn refresh_expired_at(&self, now: i64) -> bool {
        self.expiry.timestamp_millis() <= now.saturating_mul(1_000)
    }
}

impl std::fmt::Debug for SessionUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("role", &self.role)
            .field("token_access", &"***")
            .field("token_refresh", &"***")
            .field("expiry", &self.expiry)
            .finish()
    }
}
