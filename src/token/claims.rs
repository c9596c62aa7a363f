use crate::session::{Role, UserIdentity};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Decoded access-token payload.
///
/// Unknown fields are kept. A missing or non-numeric `exp` is not a decode
/// failure; the caller decides what it means.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessClaims(Map<String, Value>);

impl AccessClaims {
    /// `exp` in Unix seconds, if the token carries a numeric one.
    #[must_use]
    pub fn exp(&self) -> Option<i64> {
        numeric_seconds(self.0.get("exp")?)
    }

    /// `nbf` in Unix seconds, if the token carries a numeric one.
    #[must_use]
    pub fn nbf(&self) -> Option<i64> {
        numeric_seconds(self.0.get("nbf")?)
    }

    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.0.get("id").and_then(Value::as_i64)
    }

    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.0.get("username").and_then(Value::as_str)
    }

    #[must_use]
    pub fn role(&self) -> Option<Role> {
        self.0
            .get("role")
            .and_then(|role| serde_json::from_value(role.clone()).ok())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl From<Map<String, Value>> for AccessClaims {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

#[allow(clippy::cast_possible_truncation)]
fn numeric_seconds(value: &Value) -> Option<i64> {
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|secs| secs.floor() as i64))
}

/// Payload written into access tokens minted by this crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenPayload {
    pub id: i64,
    pub username: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh-token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub id: i64,
    pub username: String,
    #[serde(default)]
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl RefreshClaims {
    #[must_use]
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
        }
    }
}
