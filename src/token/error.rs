use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use thiserror::Error;

/// Startup-time misconfiguration. Fatal to the process, never to a request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    #[error("missing required secret: {0}")]
    MissingSecret(&'static str),
    #[error("{name} must be at least {min} bytes")]
    ShortSecret { name: &'static str, min: usize },
    #[error("token TTL must be positive, got {0}s")]
    NonPositiveTtl(i64),
    #[error("refresh token TTL ({refresh}s) must be greater than access token TTL ({access}s)")]
    TtlOrder { access: i64, refresh: i64 },
}

/// A token failed signature or structural verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("token not yet valid")]
    NotYetValid,
    #[error("token revoked")]
    Revoked,
    #[error("malformed token: {0}")]
    Malformed(String),
}

impl From<JwtError> for VerificationError {
    fn from(err: JwtError) -> Self {
        match err.kind() {
            ErrorKind::InvalidSignature => Self::InvalidSignature,
            ErrorKind::ExpiredSignature => Self::Expired,
            ErrorKind::ImmatureSignature => Self::NotYetValid,
            _ => Self::Malformed(err.to_string()),
        }
    }
}
