//! Access/refresh token verification and issuance (HS256 JWT).

mod claims;
mod error;
mod issuer;
mod verifier;

pub use claims::{AccessClaims, AccessTokenPayload, RefreshClaims};
pub use error::{ConfigurationError, VerificationError};
pub use issuer::{
    IssueError, TokenIssuer, TokenPair, DEFAULT_ACCESS_TTL_SECONDS, DEFAULT_REFRESH_TTL_SECONDS,
};
pub use verifier::{AccessVerifier, Outcome};
