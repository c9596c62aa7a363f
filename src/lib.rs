//! # FoilCTF session gateway
//!
//! `foilctf` owns the session token lifecycle of the FoilCTF platform: access
//! and refresh token issuance, threshold-based renewal of access tokens, and
//! session invalidation.
//!
//! ## Services
//!
//! - **web**: browser-facing gateway. The session lives in a signed cookie
//!   (`__foilctf_session`), so any instance can serve any request without a
//!   shared session backend.
//! - **auth**: the user-service token endpoint (`POST /api/auth/refresh`) the
//!   gateway calls to exchange a refresh token for a new access token.
//!
//! ## Refresh flow
//!
//! Session store → access-token verifier → refresh orchestrator → upstream
//! token exchange → session store (write-back). Every step returns a tagged
//! result; failures invalidate the session and surface a one-shot flash
//! message instead of propagating as errors.

pub mod api;
pub mod cli;
pub mod clock;
pub mod refresh;
pub mod session;
pub mod token;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
