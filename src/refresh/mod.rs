//! Access-token renewal: the orchestrator and its upstream exchange.

mod exchange;
mod orchestrator;

pub use exchange::{
    HttpTokenExchange, RefreshResponse, TokenExchange, UpstreamError,
    DEFAULT_REFRESH_TIMEOUT_SECONDS, LOGOUT_PATH, REFRESH_PATH,
};
pub use orchestrator::{
    RefreshError, RefreshOrchestrator, RefreshResult, DEFAULT_ACCESS_EXPIRY_THRESHOLD_SECONDS,
};
