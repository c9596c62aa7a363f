use super::exchange::{TokenExchange, UpstreamError};
use crate::{
    clock::{Clock, SystemClock},
    session::Session,
    token::{AccessVerifier, Outcome, VerificationError},
};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

pub const DEFAULT_ACCESS_EXPIRY_THRESHOLD_SECONDS: u64 = 20;

/// Why a session was invalidated during a refresh.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error("no session to refresh")]
    NoSession,
    #[error("token could not be verified")]
    Verification(#[source] VerificationError),
    #[error("token must have an exp claim")]
    MissingExp,
    #[error("session has expired")]
    RefreshExpired,
    #[error("could not refresh access token")]
    Upstream(#[source] UpstreamError),
}

impl RefreshError {
    /// Message flashed to the next page render.
    #[must_use]
    pub fn flash_message(&self) -> &'static str {
        match self {
            Self::NoSession => "No session to refresh",
            Self::Verification(_) => "Token could not be verified",
            Self::MissingExp => "Token must have an exp claim",
            Self::RefreshExpired => "Session has expired",
            Self::Upstream(_) => "Could not refresh access token",
        }
    }
}

#[derive(Debug)]
pub enum RefreshResult {
    /// The current access token has enough time left.
    Unchanged(String),
    /// A new access token was minted upstream and written into the session.
    Renewed(String),
    /// The session cannot be refreshed; the caller reports the reason.
    Invalidated(RefreshError),
    /// The session was cleared and the caller must send the user to sign in again.
    RedirectRequired(RefreshError),
}

/// Decides whether a session's access token needs renewal and performs it.
pub struct RefreshOrchestrator<E> {
    verifier: AccessVerifier,
    exchange: E,
    clock: Arc<dyn Clock>,
    threshold_seconds: i64,
}

impl<E: std::fmt::Debug> std::fmt::Debug for RefreshOrchestrator<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RefreshOrchestrator")
            .field("verifier", &self.verifier)
            .field("exchange", &self.exchange)
            .field("clock", &self.clock)
            .field("threshold_seconds", &self.threshold_seconds)
            .finish()
    }
}

impl<E: TokenExchange> RefreshOrchestrator<E> {
    #[must_use]
    pub fn new(verifier: AccessVerifier, exchange: E) -> Self {
        Self {
            verifier,
            exchange,
            clock: Arc::new(SystemClock),
            threshold_seconds: i64::try_from(DEFAULT_ACCESS_EXPIRY_THRESHOLD_SECONDS)
                .unwrap_or(i64::MAX),
        }
    }

    #[must_use]
    pub fn with_threshold_seconds(mut self, seconds: u64) -> Self {
        self.threshold_seconds = i64::try_from(seconds).unwrap_or(i64::MAX);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn threshold_seconds(&self) -> i64 {
        self.threshold_seconds
    }

    #[must_use]
    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    /// Renew the session's access token if it expires within the threshold.
    ///
    /// Only `token_access` is ever written back. Every failure clears the
    /// session user and flashes the reason; nothing is retried.
    #[instrument(skip_all)]
    pub async fn maybe_refresh(&self, session: &mut Session) -> RefreshResult {
        let Some(user) = session.user() else {
            session.flash_error(RefreshError::NoSession.flash_message());
            return RefreshResult::Invalidated(RefreshError::NoSession);
        };
        let user_id = user.id;
        let token_access = user.token_access.clone();
        let token_refresh = user.token_refresh.clone();

        let now = self.clock.now_unix();
        let refresh_expired = user.refresh_expired_at(now);

        match self.verifier.verify(&token_access, now) {
            Outcome::Valid(claims) => {
                let Some(exp) = claims.exp() else {
                    return invalidate(session, RefreshError::MissingExp);
                };
                if exp >= self.threshold_seconds.saturating_add(now) {
                    return RefreshResult::Unchanged(token_access);
                }
                debug!(user_id, exp, now, "access token within renewal threshold");
            }
            Outcome::Expired { exp } => {
                debug!(user_id, exp, now, "access token already expired");
            }
            Outcome::Invalid(err) => {
                return invalidate(session, RefreshError::Verification(err));
            }
        }

        if refresh_expired {
            info!(user_id, "refresh token expired, sign-in required");
            return redirect(session, RefreshError::RefreshExpired);
        }

        match self.exchange.exchange(&token_refresh).await {
            Ok(token_access) => {
                session.set_token_access(token_access.clone());
                debug!(user_id, "access token renewed");
                RefreshResult::Renewed(token_access)
            }
            Err(err) => {
                warn!(user_id, "access token renewal failed: {err}");
                redirect(session, RefreshError::Upstream(err))
            }
        }
    }
}

fn clear(session: &mut Session, reason: &RefreshError) {
    session.clear_user();
    session.flash_error(reason.flash_message());
}

fn invalidate(session: &mut Session, reason: RefreshError) -> RefreshResult {
    debug!("session invalidated: {reason}");
    clear(session, &reason);
    RefreshResult::Invalidated(reason)
}

fn redirect(session: &mut Session, reason: RefreshError) -> RefreshResult {
    clear(session, &reason);
    RefreshResult::RedirectRequired(reason)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::session::{Flash, Role, SessionUser};
    use chrono::{TimeZone, Utc};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use reqwest::StatusCode;
    use secrecy::SecretString;
    use serde_json::{json, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const SECRET: &str = "access-secret";
    const NOW: i64 = 1000;

    /// Records calls and answers with a fixed response.
    #[derive(Debug)]
    struct FakeExchange {
        calls: AtomicUsize,
        status: Option<StatusCode>,
    }

    impl FakeExchange {
        fn ok() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                status: None,
            }
        }

        fn failing(status: StatusCode) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                status: Some(status),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenExchange for FakeExchange {
        async fn exchange(&self, token_refresh: &str) -> Result<String, UpstreamError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(token_refresh, "refresh-token");
            match self.status {
                None => Ok("X".to_string()),
                Some(status) => Err(UpstreamError::Status(status)),
            }
        }
    }

    fn access_token(payload: &Value) -> String {
        encode(
            &Header::default(),
            payload,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    fn session(token_access: String, refresh_expiry_unix: i64) -> Session {
        let mut session = Session::default();
        session.set_user(SessionUser {
            id: 1,
            username: "xenobas".to_string(),
            role: Role::User,
            token_access,
            token_refresh: "refresh-token".to_string(),
            expiry: Utc.timestamp_opt(refresh_expiry_unix, 0).unwrap(),
        });
        session
    }

    fn orchestrator(exchange: FakeExchange, threshold: u64) -> RefreshOrchestrator<FakeExchange> {
        let verifier = AccessVerifier::new(&SecretString::from(SECRET)).unwrap();
        RefreshOrchestrator::new(verifier, exchange)
            .with_threshold_seconds(threshold)
            .with_clock(Arc::new(FixedClock(NOW)))
    }

    fn flashed(session: &Session) -> Option<String> {
        match session.outgoing_flash() {
            Some(Flash::Error { message }) => Some(message.clone()),
            _ => None,
        }
    }

    #[tokio::test]
    async fn default_threshold_is_twenty_seconds() {
        let verifier = AccessVerifier::new(&SecretString::from(SECRET)).unwrap();
        let orchestrator = RefreshOrchestrator::new(verifier, FakeExchange::ok());
        assert_eq!(orchestrator.threshold_seconds(), 20);
    }

    #[tokio::test]
    async fn enough_time_left_is_unchanged_without_network() {
        // threshold=20, now=1000, exp=1025
        let orchestrator = orchestrator(FakeExchange::ok(), 20);
        let token = access_token(&json!({"exp": 1025}));
        let mut session = session(token.clone(), 5000);

        let result = orchestrator.maybe_refresh(&mut session).await;

        assert!(matches!(result, RefreshResult::Unchanged(ref t) if *t == token));
        assert_eq!(orchestrator.exchange().calls(), 0);
        assert_eq!(session.user().unwrap().token_access, token);
    }

    #[tokio::test]
    async fn exact_threshold_boundary_is_unchanged() {
        let orchestrator = orchestrator(FakeExchange::ok(), 20);
        let mut session = session(access_token(&json!({"exp": 1020})), 5000);

        let result = orchestrator.maybe_refresh(&mut session).await;

        assert!(matches!(result, RefreshResult::Unchanged(_)));
        assert_eq!(orchestrator.exchange().calls(), 0);
    }

    #[tokio::test]
    async fn one_second_inside_threshold_renews() {
        let orchestrator = orchestrator(FakeExchange::ok(), 20);
        let mut session = session(access_token(&json!({"exp": 1019})), 5000);

        let result = orchestrator.maybe_refresh(&mut session).await;

        assert!(matches!(result, RefreshResult::Renewed(_)));
        assert_eq!(orchestrator.exchange().calls(), 1);
    }

    #[tokio::test]
    async fn renewal_writes_back_only_the_access_token() {
        // threshold=20, now=1000, exp=1010, upstream answers {token_access: "X"}
        let orchestrator = orchestrator(FakeExchange::ok(), 20);
        let mut session = session(access_token(&json!({"exp": 1010})), 5000);
        let before = session.user().unwrap().clone();

        let result = orchestrator.maybe_refresh(&mut session).await;

        assert!(matches!(result, RefreshResult::Renewed(ref t) if t == "X"));
        assert_eq!(orchestrator.exchange().calls(), 1);
        let after = session.user().unwrap();
        assert_eq!(after.token_access, "X");
        assert_eq!(after.token_refresh, before.token_refresh);
        assert_eq!(after.expiry, before.expiry);
        assert_eq!(after.identity(), before.identity());
        assert!(session.outgoing_flash().is_none());
    }

    #[tokio::test]
    async fn upstream_failure_requires_redirect_and_clears_session() {
        let orchestrator = orchestrator(FakeExchange::failing(StatusCode::INTERNAL_SERVER_ERROR), 20);
        let mut session = session(access_token(&json!({"exp": 1010})), 5000);

        let result = orchestrator.maybe_refresh(&mut session).await;

        assert!(matches!(
            result,
            RefreshResult::RedirectRequired(RefreshError::Upstream(UpstreamError::Status(_)))
        ));
        assert_eq!(orchestrator.exchange().calls(), 1);
        assert!(session.user().is_none());
        assert_eq!(flashed(&session).as_deref(), Some("Could not refresh access token"));
    }

    #[tokio::test]
    async fn expired_refresh_token_redirects_without_network() {
        let orchestrator = orchestrator(FakeExchange::ok(), 20);
        let mut session = session(access_token(&json!({"exp": 1010})), 999);

        let result = orchestrator.maybe_refresh(&mut session).await;

        assert!(matches!(
            result,
            RefreshResult::RedirectRequired(RefreshError::RefreshExpired)
        ));
        assert_eq!(orchestrator.exchange().calls(), 0);
        assert!(session.user().is_none());
        assert_eq!(flashed(&session).as_deref(), Some("Session has expired"));
    }

    #[tokio::test]
    async fn refresh_expiring_exactly_now_is_expired() {
        let orchestrator = orchestrator(FakeExchange::ok(), 20);
        let mut session = session(access_token(&json!({"exp": 1010})), NOW);

        let result = orchestrator.maybe_refresh(&mut session).await;

        assert!(matches!(
            result,
            RefreshResult::RedirectRequired(RefreshError::RefreshExpired)
        ));
        assert_eq!(orchestrator.exchange().calls(), 0);
    }

    #[tokio::test]
    async fn missing_exp_invalidates() {
        let orchestrator = orchestrator(FakeExchange::ok(), 20);
        let mut session = session(access_token(&json!({"id": 1})), 5000);

        let result = orchestrator.maybe_refresh(&mut session).await;

        match result {
            RefreshResult::Invalidated(reason) => {
                assert!(matches!(reason, RefreshError::MissingExp));
                assert_eq!(reason.to_string(), "token must have an exp claim");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(session.user().is_none());
        assert_eq!(orchestrator.exchange().calls(), 0);
    }

    #[tokio::test]
    async fn non_numeric_exp_invalidates() {
        let orchestrator = orchestrator(FakeExchange::ok(), 20);
        let mut session = session(access_token(&json!({"id": 1, "exp": "later"})), 5000);

        let result = orchestrator.maybe_refresh(&mut session).await;

        assert!(matches!(
            result,
            RefreshResult::Invalidated(RefreshError::MissingExp)
        ));
        assert!(session.user().is_none());
    }

    #[tokio::test]
    async fn forged_token_invalidates() {
        let orchestrator = orchestrator(FakeExchange::ok(), 20);
        let forged = encode(
            &Header::default(),
            &json!({"exp": 5000}),
            &EncodingKey::from_secret(b"not-the-secret"),
        )
        .unwrap();
        let mut session = session(forged, 5000);

        let result = orchestrator.maybe_refresh(&mut session).await;

        assert!(matches!(
            result,
            RefreshResult::Invalidated(RefreshError::Verification(
                VerificationError::InvalidSignature
            ))
        ));
        assert!(session.user().is_none());
        assert_eq!(flashed(&session).as_deref(), Some("Token could not be verified"));
    }

    #[tokio::test]
    async fn expired_access_token_renews_even_with_zero_threshold() {
        let orchestrator = orchestrator(FakeExchange::ok(), 0);
        let mut session = session(access_token(&json!({"exp": NOW})), 5000);

        let result = orchestrator.maybe_refresh(&mut session).await;

        assert!(matches!(result, RefreshResult::Renewed(ref t) if t == "X"));
        assert_eq!(orchestrator.exchange().calls(), 1);
    }

    #[tokio::test]
    async fn no_user_is_invalidated_with_flash() {
        let orchestrator = orchestrator(FakeExchange::ok(), 20);
        let mut session = Session::default();

        let result = orchestrator.maybe_refresh(&mut session).await;

        match result {
            RefreshResult::Invalidated(reason) => {
                assert_eq!(reason.to_string(), "no session to refresh");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(flashed(&session).as_deref(), Some("No session to refresh"));
        assert_eq!(orchestrator.exchange().calls(), 0);
    }

    #[tokio::test]
    async fn threshold_sweep_matches_inclusive_rule() {
        for exp in 990..1040 {
            let orchestrator = orchestrator(FakeExchange::ok(), 20);
            let mut session = session(access_token(&json!({"exp": exp})), 5000);

            let result = orchestrator.maybe_refresh(&mut session).await;

            if exp >= 1020 {
                assert!(matches!(result, RefreshResult::Unchanged(_)), "exp={exp}");
                assert_eq!(orchestrator.exchange().calls(), 0, "exp={exp}");
            } else {
                assert!(matches!(result, RefreshResult::Renewed(_)), "exp={exp}");
                assert_eq!(orchestrator.exchange().calls(), 1, "exp={exp}");
            }
        }
    }
}
