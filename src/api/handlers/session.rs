use super::commit_session;
use crate::{
    api::state::WebState,
    session::{Flash, UserIdentity},
};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// What a page render needs from the session. Tokens never leave the cookie.
#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct SessionSummary {
    pub user: Option<UserIdentity>,
    pub flash: Option<Flash>,
}

#[utoipa::path(
    get,
    path= "/session",
    responses (
        (status = 200, description = "Current user and pending flash", body = SessionSummary),
        (status = 500, description = "Session cookie could not be written")
    ),
    tag= "session"
)]
pub async fn session(headers: HeaderMap, state: Extension<Arc<WebState>>) -> Response {
    let store = state.store();
    let mut session = store.read_headers(&headers);

    let summary = SessionSummary {
        user: session.user().map(|user| user.identity()),
        flash: session.take_flash(),
    };

    // Only rewrite the cookie when reading consumed a flash.
    if summary.flash.is_none() {
        return (StatusCode::OK, Json(summary)).into_response();
    }

    match commit_session(store, &session) {
        Ok(cookie) => (StatusCode::OK, cookie, Json(summary)).into_response(),
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        api::handlers::test_support::{cookie_for, request_cookie, user, web_state},
        session::Session,
    };
    use axum::{
        body::Body,
        http::{
            header::{COOKIE, SET_COOKIE},
            Request,
        },
        routing::get,
        Router,
    };
    use chrono::{Duration, Utc};
    use tower::ServiceExt;

    async fn get_session(state: Arc<WebState>, cookie: Option<String>) -> Response {
        let app = Router::new()
            .route("/session", get(session))
            .layer(Extension(state));
        let mut request = Request::builder().uri("/session");
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        app.oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn summary(response: Response) -> SessionSummary {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn anonymous_session_is_empty() {
        let response = get_session(web_state("http://127.0.0.1:9"), None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert_eq!(
            summary(response).await,
            SessionSummary {
                user: None,
                flash: None
            }
        );
    }

    #[tokio::test]
    async fn summary_hides_tokens_and_consumes_flash() {
        let state = web_state("http://127.0.0.1:9");
        let mut session = Session::default();
        session.set_user(user("access".to_string(), Utc::now() + Duration::days(1)));
        session.flash_error("Welcome back");
        let cookie = cookie_for(&state, &session);

        let response = get_session(state.clone(), Some(cookie)).await;
        let set_cookie = response.headers().get(SET_COOKIE).unwrap().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(!body.contains("access"));
        assert!(!body.contains("refresh-token"));

        let summary: SessionSummary = serde_json::from_str(&body).unwrap();
        assert_eq!(summary.user.unwrap().username, "xenobas");
        assert_eq!(
            summary.flash,
            Some(Flash::Error {
                message: "Welcome back".to_string()
            })
        );

        let mut next = state.store().read(Some(&request_cookie(&set_cookie)));
        assert!(next.user().is_some());
        assert!(next.take_flash().is_none());
    }
}
