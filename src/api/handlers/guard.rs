//! Session guards for protected routes.

use super::commit_session;
use crate::{api::state::WebState, session::Role};
use axum::{
    body::Body,
    extract::{Extension, Request},
    http::{header::HOST, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

pub const MISSING_PRIVILEGES: &str = "Missing required privileges";

/// Let the request through only when the session holds a user; the user is
/// then available to the handler as `Extension<SessionUser>`. Otherwise
/// redirect to sign-in with the original URI as `redirect_uri`.
pub async fn require_session(
    state: Extension<Arc<WebState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    if let Some(user) = state.store().read_headers(request.headers()).user().cloned() {
        request.extensions_mut().insert(user);
        return next.run(request).await;
    }

    debug!("no session user, redirecting to sign-in");
    redirect_to_signin(&state, &request)
}

/// Like [`require_session`], and the user must also be an administrator.
/// Anyone else is sent to `/` with a flash.
pub async fn require_admin(
    state: Extension<Arc<WebState>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let mut session = state.store().read_headers(request.headers());

    let Some(user) = session.user().cloned() else {
        debug!("no session user, redirecting to sign-in");
        return redirect_to_signin(&state, &request);
    };

    if user.role != Role::Admin {
        debug!(user_id = user.id, "admin route denied");
        session.flash_error(MISSING_PRIVILEGES);
        return match commit_session(state.store(), &session) {
            Ok(cookie) => (cookie, Redirect::to("/")).into_response(),
            Err(status) => status.into_response(),
        };
    }

    request.extensions_mut().insert(user);
    next.run(request).await
}

fn redirect_to_signin(state: &WebState, request: &Request<Body>) -> Response {
    let original = original_uri(state, request);

    match state.signin_url(&original) {
        Ok(signin) => Redirect::to(signin.as_str()).into_response(),
        Err(err) => {
            error!("Failed to build sign-in URL: {}", err);

            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Absolute URI of the request as the browser saw it.
fn original_uri(state: &WebState, request: &Request<Body>) -> String {
    let path_and_query = request
        .uri()
        .path_and_query()
        .map_or("/", |value| value.as_str());

    let base = state.frontend_base_url();
    let host = request
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok());

    match host {
        Some(host) => format!("{}://{host}{path_and_query}", base.scheme()),
        None => base
            .join(path_and_query)
            .map_or_else(|_| path_and_query.to_string(), |url| url.to_string()),
    }
}
