use super::commit_session;
use crate::api::state::WebState;
use axum::{
    extract::Extension,
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Ends the refresh token at the user service, then clears the session user.
/// An unreachable user service does not block sign-out.
#[utoipa::path(
    get,
    path= "/signout",
    responses (
        (status = 303, description = "Session user cleared, redirect to /"),
        (status = 500, description = "Session cookie could not be written")
    ),
    tag= "session"
)]
#[instrument(skip_all)]
pub async fn signout(headers: HeaderMap, state: Extension<Arc<WebState>>) -> Response {
    let store = state.store();
    let mut session = store.read_headers(&headers);

    if let Some(user) = session.user() {
        debug!(user_id = user.id, "signing out");
        let exchange = state.orchestrator().exchange();
        if let Err(err) = exchange.revoke(&user.token_refresh).await {
            warn!("Could not invalidate refresh token: {}", err);
        }
    }
    session.clear_user();

    match commit_session(store, &session) {
        Ok(cookie) => (cookie, Redirect::to("/")).into_response(),
        Err(status) => status.into_response(),
    }
}
