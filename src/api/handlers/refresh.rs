use super::commit_session;
use crate::{api::state::WebState, refresh::RefreshResult};
use axum::{
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Redirect, Response},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct RefreshStatus {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_access: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RefreshStatus {
    fn ok(token_access: String) -> Self {
        Self {
            ok: true,
            token_access: Some(token_access),
            error: None,
        }
    }

    fn error(message: String) -> Self {
        Self {
            ok: false,
            token_access: None,
            error: Some(message),
        }
    }
}

#[utoipa::path(
    post,
    path= "/refresh",
    responses (
        (status = 200, description = "Access token is current or was renewed", body = RefreshStatus),
        (status = 303, description = "Session ended, sign in again"),
        (status = 401, description = "No usable session", body = RefreshStatus),
        (status = 500, description = "Session cookie could not be written")
    ),
    tag= "session"
)]
#[instrument(skip_all)]
pub async fn refresh(headers: HeaderMap, state: Extension<Arc<WebState>>) -> Response {
    let store = state.store();
    let mut session = store.read_headers(&headers);

    match state.orchestrator().maybe_refresh(&mut session).await {
        RefreshResult::Unchanged(token_access) => {
            (StatusCode::OK, Json(RefreshStatus::ok(token_access))).into_response()
        }
        RefreshResult::Renewed(token_access) => match commit_session(store, &session) {
            Ok(cookie) => (
                StatusCode::OK,
                cookie,
                Json(RefreshStatus::ok(token_access)),
            )
                .into_response(),
            Err(status) => status.into_response(),
        },
        RefreshResult::Invalidated(reason) => {
            debug!("refresh rejected: {reason}");
            match commit_session(store, &session) {
                Ok(cookie) => (
                    StatusCode::UNAUTHORIZED,
                    cookie,
                    Json(RefreshStatus::error(reason.to_string())),
                )
                    .into_response(),
                Err(status) => status.into_response(),
            }
        }
        RefreshResult::RedirectRequired(reason) => {
            debug!("refresh requires sign-in: {reason}");
            match commit_session(store, &session) {
                Ok(cookie) => (cookie, Redirect::to("/signin")).into_response(),
                Err(status) => status.into_response(),
            }
        }
    }
}
