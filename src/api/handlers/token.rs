//! Auth service token endpoints.

use crate::{api::state::AuthState, refresh::RefreshResponse};
use axum::{
    extract::Extension,
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

#[utoipa::path(
    post,
    path= "/api/auth/refresh",
    responses (
        (status = 200, description = "New access token", body = RefreshResponse),
        (status = 401, description = "Missing or malformed bearer token"),
        (status = 403, description = "Refresh token is invalid or expired"),
        (status = 500, description = "Access token could not be minted")
    ),
    security(("bearer" = [])),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn refresh_token(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> Response {
    let Some(token) = bearer_token(&headers) else {
        debug!("refresh request without bearer token");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    let now = state.now();
    let claims = match state.issuer().verify_refresh(token, now).await {
        Ok(claims) => claims,
        Err(err) => {
            debug!("refresh token rejected: {err}");
            return StatusCode::FORBIDDEN.into_response();
        }
    };

    match state
        .issuer()
        .issue_access(&claims.identity(), now, claims.exp)
    {
        Ok(token_access) => {
            debug!(user_id = claims.id, "access token minted");
            (StatusCode::OK, Json(RefreshResponse { token_access })).into_response()
        }
        Err(err) => {
            error!("Failed to mint access token: {}", err);

            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    delete,
    path= "/api/auth/logout",
    responses (
        (status = 204, description = "Refresh token ended"),
        (status = 401, description = "Missing or malformed bearer token")
    ),
    security(("bearer" = [])),
    tag= "auth"
)]
#[instrument(skip_all)]
pub async fn logout(headers: HeaderMap, state: Extension<Arc<AuthState>>) -> Response {
    let Some(token) = bearer_token(&headers) else {
        debug!("logout request without bearer token");
        return StatusCode::UNAUTHORIZED.into_response();
    };

    // A token that no longer verifies cannot mint anything; logout still succeeds.
    if let Err(err) = state.issuer().revoke_refresh(token, state.now()).await {
        debug!("nothing to revoke: {err}");
    }

    StatusCode::NO_CONTENT.into_response()
}
