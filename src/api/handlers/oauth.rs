//! OAuth callback: turns the auth service's verdict into a session.

use super::{commit_session, local_redirect};
use crate::{
    api::state::WebState,
    session::{Flash, SessionUser, UserIdentity},
};
use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use base64ct::{Base64, Base64Unpadded, Base64Url, Base64UrlUnpadded, Encoding};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};
use utoipa::IntoParams;

pub const UNKNOWN_RESPONSE: &str = "Unknown response from authentication service";
pub const GENERIC_ERROR: &str = "An internal server error has occurred";

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OAuthCallback {
    /// Base64 JSON verdict from the auth service.
    data: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
    /// Local path, or frontend URL, to continue to.
    redirect_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Authenticated {
    token_access: String,
    token_refresh: String,
    expiry: DateTime<Utc>,
    user: UserIdentity,
}

#[derive(Debug, Deserialize)]
struct Profile {
    login: String,
}

#[derive(Debug, Deserialize)]
struct Unregistered {
    profile: Profile,
    oauth_token: String,
}

#[derive(Debug)]
enum Verdict {
    Authenticated(Authenticated),
    Unregistered(Unregistered),
}

/// Decode the `data` parameter. Accepts standard and URL-safe alphabets,
/// padded or not; a `+` that arrived as a space is restored.
fn decode_verdict(data: &str) -> Option<Verdict> {
    let data = data.trim().replace(' ', "+");
    let bytes = Base64::decode_vec(&data)
        .or_else(|_| Base64Unpadded::decode_vec(&data))
        .or_else(|_| Base64Url::decode_vec(&data))
        .or_else(|_| Base64UrlUnpadded::decode_vec(&data))
        .ok()?;

    let value: Value = serde_json::from_slice(&bytes).ok()?;
    let did_authenticate = value.get("did_authenticate").and_then(Value::as_bool)?;

    if did_authenticate {
        serde_json::from_value(value)
            .ok()
            .map(Verdict::Authenticated)
    } else {
        serde_json::from_value(value).ok().map(Verdict::Unregistered)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.is_empty())
}

#[utoipa::path(
    get,
    path= "/oauth42",
    params(OAuthCallback),
    responses (
        (status = 303, description = "Session updated, redirect to the next page"),
        (status = 500, description = "Session cookie could not be written")
    ),
    tag= "session"
)]
#[instrument(skip_all)]
pub async fn oauth42(
    headers: HeaderMap,
    state: Extension<Arc<WebState>>,
    Query(callback): Query<OAuthCallback>,
) -> Response {
    let store = state.store();
    let mut session = store.read_headers(&headers);
    let mut fallback = "/";

    if let Some(data) = non_empty(callback.data) {
        match decode_verdict(&data) {
            Some(Verdict::Authenticated(verdict)) => {
                debug!(user_id = verdict.user.id, "oauth sign-in");
                session.set_user(SessionUser {
                    id: verdict.user.id,
                    username: verdict.user.username,
                    role: verdict.user.role,
                    token_access: verdict.token_access,
                    token_refresh: verdict.token_refresh,
                    expiry: verdict.expiry,
                });
            }
            Some(Verdict::Unregistered(verdict)) => {
                debug!("oauth identity has no account");
                session.flash(Flash::OAuth {
                    login: verdict.profile.login,
                    token: verdict.oauth_token,
                });
                return match commit_session(store, &session) {
                    Ok(cookie) => (cookie, Redirect::to("/register")).into_response(),
                    Err(status) => status.into_response(),
                };
            }
            None => {
                warn!("undecodable oauth callback data");
                session.flash_error(UNKNOWN_RESPONSE);
            }
        }
    } else {
        let message = non_empty(callback.error_description)
            .or_else(|| non_empty(callback.error))
            .unwrap_or_else(|| GENERIC_ERROR.to_string());
        debug!("oauth callback without data: {message}");
        session.flash_error(message);
        fallback = "/signin";
    }

    let target = local_redirect(
        callback.redirect_uri.as_deref(),
        fallback,
        state.frontend_base_url(),
    );

    match commit_session(store, &session) {
        Ok(cookie) => (cookie, Redirect::to(target)).into_response(),
        Err(status) => status.into_response(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{
        api::handlers::test_support::{request_cookie, web_state},
        session::{Role, Session},
    };
    use axum::{
        body::Body,
        http::{
            header::{LOCATION, SET_COOKIE},
            Request, StatusCode,
        },
        routing::get,
        Router,
    };
    use serde_json::json;
    use tower::ServiceExt;
    use url::form_urlencoded::Serializer;

    async fn call(state: Arc<WebState>, pairs: &[(&str, &str)]) -> (StatusCode, String, Session) {
        let query = Serializer::new(String::new()).extend_pairs(pairs).finish();
        let app = Router::new()
            .route("/oauth42", get(oauth42))
            .layer(Extension(state.clone()));

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/oauth42?{query}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let location = response
            .headers()
            .get(LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let session = state
            .store()
            .read(Some(&request_cookie(response.headers().get(SET_COOKIE).unwrap())));
        (response.status(), location, session)
    }

    fn encode(value: &Value) -> String {
        Base64::encode_string(value.to_string().as_bytes())
    }

    #[tokio::test]
    async fn authenticated_verdict_sets_user() {
        let data = encode(&json!({
            "did_authenticate": true,
            "token_access": "access",
            "token_refresh": "refresh",
            "expiry": "2030-01-01T00:00:00.000Z",
            "user": {"id": 42, "username": "yait-nas", "role": "admin"}
        }));

        let (status, location, session) = call(
            web_state("http://127.0.0.1:9"),
            &[("data", &data), ("redirect_uri", "/challenges")],
        )
        .await;

        assert_eq!(status, StatusCode::SEE_OTHER);
        assert_eq!(location, "/challenges");
        let user = session.user().unwrap();
        assert_eq!(user.id, 42);
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.token_access, "access");
        assert_eq!(user.token_refresh, "refresh");
        assert_eq!(user.expiry.timestamp(), 1_893_456_000);
    }

    #[tokio::test]
    async fn unregistered_verdict_flashes_oauth_identity() {
        let data = encode(&json!({
            "did_authenticate": false,
            "profile": {"id": 1, "login": "xenobas", "email": "x@example.com"},
            "oauth_token": "oauth-token"
        }));

        let (_, location, mut session) =
            call(web_state("http://127.0.0.1:9"), &[("data", &data)]).await;

        assert_eq!(location, "/register");
        assert!(session.user().is_none());
        assert_eq!(
            session.take_flash(),
            Some(Flash::OAuth {
                login: "xenobas".to_string(),
                token: "oauth-token".to_string()
            })
        );
    }

    #[tokio::test]
    async fn missing_data_flashes_error_and_falls_back_to_signin() {
        let (_, location, mut session) = call(
            web_state("http://127.0.0.1:9"),
            &[("error", "access_denied"), ("error_description", "User denied")],
        )
        .await;
        assert_eq!(location, "/signin");
        assert_eq!(
            session.take_flash(),
            Some(Flash::Error {
                message: "User denied".to_string()
            })
        );

        let (_, _, mut session) =
            call(web_state("http://127.0.0.1:9"), &[("error", "access_denied")]).await;
        assert_eq!(
            session.take_flash(),
            Some(Flash::Error {
                message: "access_denied".to_string()
            })
        );

        let (_, _, mut session) = call(web_state("http://127.0.0.1:9"), &[]).await;
        assert_eq!(
            session.take_flash(),
            Some(Flash::Error {
                message: GENERIC_ERROR.to_string()
            })
        );
    }

    #[tokio::test]
    async fn undecodable_data_flashes_unknown_response() {
        let (_, location, mut session) =
            call(web_state("http://127.0.0.1:9"), &[("data", "%%not-base64%%")]).await;
        assert_eq!(location, "/");
        assert_eq!(
            session.take_flash(),
            Some(Flash::Error {
                message: UNKNOWN_RESPONSE.to_string()
            })
        );

        let data = encode(&json!({"did_authenticate": "maybe"}));
        let (_, _, mut session) = call(web_state("http://127.0.0.1:9"), &[("data", &data)]).await;
        assert_eq!(
            session.take_flash(),
            Some(Flash::Error {
                message: UNKNOWN_RESPONSE.to_string()
            })
        );
    }

    #[tokio::test]
    async fn offsite_redirect_is_ignored() {
        let (_, location, _) = call(
            web_state("http://127.0.0.1:9"),
            &[("error", "x"), ("redirect_uri", "https://evil.example/")],
        )
        .await;
        assert_eq!(location, "/signin");
    }

    #[tokio::test]
    async fn frontend_redirect_is_followed() {
        let (_, location, _) = call(
            web_state("http://127.0.0.1:9"),
            &[("error", "x"), ("redirect_uri", "http://localhost:3000/me")],
        )
        .await;
        assert_eq!(location, "http://localhost:3000/me");
    }

    #[test]
    fn decode_accepts_unpadded_and_spaces() {
        let raw = json!({"did_authenticate": false, "profile": {"login": "a"}, "oauth_token": "t"})
            .to_string();
        let unpadded = Base64Unpadded::encode_string(raw.as_bytes());
        assert!(matches!(
            decode_verdict(&unpadded),
            Some(Verdict::Unregistered(_))
        ));

        let spaced = Base64::encode_string(raw.as_bytes()).replace('+', " ");
        assert!(matches!(decode_verdict(&spaced), Some(Verdict::Unregistered(_))));
    }
}
