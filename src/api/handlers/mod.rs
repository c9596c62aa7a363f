pub mod admin;
pub mod guard;
pub mod health;
pub mod me;
pub mod oauth;
pub mod refresh;
pub mod session;
pub mod signout;
pub mod token;

// common functions for the handlers
use crate::session::{Session, SessionStore};
use axum::http::{header::SET_COOKIE, HeaderMap, StatusCode};
use tracing::error;
use url::Url;

/// Headers that persist `session` in the browser.
pub(crate) fn commit_session(
    store: &SessionStore,
    session: &Session,
) -> Result<HeaderMap, StatusCode> {
    let cookie = store.write(session).map_err(|err| {
        error!("Failed to write session cookie: {}", err);

        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    let mut headers = HeaderMap::new();
    headers.insert(SET_COOKIE, cookie);

    Ok(headers)
}

/// Follow `target` when it is a local path or an absolute URL on the
/// frontend's origin; anything else falls back.
pub(crate) fn local_redirect<'a>(
    target: Option<&'a str>,
    fallback: &'a str,
    frontend: &Url,
) -> &'a str {
    match target {
        Some(target)
            if is_header_safe(target)
                && (is_local_path(target) || is_same_origin(target, frontend)) =>
        {
            target
        }
        _ => fallback,
    }
}

fn is_header_safe(target: &str) -> bool {
    !target.is_empty() && target.bytes().all(|b| b.is_ascii_graphic())
}

fn is_local_path(target: &str) -> bool {
    target.starts_with('/') && !target.starts_with("//") && !target.starts_with("/\\")
}

fn is_same_origin(target: &str, frontend: &Url) -> bool {
    Url::parse(target).is_ok_and(|url| url.origin() == frontend.origin())
}
