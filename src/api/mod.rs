use anyhow::Result;
use axum::{
    body::Body,
    extract::{Extension, MatchedPath},
    http::{HeaderName, HeaderValue, Request},
    middleware,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{info, info_span, Span};
use ulid::Ulid;

pub mod handlers;
mod openapi;
mod state;

pub use openapi::{auth_openapi, web_openapi};
pub use state::{AuthState, WebConfig, WebState, DEFAULT_FRONTEND_BASE_URL};

use handlers::{admin, guard, health, me, oauth, refresh, session, signout, token};

/// Routes of the browser-facing gateway.
#[must_use]
pub fn web_router(state: Arc<WebState>) -> Router {
    let protected = Router::new()
        .route("/me", get(me::me))
        .route_layer(middleware::from_fn(guard::require_session));

    let privileged = Router::new()
        .route("/admin", get(admin::admin))
        .route_layer(middleware::from_fn(guard::require_admin));

    Router::new()
        .route("/health", get(health::health))
        .route("/refresh", post(refresh::refresh))
        .route("/signout", get(signout::signout))
        .route("/oauth42", get(oauth::oauth42))
        .route("/session", get(session::session))
        .merge(protected)
        .merge(privileged)
        .layer(Extension(state))
}

/// Routes of the auth service.
#[must_use]
pub fn auth_router(state: Arc<AuthState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/auth/refresh", post(token::refresh_token))
        .route("/api/auth/logout", delete(token::logout))
        .layer(Extension(state))
}

/// Wrap `router` with request ids and HTTP tracing.
fn traced(router: Router) -> Router {
    router.layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    )
}

/// Serve `router` on `[::]:port` until Ctrl-C.
///
/// # Errors
/// Return error if failed to bind or serve
pub async fn serve(name: &str, port: u16, router: Router) -> Result<()> {
    let app = traced(router);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("{} listening on [::]:{}", name, port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Gracefully shutdown");
            }
        })
        .await?;

    Ok(())
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
