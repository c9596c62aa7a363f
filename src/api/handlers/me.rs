use crate::session::{SessionUser, UserIdentity};
use axum::{extract::Extension, response::Json};

#[utoipa::path(
    get,
    path= "/me",
    responses (
        (status = 200, description = "The signed-in user", body = UserIdentity),
        (status = 303, description = "No session, redirect to sign-in")
    ),
    tag= "session"
)]
// requires the session guard in front of it
pub async fn me(Extension(user): Extension<SessionUser>) -> Json<UserIdentity> {
    Json(user.identity())
}
