use crate::session::{SessionUser, UserIdentity};
use axum::{extract::Extension, response::Json};

#[utoipa::path(
    get,
    path= "/admin",
    responses (
        (status = 200, description = "The signed-in administrator", body = UserIdentity),
        (status = 303, description = "No session, or not an administrator")
    ),
    tag= "session"
)]
// requires the admin guard in front of it
pub async fn admin(Extension(user): Extension<SessionUser>) -> Json<UserIdentity> {
    Json(user.identity())
}
