//! Browser sessions: the signed-cookie store and the per-request view of it.

mod store;
mod user;

pub use store::{
    SessionError, SessionStore, DEFAULT_SESSION_TTL_SECONDS, MIN_SESSION_SECRET_BYTES,
    SESSION_COOKIE_NAME,
};
pub use user::{Role, SessionUser, UserIdentity};

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One-shot message for the next page render.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Flash {
    Error { message: String },
    /// OAuth identity with no account yet, handed to the registration page.
    OAuth { login: String, token: String },
}

/// A session as seen by one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    user: Option<SessionUser>,
    incoming_flash: Option<Flash>,
    outgoing_flash: Option<Flash>,
}

impl Session {
    pub(crate) fn restored(user: Option<SessionUser>, flash: Option<Flash>) -> Self {
        Self {
            user,
            incoming_flash: flash,
            outgoing_flash: None,
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    pub fn set_user(&mut self, user: SessionUser) {
        self.user = Some(user);
    }

    pub fn clear_user(&mut self) {
        self.user = None;
    }

    /// Replace the access token of the current user. Returns `false` when
    /// there is no user to update.
    pub fn set_token_access(&mut self, token_access: String) -> bool {
        match self.user.as_mut() {
            Some(user) => {
                user.token_access = token_access;
                true
            }
            None => false,
        }
    }

    /// Consume the flash that arrived with the request.
    pub fn take_flash(&mut self) -> Option<Flash> {
        self.incoming_flash.take()
    }

    pub(crate) fn unread_flash(&self) -> Option<&Flash> {
        self.incoming_flash.as_ref()
    }

    pub fn flash(&mut self, flash: Flash) {
        self.outgoing_flash = Some(flash);
    }

    pub fn flash_error(&mut self, message: impl Into<String>) {
        self.flash(Flash::Error {
            message: message.into(),
        });
    }

    #[must_use]
    pub fn outgoing_flash(&self) -> Option<&Flash> {
        self.outgoing_flash.as_ref()
    }
}
