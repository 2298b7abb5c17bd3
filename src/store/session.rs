//! The logged in user's credential and profile.

use crate::{store::Store, user::UserProfile};

/// Who is logged in, if anyone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuthSession {
    /// The bearer token sent with API requests.
    pub token: Option<String>,
    /// The logged in user's profile.
    pub user: Option<UserProfile>,
}

impl AuthSession {
    /// Whether there is a token to send.
    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }
}

impl Store<AuthSession> {
    /// Remember the token and profile from a successful log-in.
    pub fn log_in(&self, token: String, user: UserProfile) {
        self.update(|session| {
            session.token = Some(token);
            session.user = Some(user);
        });
    }

    /// Replace the profile, e.g. after the user edits it.
    pub fn set_user(&self, user: UserProfile) {
        self.update(|session| session.user = Some(user));
    }

    /// Forget the token and profile.
    pub fn log_out(&self) {
        self.update(|session| *session = AuthSession::default());
    }
}
