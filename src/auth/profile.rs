//! Reading and updating the logged in user's profile.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::CurrentUser,
    extract::AppJson,
    user::{Email, PersonName, ProfilePatch, UserProfile, get_user_by_id, update_profile},
    validation::{Validate, ValidationErrors},
};

/// The state needed for the profile endpoints.
#[derive(Debug, Clone)]
pub struct ProfileState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw update-profile request. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    /// The new display name.
    pub name: Option<String>,
    /// The new email.
    pub email: Option<String>,
}

impl Validate for UpdateProfileRequest {
    type Output = ProfilePatch;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let name = errors.check_optional("name", self.name, |name| PersonName::new(&name));
        let email = errors.check_optional("email", self.email, |email| Email::new(&email));

        match (name, email) {
            (Some(name), Some(email)) if errors.is_empty() => Ok(ProfilePatch { name, email }),
            _ => Err(errors),
        }
    }
}

/// Get the profile of the logged in user.
pub async fn get_profile(
    State(state): State<ProfileState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<UserProfile>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_user_by_id(user_id, &connection).map(|user| Json(user.profile()))
}

/// Update the name and/or email of the logged in user.
///
/// An empty patch is valid and returns the unchanged profile.
pub async fn patch_profile(
    State(state): State<ProfileState>,
    CurrentUser(user_id): CurrentUser,
    AppJson(request): AppJson<UpdateProfileRequest>,
) -> Result<Json<UserProfile>, Error> {
    let patch = request.validate()?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    update_profile(user_id, patch, &connection).map(|user| Json(user.profile()))
}
