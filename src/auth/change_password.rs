//! Changing the password of the logged in user.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    auth::CurrentUser,
    extract::AppJson,
    user::{get_user_by_id, update_password},
    validation::{Validate, ValidationErrors, required},
};

/// The state needed for changing a password.
#[derive(Debug, Clone)]
pub struct ChangePasswordState {
    /// The bcrypt cost for hashing the new password.
    pub password_hash_cost: u32,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ChangePasswordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            password_hash_cost: state.password_hash_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw change-password request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    /// The user's current password.
    pub old_password: String,
    /// The password to change to.
    pub new_password: String,
}

/// A change-password request that passed validation.
#[derive(Debug, Clone)]
pub struct PasswordChange {
    /// The user's current password, unchecked.
    pub old_password: String,
    /// The password to change to.
    pub new_password: ValidatedPassword,
}

impl Validate for ChangePasswordRequest {
    type Output = PasswordChange;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let old_password = errors.check(
            "oldPassword",
            required(&self.old_password, "Current password"),
        );
        let new_password = errors.check("newPassword", ValidatedPassword::new(&self.new_password));

        match (old_password, new_password) {
            (Some(old_password), Some(new_password)) if errors.is_empty() => Ok(PasswordChange {
                old_password,
                new_password,
            }),
            _ => Err(errors),
        }
    }
}

/// Replace the logged in user's password after checking the current one.
///
/// # Errors
/// Returns a validation error naming `oldPassword` if the current password is
/// wrong, a validation error for a weak new password, or an internal error.
pub async fn change_password(
    State(state): State<ChangePasswordState>,
    CurrentUser(user_id): CurrentUser,
    AppJson(request): AppJson<ChangePasswordRequest>,
) -> Result<Json<Value>, Error> {
    let change = request.validate()?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let user = get_user_by_id(user_id, &connection)?;

    let old_password_is_correct = user
        .password_hash
        .verify(&change.old_password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !old_password_is_correct {
        let mut errors = ValidationErrors::new();
        errors.add("oldPassword", "Current password is incorrect");
        return Err(errors.into());
    }

    let password_hash = PasswordHash::new(change.new_password, state.password_hash_cost)?;
    update_password(user_id, &password_hash, &connection)?;

    tracing::info!("changed password for user {user_id}");

    Ok(Json(json!({ "message": "Password updated" })))
}
