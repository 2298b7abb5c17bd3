//! Registration of new users.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    extract::AppJson,
    user::{Email, NewUser, PersonName, UserProfile, create_user},
    validation::{Validate, ValidationErrors},
};

/// The state needed for registering a user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The bcrypt cost for hashing the new password.
    pub password_hash_cost: u32,
    /// The database connection for storing the user.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            password_hash_cost: state.password_hash_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw registration request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RegisterRequest {
    /// Email for the new account.
    pub email: String,
    /// Password for the new account.
    pub password: String,
    /// Display name for the new account.
    pub name: String,
}

/// A registration request that passed validation.
#[derive(Debug, Clone)]
pub struct Registration {
    /// Email for the new account.
    pub email: Email,
    /// Password for the new account.
    pub password: ValidatedPassword,
    /// Display name for the new account.
    pub name: PersonName,
}

impl Validate for RegisterRequest {
    type Output = Registration;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = errors.check("email", Email::new(&self.email));
        let password = errors.check("password", ValidatedPassword::new(&self.password));
        let name = errors.check("name", PersonName::new(&self.name));

        match (email, password, name) {
            (Some(email), Some(password), Some(name)) if errors.is_empty() => Ok(Registration {
                email,
                password,
                name,
            }),
            _ => Err(errors),
        }
    }
}

/// Create a new user account.
///
/// Responds with 201 and the new user's profile.
///
/// # Errors
///
/// Returns a validation error for bad fields, [Error::DuplicateEmail] if the
/// email is taken, or an internal error if hashing or the database fails.
pub async fn register_user(
    State(state): State<RegistrationState>,
    AppJson(request): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<UserProfile>), Error> {
    let registration = request.validate()?;
    let password_hash = PasswordHash::new(registration.password, state.password_hash_cost)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let user = create_user(
        NewUser {
            email: registration.email,
            name: registration.name,
            password_hash,
        },
        &connection,
    )?;

    tracing::info!("registered user {}", user.id);

    Ok((StatusCode::CREATED, Json(user.profile())))
}

#[cfg(test)]
mod register_request_tests {
    use crate::{auth::register::RegisterRequest, validation::Validate};

    #[test]
    fn collects_every_violation() {
        let request = RegisterRequest {
            email: "not an email".to_owned(),
            password: "weak".to_owned(),
            name: "A".to_owned(),
        };

        let errors = request.validate().unwrap_err();

        assert!(errors.has_field("email"));
        assert!(errors.has_field("password"));
        assert!(errors.has_field("name"));
    }

    #[test]
    fn normalizes_fields() {
        let request = RegisterRequest {
            email: " Jane@Example.COM ".to_owned(),
            password: "Sup3rSecret".to_owned(),
            name: "  Jane Doe ".to_owned(),
        };

        let registration = request.validate().unwrap();

        assert_eq!(registration.email.as_ref(), "jane@example.com");
        assert_eq!(registration.name.as_ref(), "Jane Doe");
    }
}
