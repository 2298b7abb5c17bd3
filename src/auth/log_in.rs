//! Exchanges an email and password for an access token.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error,
    auth::token::{JwtKeys, issue_token},
    extract::AppJson,
    user::{Email, UserProfile, get_user_by_email},
    validation::{Validate, ValidationErrors, required},
};

/// The state needed for logging in a user.
#[derive(Clone)]
pub struct LogInState {
    /// The keys for signing access tokens.
    pub jwt_keys: JwtKeys,
    /// How long an issued token is valid for.
    pub token_duration: Duration,
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            jwt_keys: state.jwt_keys.clone(),
            token_duration: state.token_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw log-in request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LogInRequest {
    /// Email entered during log-in.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
}

/// A log-in request with a well-formed email and a non-empty password.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// The email of the account.
    pub email: Email,
    /// The password to check against the stored hash.
    pub password: String,
}

impl Validate for LogInRequest {
    type Output = Credentials;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let email = errors.check("email", Email::new(&self.email));
        let password = errors.check("password", required(&self.password, "Password"));

        match (email, password) {
            (Some(email), Some(password)) if errors.is_empty() => Ok(Credentials { email, password }),
            _ => Err(errors),
        }
    }
}

/// The body returned after a successful log-in.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogInResponse {
    /// The bearer token to send with later requests.
    pub token: String,
    /// The profile of the logged in user.
    pub user: UserProfile,
}

/// Handler for log-in requests.
///
/// # Errors
///
/// This function will return an error in a few situations.
/// - The email or password fail validation.
/// - The email does not belong to a registered user.
/// - The password is not correct.
/// - An internal error occurred when verifying the password or signing the token.
pub async fn log_in(
    State(state): State<LogInState>,
    AppJson(request): AppJson<LogInRequest>,
) -> Result<Json<LogInResponse>, Error> {
    let credentials = request.validate()?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let user = match get_user_by_email(&credentials.email, &connection) {
        Ok(user) => user,
        Err(Error::NotFound) => return Err(Error::InvalidCredentials),
        Err(error) => return Err(error),
    };

    let password_is_correct = user
        .password_hash
        .verify(&credentials.password)
        .map_err(|error| Error::HashingError(error.to_string()))?;

    if !password_is_correct {
        tracing::warn!("failed log-in attempt for user {}", user.id);
        return Err(Error::InvalidCredentials);
    }

    let token = issue_token(user.id, state.token_duration, &state.jwt_keys)?;

    Ok(Json(LogInResponse {
        token,
        user: user.profile(),
    }))
}

#[cfg(test)]
mod log_in_request_tests {
    use crate::{auth::log_in::LogInRequest, validation::Validate};

    #[test]
    fn empty_request_reports_both_fields() {
        let errors = LogInRequest::default().validate().unwrap_err();

        assert!(errors.has_field("email"));
        assert!(errors.has_field("password"));
    }

    #[test]
    fn login_password_is_not_checked_against_policy() {
        let request = LogInRequest {
            email: "foo@bar.baz".to_owned(),
            password: "short".to_owned(),
        };

        assert!(request.validate().is_ok());
    }
}
