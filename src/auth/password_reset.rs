//! The forgot-password and reset-password flow.
//!
//! A reset token is a random 32 byte value sent to the user out of band. Only
//! its SHA-256 digest is stored, so a leaked database cannot be used to reset
//! passwords. Tokens expire and can be used once.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
};
use rand::Rng;
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    extract::AppJson,
    user::{Email, UserID, get_user_by_email, update_password},
    validation::{Validate, ValidationErrors, required},
};

/// How long a password reset token is valid for by default.
pub const DEFAULT_RESET_TOKEN_DURATION: Duration = Duration::hours(1);

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, password reset instructions have been sent";

/// Create the table for password reset tokens.
///
/// # Errors
/// Returns an error if the SQL query fails.
pub fn create_password_reset_token_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS password_reset_token (
                id INTEGER PRIMARY KEY,
                user_id INTEGER NOT NULL,
                token_hash TEXT NOT NULL UNIQUE,
                expires_at INTEGER NOT NULL,
                used INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY(user_id) REFERENCES user(id) ON UPDATE CASCADE ON DELETE CASCADE
                )",
        (),
    )?;

    Ok(())
}

fn digest_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

/// Create a reset token for `user_id` that expires at `expires_at`.
///
/// Returns the plain token. Only its digest is stored.
///
/// # Errors
/// Returns an error if the token could not be stored.
pub fn create_reset_token(
    user_id: UserID,
    expires_at: OffsetDateTime,
    connection: &Connection,
) -> Result<String, Error> {
    let mut bytes = [0u8; 32];
    rand::rng().fill(&mut bytes);
    let token = hex::encode(bytes);

    connection.execute(
        "INSERT INTO password_reset_token (user_id, token_hash, expires_at) VALUES (?1, ?2, ?3)",
        (
            user_id.as_i64(),
            digest_token(&token),
            expires_at.unix_timestamp(),
        ),
    )?;

    Ok(token)
}

/// Mark `token` as used and return the user it was issued to.
///
/// # Errors
/// Returns [Error::InvalidResetToken] if the token is unknown, already used or
/// expired at `now`.
pub fn consume_reset_token(
    token: &str,
    now: OffsetDateTime,
    connection: &Connection,
) -> Result<UserID, Error> {
    let row: Option<(i64, i64, i64, bool)> = connection
        .query_row(
            "SELECT id, user_id, expires_at, used FROM password_reset_token WHERE token_hash = ?1",
            [digest_token(token)],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )
        .optional()?;

    let (id, user_id, expires_at, used) = row.ok_or(Error::InvalidResetToken)?;

    if used || expires_at <= now.unix_timestamp() {
        return Err(Error::InvalidResetToken);
    }

    connection.execute(
        "UPDATE password_reset_token SET used = 1 WHERE id = ?1",
        [id],
    )?;

    Ok(UserID::new(user_id))
}

/// The state needed for the password reset flow.
#[derive(Debug, Clone)]
pub struct PasswordResetState {
    /// How long a reset token is valid for.
    pub reset_token_duration: Duration,
    /// The bcrypt cost for hashing the new password.
    pub password_hash_cost: u32,
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for PasswordResetState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            reset_token_duration: state.reset_token_duration,
            password_hash_cost: state.password_hash_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The raw forgot-password request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ForgotPasswordRequest {
    /// The email of the account to reset.
    pub email: String,
}

impl Validate for ForgotPasswordRequest {
    type Output = Email;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        match errors.check("email", Email::new(&self.email)) {
            Some(email) => Ok(email),
            None => Err(errors),
        }
    }
}

/// The raw reset-password request.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// The token the user received.
    pub token: String,
    /// The password to set.
    pub new_password: String,
}

/// A reset-password request that passed validation.
#[derive(Debug, Clone)]
pub struct PasswordReset {
    /// The token the user received.
    pub token: String,
    /// The password to set.
    pub new_password: ValidatedPassword,
}

impl Validate for ResetPasswordRequest {
    type Output = PasswordReset;

    fn validate(self) -> Result<Self::Output, ValidationErrors> {
        let mut errors = ValidationErrors::new();

        let token = errors.check("token", required(&self.token, "Token"));
        let new_password = errors.check("newPassword", ValidatedPassword::new(&self.new_password));

        match (token, new_password) {
            (Some(token), Some(new_password)) if errors.is_empty() => Ok(PasswordReset {
                token: token.trim().to_owned(),
                new_password,
            }),
            _ => Err(errors),
        }
    }
}

/// Start a password reset.
///
/// Always responds with 202 and the same message so that clients cannot
/// probe which emails are registered. Delivering the token to the user is
/// left to an external mailer; the token is only written to the debug log.
///
/// # Errors
/// Returns a validation error for a malformed email or an internal error if
/// the database fails.
pub async fn forgot_password(
    State(state): State<PasswordResetState>,
    AppJson(request): AppJson<ForgotPasswordRequest>,
) -> Result<(StatusCode, Json<Value>), Error> {
    let email = request.validate()?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    match get_user_by_email(&email, &connection) {
        Ok(user) => {
            let expires_at = OffsetDateTime::now_utc() + state.reset_token_duration;
            let token = create_reset_token(user.id, expires_at, &connection)?;
            tracing::info!("issued password reset token for user {}", user.id);
            tracing::debug!("password reset token for user {}: {token}", user.id);
        }
        Err(Error::NotFound) => {
            tracing::info!("password reset requested for unregistered email");
        }
        Err(error) => return Err(error),
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(json!({ "message": FORGOT_PASSWORD_MESSAGE })),
    ))
}

/// Set a new password using a reset token.
///
/// # Errors
/// Returns a validation error for bad fields, [Error::InvalidResetToken] for
/// an unknown, used or expired token, or an internal error.
pub async fn reset_password(
    State(state): State<PasswordResetState>,
    AppJson(request): AppJson<ResetPasswordRequest>,
) -> Result<Json<Value>, Error> {
    let reset = request.validate()?;
    let password_hash = PasswordHash::new(reset.new_password, state.password_hash_cost)?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let transaction = connection.unchecked_transaction()?;
    let user_id = consume_reset_token(&reset.token, OffsetDateTime::now_utc(), &transaction)?;
    update_password(user_id, &password_hash, &transaction)?;
    transaction.commit()?;

    tracing::info!("reset password for user {user_id}");

    Ok(Json(json!({ "message": "Password has been reset" })))
}

#[cfg(test)]
mod reset_token_tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime};

    use crate::{
        Error,
        auth::password_reset::{consume_reset_token, create_reset_token},
        db::initialize,
        user::{Email, NewUser, PersonName, User, create_user},
        PasswordHash,
    };

    fn get_connection_and_user() -> (Connection, User) {
        let connection = Connection::open_in_memory().unwrap();
        initialize(&connection).unwrap();
        let user = create_user(
            NewUser {
                email: Email::new_unchecked("foo@bar.baz"),
                name: PersonName::new_unchecked("Foo"),
                password_hash: PasswordHash::new_unchecked("hunter2"),
            },
            &connection,
        )
        .unwrap();

        (connection, user)
    }

    #[test]
    fn token_can_be_used_once() {
        let (connection, user) = get_connection_and_user();
        let now = OffsetDateTime::now_utc();
        let token = create_reset_token(user.id, now + Duration::hours(1), &connection).unwrap();

        assert_eq!(consume_reset_token(&token, now, &connection), Ok(user.id));
        assert_eq!(
            consume_reset_token(&token, now, &connection),
            Err(Error::InvalidResetToken)
        );
    }

    #[test]
    fn expired_token_is_rejected() {
        let (connection, user) = get_connection_and_user();
        let now = OffsetDateTime::now_utc();
        let token = create_reset_token(user.id, now + Duration::hours(1), &connection).unwrap();

        let result = consume_reset_token(&token, now + Duration::hours(2), &connection);

        assert_eq!(result, Err(Error::InvalidResetToken));
    }

    #[test]
    fn unknown_token_is_rejected() {
        let (connection, _) = get_connection_and_user();

        let result = consume_reset_token("deadbeef", OffsetDateTime::now_utc(), &connection);

        assert_eq!(result, Err(Error::InvalidResetToken));
    }

    #[test]
    fn token_is_not_stored_in_plain_text() {
        let (connection, user) = get_connection_and_user();
        let token = create_reset_token(
            user.id,
            OffsetDateTime::now_utc() + Duration::hours(1),
            &connection,
        )
        .unwrap();

        let stored: String = connection
            .query_row("SELECT token_hash FROM password_reset_token", [], |row| {
                row.get(0)
            })
            .unwrap();

        assert_ne!(stored, token);
        assert_eq!(token.len(), 64);
    }
}
