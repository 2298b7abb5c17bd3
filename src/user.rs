//! Code for creating the user table and fetching users from the database.

use std::fmt::Display;

use email_address::EmailAddress;
use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};

use crate::{
    Error, PasswordHash,
    validation::{FieldError, bounded_text},
};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A syntactically valid email address, stored trimmed and lower-cased.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    /// Create and validate an email address.
    ///
    /// # Errors
    ///
    /// This function will return an error if `raw_email` is empty or not a valid email address.
    pub fn new(raw_email: &str) -> Result<Self, FieldError> {
        let email = raw_email.trim();

        if email.is_empty() {
            return Err(FieldError::new("Email is required"));
        }

        if !EmailAddress::is_valid(email) {
            return Err(FieldError::new("Email must be a valid email address"));
        }

        Ok(Self(email.to_lowercase()))
    }

    /// Create a new `Email` without any validation.
    ///
    /// For emails coming from the user (e.g., via the REST API), this function should **not** be used, instead use the checked version.
    pub fn new_unchecked(raw_email: &str) -> Self {
        Self(raw_email.to_owned())
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A person's display name, 2 to 100 characters once trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonName(String);

impl PersonName {
    /// Create and validate a display name.
    ///
    /// # Errors
    ///
    /// This function will return an error if `raw_name` is blank or has the wrong length.
    pub fn new(raw_name: &str) -> Result<Self, FieldError> {
        bounded_text(raw_name, "Name", 2, 100).map(Self)
    }

    /// Create a name without validation.
    pub fn new_unchecked(raw_name: &str) -> Self {
        Self(raw_name.to_owned())
    }
}

impl AsRef<str> for PersonName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A user of the application.
///
/// The caller should ensure that `id` is unique.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The email used to log in.
    pub email: Email,
    /// The name shown in the client.
    pub name: PersonName,
    /// The user's password hash.
    pub password_hash: PasswordHash,
}

impl User {
    /// The public view of the user, safe to send to clients.
    pub fn profile(&self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email.clone(),
            name: self.name.clone(),
        }
    }
}

/// The parts of a [User] that may be sent to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    /// The user's ID.
    pub id: UserID,
    /// The email used to log in.
    pub email: Email,
    /// The name shown in the client.
    pub name: PersonName,
}

/// The data needed to register a user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// The email used to log in.
    pub email: Email,
    /// The name shown in the client.
    pub name: PersonName,
    /// The hash of the chosen password.
    pub password_hash: PasswordHash,
}

/// A partial update to a user's profile.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfilePatch {
    /// The new name, if it should change.
    pub name: Option<PersonName>,
    /// The new email, if it should change.
    pub email: Option<Email>,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                password TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let raw_email: String = row.get(1)?;
    let raw_name: String = row.get(2)?;
    let raw_password_hash: String = row.get(3)?;

    Ok(User {
        id: UserID::new(row.get(0)?),
        email: Email::new_unchecked(&raw_email),
        name: PersonName::new_unchecked(&raw_name),
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
    })
}

fn map_unique_email_error(error: rusqlite::Error) -> Error {
    match error {
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: _,
                extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
            },
            Some(ref description),
        ) if description.contains("user.email") => Error::DuplicateEmail,
        error => error.into(),
    }
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a [Error::DuplicateEmail] if the email is already registered,
/// or a [Error::SqlError] if another SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    connection
        .execute(
            "INSERT INTO user (email, name, password) VALUES (?1, ?2, ?3)",
            (
                new_user.email.as_ref(),
                new_user.name.as_ref(),
                new_user.password_hash.as_ref(),
            ),
        )
        .map_err(map_unique_email_error)?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        email: new_user.email,
        name: new_user.name,
        password_hash: new_user.password_hash,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user.
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, db_connection: &Connection) -> Result<User, Error> {
    db_connection
        .prepare("SELECT id, email, name, password FROM user WHERE id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user registered with `email`.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that email.
pub fn get_user_by_email(email: &Email, db_connection: &Connection) -> Result<User, Error> {
    db_connection
        .prepare("SELECT id, email, name, password FROM user WHERE email = :email")?
        .query_row(&[(":email", email.as_ref())], map_user_row)
        .map_err(|error| error.into())
}

/// Replace the password hash of the user `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::NotFound);
    }

    Ok(())
}

/// Apply `patch` to the profile of `user_id` and return the updated user.
///
/// # Errors
///
/// Returns [Error::NotFound] if the user does not exist, or
/// [Error::DuplicateEmail] if the new email belongs to someone else.
pub fn update_profile(
    user_id: UserID,
    patch: ProfilePatch,
    connection: &Connection,
) -> Result<User, Error> {
    connection
        .execute(
            "UPDATE user SET name = COALESCE(?1, name), email = COALESCE(?2, email) WHERE id = ?3",
            (
                patch.name.as_ref().map(|name| name.as_ref()),
                patch.email.as_ref().map(|email| email.as_ref()),
                user_id.as_i64(),
            ),
        )
        .map_err(map_unique_email_error)?;

    get_user_by_id(user_id, connection)
}

#[cfg(test)]
mod email_tests {
    use super::Email;

    #[test]
    fn create_email_success() {
        let email = Email::new(" Foo@Bar.baz ");

        assert_eq!(email.unwrap().as_ref(), "foo@bar.baz");
    }

    #[test]
    fn create_email_fails_with_no_at_symbol() {
        assert!(Email::new("foobar.baz").is_err());
    }

    #[test]
    fn create_email_fails_with_empty_string() {
        assert!(Email::new("").is_err());
    }
}

#[cfg(test)]
mod user_tests {
    use rusqlite::Connection;

    use crate::{
        Error, PasswordHash,
        user::{
            Email, NewUser, PersonName, ProfilePatch, UserID, create_user, get_user_by_email,
            get_user_by_id, update_password, update_profile,
        },
    };

    use super::create_user_table;

    fn get_db_connection() -> Connection {
        let conn =
            Connection::open_in_memory().expect("Could not create in-memory SQLite database");
        create_user_table(&conn).expect("Could not create user table");

        conn
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            email: Email::new_unchecked(email),
            name: PersonName::new_unchecked("Test User"),
            password_hash: PasswordHash::new_unchecked("hunter2"),
        }
    }

    #[test]
    fn insert_user_succeeds() {
        let db_connection = get_db_connection();

        let inserted_user = create_user(new_user("foo@bar.baz"), &db_connection).unwrap();

        assert!(inserted_user.id.as_i64() > 0);
        assert_eq!(inserted_user.email, Email::new_unchecked("foo@bar.baz"));
    }

    #[test]
    fn insert_user_fails_on_duplicate_email() {
        let db_connection = get_db_connection();
        create_user(new_user("foo@bar.baz"), &db_connection).unwrap();

        let result = create_user(new_user("foo@bar.baz"), &db_connection);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }

    #[test]
    fn get_user_fails_with_non_existent_id() {
        let db_connection = get_db_connection();

        let id = UserID::new(42);

        assert_eq!(get_user_by_id(id, &db_connection), Err(Error::NotFound));
    }

    #[test]
    fn get_user_succeeds_with_existing_id() {
        let db_connection = get_db_connection();
        let test_user = create_user(new_user("foo@bar.baz"), &db_connection).unwrap();

        let retrieved_user = get_user_by_id(test_user.id, &db_connection).unwrap();

        assert_eq!(retrieved_user, test_user);
    }

    #[test]
    fn get_user_by_email_succeeds() {
        let db_connection = get_db_connection();
        let test_user = create_user(new_user("foo@bar.baz"), &db_connection).unwrap();

        let retrieved_user =
            get_user_by_email(&Email::new_unchecked("foo@bar.baz"), &db_connection).unwrap();

        assert_eq!(retrieved_user, test_user);
    }

    #[test]
    fn update_password_replaces_hash() {
        let db_connection = get_db_connection();
        let test_user = create_user(new_user("foo@bar.baz"), &db_connection).unwrap();
        let new_hash = PasswordHash::new_unchecked("hunter3");

        update_password(test_user.id, &new_hash, &db_connection).unwrap();

        let retrieved_user = get_user_by_id(test_user.id, &db_connection).unwrap();
        assert_eq!(retrieved_user.password_hash, new_hash);
    }

    #[test]
    fn update_profile_only_changes_given_fields() {
        let db_connection = get_db_connection();
        let test_user = create_user(new_user("foo@bar.baz"), &db_connection).unwrap();
        let patch = ProfilePatch {
            name: Some(PersonName::new_unchecked("New Name")),
            email: None,
        };

        let updated = update_profile(test_user.id, patch, &db_connection).unwrap();

        assert_eq!(updated.name, PersonName::new_unchecked("New Name"));
        assert_eq!(updated.email, test_user.email);
    }

    #[test]
    fn update_profile_fails_on_taken_email() {
        let db_connection = get_db_connection();
        create_user(new_user("taken@bar.baz"), &db_connection).unwrap();
        let test_user = create_user(new_user("foo@bar.baz"), &db_connection).unwrap();
        let patch = ProfilePatch {
            name: None,
            email: Some(Email::new_unchecked("taken@bar.baz")),
        };

        let result = update_profile(test_user.id, patch, &db_connection);

        assert_eq!(result, Err(Error::DuplicateEmail));
    }
}
