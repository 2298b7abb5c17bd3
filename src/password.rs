//! This file defines types that handle password validation and hashing.
//! `ValidatedPassword` wraps a string and ensures it follows the password policy.
//! `PasswordHash` converts a `ValidatedPassword` into a salted and hashed password.

use std::fmt::Display;

use bcrypt::{BcryptError, hash, verify};
use serde::{Deserialize, Serialize};

use crate::{Error, validation::FieldError};

/// The minimum number of characters in a new password.
pub const PASSWORD_MIN_LENGTH: usize = 8;

/// A password that has been validated, but not yet hashed.
///
/// This struct can be used to construct a [PasswordHash].
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPassword(String);

impl ValidatedPassword {
    /// Create and validate a new password from a string.
    ///
    /// A password must be at least [PASSWORD_MIN_LENGTH] characters long and
    /// contain a lowercase letter, an uppercase letter and a digit.
    ///
    /// # Errors
    ///
    /// This function will return an error describing the first rule the
    /// password breaks.
    pub fn new(raw_password_string: &str) -> Result<Self, FieldError> {
        if raw_password_string.is_empty() {
            return Err(FieldError::new("Password is required"));
        }

        if raw_password_string.chars().count() < PASSWORD_MIN_LENGTH {
            return Err(FieldError::new(format!(
                "Password must be at least {PASSWORD_MIN_LENGTH} characters"
            )));
        }

        let has_lowercase = raw_password_string.chars().any(|c| c.is_lowercase());
        let has_uppercase = raw_password_string.chars().any(|c| c.is_uppercase());
        let has_digit = raw_password_string.chars().any(|c| c.is_ascii_digit());

        if !(has_lowercase && has_uppercase && has_digit) {
            return Err(FieldError::new(
                "Password must contain a lowercase letter, an uppercase letter and a number",
            ));
        }

        Ok(Self(raw_password_string.to_string()))
    }

    /// Wrap `raw_password_string` without checking the password policy.
    ///
    /// Meant for seeding demo data and tests with known passwords.
    pub fn new_unchecked(raw_password_string: &str) -> Self {
        Self(raw_password_string.to_string())
    }
}

impl Display for ValidatedPassword {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", str::repeat("*", 8))
    }
}

/// A salted and hashed password.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// An alias for the default encryption cost for hashing passwords.
    pub const DEFAULT_COST: u32 = bcrypt::DEFAULT_COST;

    /// Create a hashed password from a validated password with the specified `cost`.
    ///
    /// `cost` increases the rounds of hashing and therefore the time needed to verify a password.
    /// A value of at least 12 is recommended. Pass in [PasswordHash::DEFAULT_COST] to use the recommended cost.
    ///
    /// # Errors
    ///
    /// This function will return an error if the password could not be hashed.
    pub fn new(password: ValidatedPassword, cost: u32) -> Result<Self, Error> {
        match hash(&password.0, cost) {
            Ok(password_hash) => Ok(Self(password_hash)),
            Err(e) => Err(Error::HashingError(e.to_string())),
        }
    }

    /// Wrap a hash read back from the database.
    ///
    /// The hash is not checked, so a malformed hash only shows up as a failed
    /// [PasswordHash::verify].
    pub fn new_unchecked(raw_password_hash: &str) -> Self {
        Self(raw_password_hash.to_string())
    }

    /// Check that `raw_password` matches the stored password.
    pub fn verify(&self, raw_password: &str) -> Result<bool, BcryptError> {
        verify(raw_password, &self.0)
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
