//! Field-level request validation.
//!
//! Each field rule is a plain function (or a newtype constructor) returning
//! `Result<T, FieldError>`. Request shapes implement [Validate] by running
//! every rule through a [ValidationErrors] collector, so a single response
//! reports all bad fields at once.

use std::fmt::Display;

use serde::Serialize;
use time::{Date, format_description::BorrowedFormatItem, macros::format_description};
use unicode_segmentation::UnicodeSegmentation;

const ISO_DATE_FORMAT: &[BorrowedFormatItem] = format_description!("[year]-[month]-[day]");

/// The reason a single field value was rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FieldError(pub String);

impl FieldError {
    /// Create a field error with a human-readable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// A rejected field: the JSON field name and why it was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// The machine-stable name of the field, as it appears in the request.
    pub field: String,
    /// A message that can be shown to the user.
    pub message: String,
}

/// Every violation found while validating one request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<Violation>);

impl ValidationErrors {
    /// Create an empty collection.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Record a violation for `field`.
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.push(Violation {
            field: field.to_owned(),
            message: message.into(),
        });
    }

    /// Record the error in `result` against `field`, if any, and return the
    /// validated value otherwise.
    pub fn check<T>(&mut self, field: &str, result: Result<T, FieldError>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(FieldError(message)) => {
                self.add(field, message);
                None
            }
        }
    }

    /// Like [ValidationErrors::check] for optional patch fields: `None` stays
    /// `None` and is never a violation.
    pub fn check_optional<T, U>(
        &mut self,
        field: &str,
        value: Option<T>,
        rule: impl FnOnce(T) -> Result<U, FieldError>,
    ) -> Option<Option<U>> {
        match value {
            None => Some(None),
            Some(value) => self.check(field, rule(value)).map(Some),
        }
    }

    /// Whether no violations have been recorded.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The recorded violations in the order they were found.
    pub fn violations(&self) -> &[Violation] {
        &self.0
    }

    /// Whether a violation was recorded for `field`.
    pub fn has_field(&self, field: &str) -> bool {
        self.0.iter().any(|violation| violation.field == field)
    }
}

impl Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self
            .0
            .iter()
            .map(|violation| format!("{}: {}", violation.field, violation.message))
            .collect();

        write!(f, "{}", messages.join("; "))
    }
}

/// A raw request payload that can be checked and converted into a
/// normalized, type-checked value.
pub trait Validate {
    /// The normalized value produced when every field is valid.
    type Output;

    /// Check every field and either produce the normalized value or every
    /// violation found.
    ///
    /// # Errors
    /// Returns all field violations when any field is invalid.
    fn validate(self) -> Result<Self::Output, ValidationErrors>;
}

/// Count user-perceived characters rather than bytes.
pub fn character_count(text: &str) -> usize {
    text.graphemes(true).count()
}

/// Require a non-blank value.
pub fn required(value: &str, label: &str) -> Result<String, FieldError> {
    if value.trim().is_empty() {
        Err(FieldError::new(format!("{label} is required")))
    } else {
        Ok(value.to_owned())
    }
}

/// Require a trimmed, non-blank value with a length in `min..=max`
/// characters.
pub fn bounded_text(
    value: &str,
    label: &str,
    min: usize,
    max: usize,
) -> Result<String, FieldError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(FieldError::new(format!("{label} is required")));
    }

    let length = character_count(value);
    if length < min || length > max {
        return Err(FieldError::new(format!(
            "{label} must be between {min} and {max} characters"
        )));
    }

    Ok(value.to_owned())
}

/// Parse a positive integer identifier given as text, e.g. a query parameter.
pub fn positive_id(value: &str, label: &str) -> Result<i64, FieldError> {
    match value.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(FieldError::new(format!("{label} must be a positive integer"))),
    }
}

/// Parse a boolean given as text, e.g. a query parameter.
pub fn boolean(value: &str, label: &str) -> Result<bool, FieldError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(FieldError::new(format!("{label} must be true or false"))),
    }
}

/// Parse a `YYYY-MM-DD` calendar date.
pub fn iso_date(value: &str, label: &str) -> Result<Date, FieldError> {
    let value = value.trim();

    if value.is_empty() {
        return Err(FieldError::new(format!("{label} is required")));
    }

    Date::parse(value, ISO_DATE_FORMAT)
        .map_err(|_| FieldError::new(format!("{label} must be a date in the format YYYY-MM-DD")))
}
