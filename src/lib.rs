//! Fintrack is a personal-finance tracking service.
//!
//! This library provides a JSON REST API for authentication, categories,
//! transactions, budgets, CSV import and reports, a gateway that forwards
//! authenticated client requests to that API, and small observable state
//! stores for clients.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod amount;
mod app_state;
mod auth;
pub mod budget;
pub mod category;
mod csv_import;
mod database_id;
mod db;
mod endpoints;
mod entry_type;
mod extract;
mod gateway;
mod logging;
mod password;
mod report;
mod routing;
pub mod store;
mod timezone;
pub mod transaction;
pub mod user;
mod validation;

#[cfg(test)]
mod test_utils;

pub use amount::Amount;
pub use app_state::AppState;
pub use auth::JwtKeys;
pub use db::initialize as initialize_db;
pub use entry_type::EntryType;
pub use gateway::{GatewayState, build_gateway_router};
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware, setup_logging};
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use timezone::get_local_offset;
pub use validation::{FieldError, ValidationErrors, Violation};

use crate::category::CategoryId;

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// One or more fields of a request failed validation.
    ///
    /// Every violation found in the request is included, not just the first.
    #[error("validation failed: {0}")]
    Validation(ValidationErrors),

    /// The request body could not be parsed as the expected JSON shape.
    #[error("malformed request body: {0}")]
    MalformedBody(String),

    /// The request did not include an `Authorization: Bearer` header.
    #[error("Authorization header missing")]
    MissingCredentials,

    /// The bearer token could not be decoded, has expired or belongs to a
    /// user that no longer exists.
    #[error("invalid token")]
    InvalidToken,

    /// The user provided an unknown email or the wrong password.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The JSON web token could not be created.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("could not create token: {0}")]
    TokenCreation(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email address is already used by another user.
    #[error("the email address is already registered")]
    DuplicateEmail,

    /// The user already has a category with the same name (ignoring case).
    #[error("the category \"{0}\" already exists")]
    DuplicateCategoryName(String),

    /// The category cannot be deleted while transactions or budgets refer to it.
    #[error("the category is still used by transactions or budgets")]
    CategoryInUse,

    /// The category ID used to create a transaction or budget did not match a
    /// category owned by the user.
    #[error("the category ID {0} does not refer to a valid category")]
    InvalidCategory(CategoryId),

    /// The password reset token is unknown, already used or has expired.
    #[error("the password reset token is invalid or has expired")]
    InvalidResetToken,

    /// The multipart form could not be parsed.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The multipart form did not contain a field named `file`.
    #[error("no file was uploaded")]
    MissingFile,

    /// The uploaded file does not have a `.csv` extension.
    #[error("file is not a CSV")]
    NotCSV,

    /// The uploaded file is larger than the allowed number of bytes.
    #[error("file is larger than {0} bytes")]
    FileTooLarge(usize),

    /// The request body is larger than the allowed number of bytes.
    #[error("request body is larger than {0} bytes")]
    BodyTooLarge(usize),

    /// The CSV had issues that prevented it from being parsed at all.
    #[error("could not parse the CSV file: {0}")]
    InvalidCSV(String),

    /// The requested resource was not found.
    ///
    /// Resources owned by other users are also reported as not found so that
    /// clients cannot probe for their existence.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The gateway could not forward a request to the backend or read its
    /// response.
    ///
    /// The error string should only be logged for debugging on the server.
    #[error("could not forward the request to the backend: {0}")]
    BackendError(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl From<ValidationErrors> for Error {
    fn from(value: ValidationErrors) -> Self {
        Error::Validation(value)
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Error::Validation(errors) => {
                return (
                    StatusCode::UNPROCESSABLE_ENTITY,
                    Json(json!({
                        "message": "Validation failed",
                        "errors": errors,
                    })),
                )
                    .into_response();
            }
            Error::InvalidCategory(category_id) => {
                let mut errors = ValidationErrors::new();
                errors.add(
                    "categoryId",
                    format!("Category {category_id} does not exist"),
                );
                return Error::Validation(errors).into_response();
            }
            Error::MalformedBody(reason) => (StatusCode::BAD_REQUEST, reason),
            Error::MissingCredentials => (
                StatusCode::UNAUTHORIZED,
                "Authorization header missing".to_owned(),
            ),
            Error::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid token".to_owned()),
            Error::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                "Invalid email or password".to_owned(),
            ),
            Error::DuplicateEmail => (
                StatusCode::CONFLICT,
                "An account with this email already exists".to_owned(),
            ),
            Error::DuplicateCategoryName(name) => (
                StatusCode::CONFLICT,
                format!("A category named \"{name}\" already exists"),
            ),
            Error::CategoryInUse => (
                StatusCode::CONFLICT,
                "The category is still used by transactions or budgets".to_owned(),
            ),
            Error::InvalidResetToken => (
                StatusCode::BAD_REQUEST,
                "The reset link is invalid or has expired".to_owned(),
            ),
            Error::MultipartError(_) => (
                StatusCode::BAD_REQUEST,
                "Could not read the uploaded form".to_owned(),
            ),
            Error::MissingFile => (StatusCode::BAD_REQUEST, "No file uploaded".to_owned()),
            Error::NotCSV => (StatusCode::BAD_REQUEST, "File type must be CSV".to_owned()),
            Error::FileTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("File must be at most {} MB", limit / (1024 * 1024)),
            ),
            Error::BodyTooLarge(limit) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Request body must be at most {} MB", limit / (1024 * 1024)),
            ),
            Error::InvalidCSV(reason) => (
                StatusCode::BAD_REQUEST,
                format!("Could not parse the CSV file: {reason}"),
            ),
            Error::NotFound => (
                StatusCode::NOT_FOUND,
                "The requested resource could not be found".to_owned(),
            ),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_owned(),
                )
            }
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}
