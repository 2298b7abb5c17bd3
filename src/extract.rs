//! Request extractors that report rejections with the app's JSON error body.

use axum::{extract::rejection::JsonRejection, extract::FromRequest};

use crate::Error;

/// Drop-in replacement for [axum::Json] that turns malformed bodies into
/// [Error::MalformedBody] so clients always get a `{ "message" }` body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(Error))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        tracing::debug!("rejected JSON body: {rejection}");
        Error::MalformedBody(rejection.body_text())
    }
}
