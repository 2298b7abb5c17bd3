//! Forwarding CSV uploads.
//!
//! The upload is checked with the same rules as the API server before it is
//! forwarded, so bad files never reach the backend.

use axum::{
    extract::{FromRequest, Multipart, Request},
    http::header::AUTHORIZATION,
    response::Response,
};
use reqwest::multipart::{Form, Part};

use crate::{
    Error,
    csv_import::{IMPORT_FILE_FIELD, read_csv_upload},
    gateway::{
        GatewayState,
        proxy::{backend_url, relay_response},
    },
};

/// Check the CSV file in `request` and forward it to the backend as a
/// multipart form.
pub(super) async fn forward_upload(
    state: &GatewayState,
    request: Request,
) -> Result<Response, Error> {
    let (parts, body) = request.into_parts();
    let credential = parts.headers.get(AUTHORIZATION).cloned();
    let url = backend_url(state, &parts);

    let mut multipart = Multipart::from_request(Request::from_parts(parts, body), &())
        .await
        .map_err(|rejection| {
            tracing::debug!("could not read upload form: {rejection}");
            Error::MultipartError(rejection.body_text())
        })?;
    let upload = read_csv_upload(&mut multipart).await?;

    let file = Part::bytes(upload.data)
        .file_name(upload.file_name)
        .mime_str("text/csv")
        .map_err(|error| Error::BackendError(error.to_string()))?;
    let form = Form::new().part(IMPORT_FILE_FIELD, file);

    let mut backend_request = state
        .client
        .post(url)
        .multipart(form);
    if let Some(credential) = credential {
        backend_request = backend_request.header(AUTHORIZATION, credential);
    }

    let response = backend_request.send().await.map_err(|error| {
        tracing::error!("could not forward upload to the backend: {error}");
        Error::BackendError(error.to_string())
    })?;

    relay_response(response).await
}
