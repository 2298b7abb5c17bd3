//! Forwarding requests to the backend and relaying its responses.

use axum::{
    body::{Body, Bytes, to_bytes},
    extract::{Request, State},
    http::{
        HeaderMap, HeaderValue, Method,
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
    },
    response::{IntoResponse, Response},
};

use crate::{
    Error,
    csv_import::MAX_IMPORT_BODY_SIZE,
    endpoints,
    gateway::{GatewayState, upload::forward_upload},
};

/// The headers copied from the client request to the backend request.
const FORWARDED_HEADERS: [axum::http::HeaderName; 3] = [AUTHORIZATION, CONTENT_TYPE, ACCEPT];

/// Whether `path` may be forwarded without a credential.
pub(super) fn is_public(path: &str) -> bool {
    path.starts_with(endpoints::AUTH_PREFIX) || path == endpoints::COFFEE
}

/// Get the bearer credential from `headers`.
///
/// # Errors
/// Returns [Error::MissingCredentials] if there is no `Authorization: Bearer`
/// header.
pub(super) fn bearer_credential(headers: &HeaderMap) -> Result<&HeaderValue, Error> {
    headers
        .get(AUTHORIZATION)
        .filter(|value| {
            value
                .to_str()
                .ok()
                .and_then(|value| value.get(..7))
                .is_some_and(|scheme| scheme.eq_ignore_ascii_case("bearer "))
        })
        .ok_or(Error::MissingCredentials)
}

/// The backend URL for the request described by `parts`.
pub(super) fn backend_url(state: &GatewayState, parts: &Parts) -> String {
    let path_and_query = parts
        .uri
        .path_and_query()
        .map(|path_and_query| path_and_query.as_str())
        .unwrap_or_else(|| parts.uri.path());

    format!("{}{path_and_query}", state.backend_url)
}

/// Copy the backend's status, content type and body into a response.
pub(super) async fn relay_response(response: reqwest::Response) -> Result<Response, Error> {
    let status = response.status();
    let content_type = response.headers().get(CONTENT_TYPE).cloned();
    let body = response.bytes().await.map_err(|error| {
        tracing::error!("could not read the backend response: {error}");
        Error::BackendError(error.to_string())
    })?;

    let mut relayed = (status, Body::from(body)).into_response();
    if let Some(content_type) = content_type {
        relayed.headers_mut().insert(CONTENT_TYPE, content_type);
    }

    Ok(relayed)
}

async fn forward_body(state: &GatewayState, parts: &Parts, body: Bytes) -> Result<Response, Error> {
    let mut backend_request = state
        .client
        .request(parts.method.clone(), backend_url(state, parts))
        .body(body);

    for header in FORWARDED_HEADERS {
        if let Some(value) = parts.headers.get(&header) {
            backend_request = backend_request.header(header, value);
        }
    }

    let response = backend_request.send().await.map_err(|error| {
        tracing::error!("could not reach the backend: {error}");
        Error::BackendError(error.to_string())
    })?;

    relay_response(response).await
}

async fn forward(state: GatewayState, request: Request) -> Result<Response, Error> {
    let path = request.uri().path().to_owned();

    if !is_public(&path) {
        bearer_credential(request.headers()).inspect_err(|_| {
            tracing::warn!("rejected {} {path} without credentials", request.method());
        })?;
    }

    if *request.method() == Method::POST && path == endpoints::IMPORT {
        return forward_upload(&state, request).await;
    }

    let (parts, body) = request.into_parts();
    // Reading only fails once the limit is hit or the client stream breaks.
    let body = to_bytes(body, MAX_IMPORT_BODY_SIZE).await.map_err(|error| {
        tracing::warn!("rejected {} {path} with an unreadable body: {error}", parts.method);
        Error::BodyTooLarge(MAX_IMPORT_BODY_SIZE)
    })?;

    forward_body(&state, &parts, body).await
}

/// Forward any `/api` request to the backend and relay its response.
pub async fn forward_request(State(state): State<GatewayState>, request: Request) -> Response {
    match forward(state, request).await {
        Ok(response) => response,
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod proxy_unit_tests {
    use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};

    use crate::Error;

    use super::{bearer_credential, is_public};

    #[test]
    fn auth_routes_are_public() {
        assert!(is_public("/api/auth/login"));
        assert!(is_public("/api/coffee"));
        assert!(!is_public("/api/transactions"));
        assert!(!is_public("/api/authors"));
    }

    #[test]
    fn bearer_credential_requires_bearer_scheme() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_credential(&headers), Err(Error::MissingCredentials));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic Zm9vOmJhcg=="));
        assert_eq!(bearer_credential(&headers), Err(Error::MissingCredentials));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert!(bearer_credential(&headers).is_ok());
    }
}
