//! Logging setup and middleware for logging requests and responses.

use std::{fs::OpenOptions, path::Path, sync::Arc};

use axum::{
    body::{Body, Bytes, to_bytes},
    extract::Request,
    http::{
        HeaderMap, HeaderValue, Method, Uri,
        header::{AUTHORIZATION, CONTENT_LENGTH, CONTENT_TYPE},
        response,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing_subscriber::{
    EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::{Error, csv_import::MAX_IMPORT_BODY_SIZE};

/// Bodies longer than this many bytes are truncated in `info` logs.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// JSON fields whose values never appear in logs.
const REDACTED_FIELDS: [&str; 5] = ["password", "oldPassword", "newPassword", "token", "secret"];

const REDACTED: &str = "********";

/// Set up `tracing` with a pretty stdout log at `info` level and, if
/// `log_file` is given, a file log at `debug` level.
///
/// `RUST_LOG` overrides the levels.
///
/// # Errors
/// Returns an error if the log file cannot be opened.
pub fn setup_logging(log_file: Option<&Path>) -> Result<(), std::io::Error> {
    let stdout_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_filter(filter::LevelFilter::INFO);

    let debug_log = match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;

            Some(
                tracing_subscriber::fmt::layer()
                    .pretty()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(filter::LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
        .with(stdout_log)
        .with(debug_log)
        .init();

    Ok(())
}

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level with
/// secrets redacted. If a body is longer than [LOG_BODY_LENGTH_LIMIT] bytes,
/// it is truncated and the full body is logged at the `debug` level.
/// Multipart request bodies are streamed through untouched and only logged
/// by size.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let request = if is_multipart(request.headers()) {
        let length = request
            .headers()
            .get(CONTENT_LENGTH)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("unknown");
        log_request(
            request.method(),
            request.uri(),
            request.headers(),
            &format!("<{length} bytes of multipart data>"),
        );

        request
    } else {
        let (parts, body) = request.into_parts();
        let body = match to_bytes(body, MAX_IMPORT_BODY_SIZE).await {
            Ok(body) => body,
            Err(error) => {
                tracing::warn!("could not read request body: {error}");
                return Error::MalformedBody("Could not read the request body".to_owned())
                    .into_response();
            }
        };

        log_request(&parts.method, &parts.uri, &parts.headers, &body_for_log(&body));

        Request::from_parts(parts, Body::from(body))
    };

    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body = match to_bytes(body, usize::MAX).await {
        Ok(body) => body,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            return Error::BackendError(error.to_string()).into_response();
        }
    };

    log_response(&parts, &body_for_log(&body));

    Response::from_parts(parts, Body::from(body))
}

fn is_multipart(headers: &HeaderMap) -> bool {
    headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|content_type| content_type.starts_with("multipart/"))
}

fn body_for_log(body: &Bytes) -> String {
    match serde_json::from_slice::<Value>(body) {
        Ok(mut json) => {
            redact_json(&mut json);
            json.to_string()
        }
        Err(_) => String::from_utf8_lossy(body).into_owned(),
    }
}

/// Replace the values of secret fields anywhere in `json`.
fn redact_json(json: &mut Value) {
    match json {
        Value::Object(map) => {
            for (key, value) in map.iter_mut() {
                if REDACTED_FIELDS.contains(&key.as_str()) {
                    *value = Value::String(REDACTED.to_owned());
                } else {
                    redact_json(value);
                }
            }
        }
        Value::Array(values) => values.iter_mut().for_each(redact_json),
        _ => {}
    }
}

fn redact_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();

    if headers.contains_key(AUTHORIZATION) {
        headers.insert(AUTHORIZATION, HeaderValue::from_static(REDACTED));
    }

    headers
}

/// The first [LOG_BODY_LENGTH_LIMIT] bytes of `text`, shortened to a
/// character boundary.
fn truncate(text: &str) -> &str {
    let mut end = LOG_BODY_LENGTH_LIMIT.min(text.len());

    while !text.is_char_boundary(end) {
        end -= 1;
    }

    &text[..end]
}

fn log_request(method: &Method, uri: &Uri, headers: &HeaderMap, body: &str) {
    let headers = redact_headers(headers);

    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!(
            "Received request: {method} {uri} {headers:?}\nbody: {}...",
            truncate(body)
        );
        tracing::debug!("Full request body: {body:?}");
    } else {
        tracing::info!("Received request: {method} {uri} {headers:?}\nbody: {body:?}");
    }
}

fn log_response(parts: &response::Parts, body: &str) {
    let status = parts.status;

    if body.len() > LOG_BODY_LENGTH_LIMIT {
        tracing::info!("Sending response: {status}\nbody: {}...", truncate(body));
        tracing::debug!("Full response body: {body:?}");
    } else {
        tracing::info!("Sending response: {status}\nbody: {body:?}");
    }
}

#[cfg(test)]
mod redaction_tests {
    use axum::{
        body::Bytes,
        http::{HeaderMap, HeaderValue, header::AUTHORIZATION, header::CONTENT_TYPE},
    };
    use serde_json::json;

    use super::{LOG_BODY_LENGTH_LIMIT, body_for_log, is_multipart, redact_headers, truncate};

    #[test]
    fn password_fields_are_redacted() {
        let body = Bytes::from(
            json!({
                "email": "test@example.com",
                "password": "Hunter2Hunter2",
                "nested": { "newPassword": "Secret123" },
            })
            .to_string(),
        );

        let logged = body_for_log(&body);

        assert!(logged.contains("test@example.com"));
        assert!(!logged.contains("Hunter2Hunter2"));
        assert!(!logged.contains("Secret123"));
    }

    #[test]
    fn tokens_in_arrays_are_redacted() {
        let body = Bytes::from(json!([{ "token": "abc.def.ghi" }]).to_string());

        assert!(!body_for_log(&body).contains("abc.def.ghi"));
    }

    #[test]
    fn non_json_bodies_are_logged_as_text() {
        assert_eq!(body_for_log(&Bytes::from_static(b"hello")), "hello");
    }

    #[test]
    fn multipart_is_detected_from_content_type() {
        let mut headers = HeaderMap::new();
        assert!(!is_multipart(&headers));

        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("multipart/form-data; boundary=x"),
        );
        assert!(is_multipart(&headers));
    }

    #[test]
    fn authorization_header_is_redacted() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));

        let redacted = redact_headers(&headers);

        assert_eq!(redacted.get(AUTHORIZATION).unwrap(), "********");
        assert_eq!(headers.get(AUTHORIZATION).unwrap(), "Bearer abc.def.ghi");
    }

    #[test]
    fn truncate_respects_character_boundaries() {
        let text = "é".repeat(LOG_BODY_LENGTH_LIMIT);

        let truncated = truncate(&text);

        assert!(truncated.len() <= LOG_BODY_LENGTH_LIMIT);
        assert!(truncated.chars().all(|c| c == 'é'));
    }
}
