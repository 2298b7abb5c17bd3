//! A gateway that forwards client requests to the API server.
//!
//! Requests keep their method, path, query, credential and body. Every route
//! except the auth routes and the coffee route requires a bearer credential,
//! which the gateway checks for before contacting the backend. Responses
//! from the backend are relayed unchanged.

mod proxy;
mod upload;

use axum::{Router, extract::DefaultBodyLimit, routing::any};
use tower_http::trace::TraceLayer;

use crate::csv_import::MAX_IMPORT_BODY_SIZE;

pub use proxy::forward_request;

/// The state needed by the gateway.
#[derive(Debug, Clone)]
pub struct GatewayState {
    /// The API server's base URL without a trailing slash, e.g. "http://localhost:3000".
    pub backend_url: String,
    /// The HTTP client used for every forwarded request.
    pub client: reqwest::Client,
}

impl GatewayState {
    /// Create the gateway state for the API server at `backend_url`.
    pub fn new(backend_url: &str) -> Self {
        Self {
            backend_url: backend_url.trim_end_matches('/').to_owned(),
            client: reqwest::Client::new(),
        }
    }
}

/// Return a router that forwards every `/api` route to the backend in `state`.
pub fn build_gateway_router(state: GatewayState) -> Router {
    Router::new()
        .route("/api/{*path}", any(forward_request))
        .layer(DefaultBodyLimit::max(MAX_IMPORT_BODY_SIZE))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
