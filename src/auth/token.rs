//! Issues and checks the JSON web tokens used as bearer credentials.

use std::sync::{Arc, Mutex};

use axum::{
    RequestPartsExt,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Bearer},
};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512};
use time::{Duration, OffsetDateTime};

use crate::{
    AppState, Error,
    user::{UserID, get_user_by_id},
};

/// How long an access token is valid for by default.
pub const DEFAULT_TOKEN_DURATION: Duration = Duration::days(1);

/// The keys for signing and verifying access tokens.
#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl JwtKeys {
    /// Derive the signing keys from `secret`.
    ///
    /// The secret is hashed first so that secrets of any length give a key of
    /// the same strength.
    pub fn from_secret(secret: &str) -> Self {
        let hash = Sha512::digest(secret);

        Self {
            encoding: EncodingKey::from_secret(&hash),
            decoding: DecodingKey::from_secret(&hash),
        }
    }
}

/// The contents of a JSON Web Token.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// The user the token was issued to.
    pub sub: UserID,
    /// The time the token was issued as a unix timestamp.
    pub iat: i64,
    /// The expiry time of the token as a unix timestamp.
    pub exp: i64,
}

/// Create a signed token for `user_id` that expires after `duration`.
///
/// # Errors
/// Returns [Error::TokenCreation] if the token could not be signed.
pub fn issue_token(user_id: UserID, duration: Duration, keys: &JwtKeys) -> Result<String, Error> {
    let now = OffsetDateTime::now_utc();
    let claims = Claims {
        sub: user_id,
        iat: now.unix_timestamp(),
        exp: (now + duration).unix_timestamp(),
    };

    encode(&Header::default(), &claims, &keys.encoding)
        .map_err(|error| Error::TokenCreation(error.to_string()))
}

/// Check the signature and expiry of `token` and return its claims.
///
/// # Errors
/// Returns [Error::InvalidToken] if the token is malformed, forged or expired.
pub fn decode_token(token: &str, keys: &JwtKeys) -> Result<Claims, Error> {
    decode::<Claims>(token, &keys.decoding, &Validation::default())
        .map(|token_data| token_data.claims)
        .map_err(|error| {
            tracing::debug!("rejected bearer token: {error}");
            Error::InvalidToken
        })
}

/// The state needed to authenticate a request.
#[derive(Clone)]
pub struct AuthState {
    /// The keys for verifying access tokens.
    pub jwt_keys: JwtKeys,
    /// The database connection for checking the user still exists.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            jwt_keys: state.jwt_keys.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The ID of the user who sent the request, taken from a valid bearer token.
///
/// Handlers that take this extractor reject requests without a token with
/// [Error::MissingCredentials] and requests with a bad token with
/// [Error::InvalidToken].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurrentUser(pub UserID);

impl<S> FromRequestParts<S> for CurrentUser
where
    AuthState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|rejection| {
                if rejection.is_missing() {
                    Error::MissingCredentials
                } else {
                    Error::InvalidToken
                }
            })?;

        let state = AuthState::from_ref(state);
        let claims = decode_token(bearer.token(), &state.jwt_keys)?;

        let connection = state.db_connection.lock().map_err(|error| {
            tracing::error!("could not acquire database lock: {error}");
            Error::DatabaseLockError
        })?;

        match get_user_by_id(claims.sub, &connection) {
            Ok(user) => Ok(Self(user.id)),
            Err(Error::NotFound) => {
                tracing::warn!("token presented for deleted user {}", claims.sub);
                Err(Error::InvalidToken)
            }
            Err(error) => Err(error),
        }
    }
}


#[cfg(test)]
mod current_user_tests {
    use axum::{Router, http::StatusCode, routing::get};
    use axum_test::TestServer;
    use serde_json::json;
    use time::Duration;

    use crate::{
        AppState,
        auth::token::{CurrentUser, issue_token},
        test_utils::{get_test_app_state, must_create_test_user},
        user::UserID,
    };

    async fn whoami(CurrentUser(user_id): CurrentUser) -> String {
        user_id.to_string()
    }

    fn get_test_server(state: AppState) -> TestServer {
        let app = Router::new().route("/whoami", get(whoami)).with_state(state);

        TestServer::try_new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn accepts_valid_token() {
        let state = get_test_app_state();
        let (user, token) = must_create_test_user(&state);
        let server = get_test_server(state);

        let response = server.get("/whoami").authorization_bearer(token).await;

        response.assert_status_ok();
        response.assert_text(user.id.to_string());
    }

    #[tokio::test]
    async fn rejects_missing_header() {
        let server = get_test_server(get_test_app_state());

        let response = server.get("/whoami").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json(&json!({ "message": "Authorization header missing" }));
    }

    #[tokio::test]
    async fn rejects_invalid_token() {
        let server = get_test_server(get_test_app_state());

        let response = server.get("/whoami").authorization_bearer("foo").await;

        response.assert_status(StatusCode::UNAUTHORIZED);
        response.assert_json(&json!({ "message": "Invalid token" }));
    }

    #[tokio::test]
    async fn rejects_token_for_unknown_user() {
        let state = get_test_app_state();
        let token = issue_token(UserID::new(999), Duration::hours(1), &state.jwt_keys).unwrap();
        let server = get_test_server(state);

        let response = server.get("/whoami").authorization_bearer(token).await;

        response.assert_status(StatusCode::UNAUTHORIZED);
    }
}
