use axum_test::TestServer;
use rusqlite::Connection;

use crate::{
    AppState, EntryType, PasswordHash, ValidatedPassword, build_router,
    auth::issue_token,
    category::{Category, CategoryName, NewCategory, create_category},
    user::{Email, NewUser, PersonName, User, UserID, create_user},
};

/// The password of every user created by these helpers.
pub(crate) const TEST_PASSWORD: &str = "Hunter2Hunter2";

/// The lowest cost bcrypt accepts, so tests that hash passwords stay fast.
const TEST_HASH_COST: u32 = 4;

#[track_caller]
pub(crate) fn get_test_app_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open database in memory.");

    AppState::new(connection, "foobar", "Etc/UTC")
        .expect("Could not create app state.")
        .with_password_hash_cost(TEST_HASH_COST)
}

#[track_caller]
pub(crate) fn get_test_server(state: AppState) -> TestServer {
    TestServer::try_new(build_router(state)).expect("Could not create test server.")
}

#[track_caller]
pub(crate) fn must_insert_user(connection: &Connection, email: &str) -> User {
    let password_hash = PasswordHash::new(
        ValidatedPassword::new_unchecked(TEST_PASSWORD),
        TEST_HASH_COST,
    )
    .expect("Could not hash password");

    create_user(
        NewUser {
            email: Email::new_unchecked(email),
            name: PersonName::new_unchecked("Test User"),
            password_hash,
        },
        connection,
    )
    .expect("Could not create test user")
}

/// Insert a user and issue an access token for them.
#[track_caller]
pub(crate) fn must_create_user_with_email(state: &AppState, email: &str) -> (User, String) {
    let user = {
        let connection = state.db_connection.lock().expect("Could not lock database");
        must_insert_user(&connection, email)
    };
    let token = issue_token(user.id, state.token_duration, &state.jwt_keys)
        .expect("Could not issue token");

    (user, token)
}

#[track_caller]
pub(crate) fn must_create_test_user(state: &AppState) -> (User, String) {
    must_create_user_with_email(state, "test@example.com")
}

#[track_caller]
pub(crate) fn must_create_category(
    connection: &Connection,
    user_id: UserID,
    name: &str,
    category_type: EntryType,
) -> Category {
    create_category(
        user_id,
        NewCategory::with_defaults(CategoryName::new_unchecked(name), category_type),
        connection,
    )
    .expect("Could not create test category")
}
