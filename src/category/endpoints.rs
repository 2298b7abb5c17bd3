//! JSON endpoints for managing categories.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, Path, State},
    http::StatusCode,
};
use rusqlite::Connection;

use crate::{
    AppState, Error,
    auth::CurrentUser,
    category::{
        Category, CategoryId, CreateCategoryRequest, UpdateCategoryRequest, create_category,
        delete_category, get_category, icons::{ICON_GROUPS, IconGroup}, list_categories,
        update_category,
    },
    extract::AppJson,
    validation::Validate,
};

/// The state needed by the category endpoints.
#[derive(Debug, Clone)]
pub struct CategoryState {
    /// The database connection for managing categories.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for CategoryState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// List the categories of the logged in user.
pub async fn list_categories_endpoint(
    State(state): State<CategoryState>,
    CurrentUser(user_id): CurrentUser,
) -> Result<Json<Vec<Category>>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    list_categories(user_id, &connection).map(Json)
}

/// Create a category for the logged in user.
pub async fn create_category_endpoint(
    State(state): State<CategoryState>,
    CurrentUser(user_id): CurrentUser,
    AppJson(request): AppJson<CreateCategoryRequest>,
) -> Result<(StatusCode, Json<Category>), Error> {
    let new_category = request.validate()?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    let category = create_category(user_id, new_category, &connection)?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// Get one of the logged in user's categories.
pub async fn get_category_endpoint(
    State(state): State<CategoryState>,
    CurrentUser(user_id): CurrentUser,
    Path(category_id): Path<CategoryId>,
) -> Result<Json<Category>, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    get_category(category_id, user_id, &connection).map(Json)
}

/// Apply a partial update to one of the logged in user's categories.
pub async fn update_category_endpoint(
    State(state): State<CategoryState>,
    CurrentUser(user_id): CurrentUser,
    Path(category_id): Path<CategoryId>,
    AppJson(request): AppJson<UpdateCategoryRequest>,
) -> Result<Json<Category>, Error> {
    let patch = request.validate()?;

    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    update_category(category_id, user_id, patch, &connection).map(Json)
}

/// Delete one of the logged in user's categories.
///
/// Categories that transactions or budgets still refer to are not deleted.
pub async fn delete_category_endpoint(
    State(state): State<CategoryState>,
    CurrentUser(user_id): CurrentUser,
    Path(category_id): Path<CategoryId>,
) -> Result<StatusCode, Error> {
    let connection = state.db_connection.lock().map_err(|error| {
        tracing::error!("could not acquire database lock: {error}");
        Error::DatabaseLockError
    })?;

    delete_category(category_id, user_id, &connection)?;

    Ok(StatusCode::NO_CONTENT)
}

/// List the icons categories may use, grouped by theme.
pub async fn get_icons_endpoint(_user: CurrentUser) -> Json<&'static [IconGroup]> {
    Json(ICON_GROUPS)
}

#[cfg(test)]
mod category_endpoint_tests {
    use axum::http::StatusCode;
    use serde_json::{Value, json};

    use crate::{
        category::Category,
        endpoints::{self, format_endpoint},
        test_utils::{
            get_test_app_state, get_test_server, must_create_test_user, must_create_user_with_email,
        },
    };

    fn groceries() -> Value {
        json!({
            "name": "Groceries",
            "type": "EXPENSE",
            "color": "#10B981",
            "icon": "ShoppingBasket",
        })
    }

    #[tokio::test]
    async fn create_and_list_categories() {
        let state = get_test_app_state();
        let (_, token) = must_create_test_user(&state);
        let server = get_test_server(state);

        let response = server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .json(&groceries())
            .await;

        response.assert_status(StatusCode::CREATED);
        let created = response.json::<Category>();

        let listed = server
            .get(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .await
            .json::<Vec<Category>>();
        assert_eq!(listed, vec![created]);
    }

    #[tokio::test]
    async fn create_category_with_unknown_icon_names_icon_field() {
        let state = get_test_app_state();
        let (_, token) = must_create_test_user(&state);
        let server = get_test_server(state);
        let mut body = groceries();
        body["icon"] = json!("Smiley");

        let response = server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .json(&body)
            .await;

        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        let body = response.json::<Value>();
        assert_eq!(body["message"], "Validation failed");
        assert_eq!(body["errors"][0]["field"], "icon");
    }

    #[tokio::test]
    async fn create_duplicate_category_conflicts() {
        let state = get_test_app_state();
        let (_, token) = must_create_test_user(&state);
        let server = get_test_server(state);
        server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .json(&groceries())
            .await;
        let mut body = groceries();
        body["name"] = json!("groceries");

        let response = server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .json(&body)
            .await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn accented_names_conflict_regardless_of_case() {
        let state = get_test_app_state();
        let (_, token) = must_create_test_user(&state);
        let server = get_test_server(state);
        let mut body = groceries();
        body["name"] = json!("Café");
        server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .json(&body)
            .await
            .assert_status(StatusCode::CREATED);
        body["name"] = json!("CAFÉ");

        let response = server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .json(&body)
            .await;

        response.assert_status(StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn patch_category_updates_fields() {
        let state = get_test_app_state();
        let (_, token) = must_create_test_user(&state);
        let server = get_test_server(state);
        let created = server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .json(&groceries())
            .await
            .json::<Category>();

        let response = server
            .patch(&format_endpoint(endpoints::CATEGORY, created.id))
            .authorization_bearer(&token)
            .json(&json!({ "icon": "Apple" }))
            .await;

        response.assert_status_ok();
        let updated = response.json::<Category>();
        assert_eq!(updated.icon.as_ref(), "Apple");
        assert_eq!(updated.name, created.name);
    }

    #[tokio::test]
    async fn other_users_category_is_not_found() {
        let state = get_test_app_state();
        let (_, owner_token) = must_create_test_user(&state);
        let (_, other_token) = must_create_user_with_email(&state, "other@bar.baz");
        let server = get_test_server(state);
        let created = server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(&owner_token)
            .json(&groceries())
            .await
            .json::<Category>();

        let response = server
            .get(&format_endpoint(endpoints::CATEGORY, created.id))
            .authorization_bearer(&other_token)
            .await;

        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn delete_category_returns_no_content() {
        let state = get_test_app_state();
        let (_, token) = must_create_test_user(&state);
        let server = get_test_server(state);
        let created = server
            .post(endpoints::CATEGORIES)
            .authorization_bearer(&token)
            .json(&groceries())
            .await
            .json::<Category>();

        let response = server
            .delete(&format_endpoint(endpoints::CATEGORY, created.id))
            .authorization_bearer(&token)
            .await;

        response.assert_status(StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn icons_are_listed_by_group() {
        let state = get_test_app_state();
        let (_, token) = must_create_test_user(&state);
        let server = get_test_server(state);

        let response = server
            .get(endpoints::CATEGORY_ICONS)
            .authorization_bearer(&token)
            .await;

        response.assert_status_ok();
        let groups = response.json::<Value>();
        assert_eq!(groups[0]["group"], "income");
        assert_eq!(groups[0]["icons"][0]["name"], "Wallet");
    }
}
