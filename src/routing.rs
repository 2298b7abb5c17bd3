//! Application router configuration.
//!
//! Authentication is enforced per handler by the [crate::auth::CurrentUser]
//! extractor, so public and protected routes share one router.

use axum::{
    Json, Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;

use crate::{
    AppState, Error,
    auth::{
        change_password, forgot_password, get_profile, log_in, patch_profile, register_user,
        reset_password,
    },
    budget::{
        create_budget_endpoint, delete_budget_endpoint, get_budget_endpoint,
        list_budgets_endpoint,
    },
    category::{
        create_category_endpoint, delete_category_endpoint, get_category_endpoint,
        get_icons_endpoint, list_categories_endpoint, update_category_endpoint,
    },
    csv_import::{MAX_IMPORT_BODY_SIZE, import_transactions_endpoint},
    endpoints,
    logging::logging_middleware,
    report::get_summary_report_endpoint,
    transaction::{
        create_transaction_endpoint, delete_transaction_endpoint, get_transaction_endpoint,
        list_transactions_endpoint, update_transaction_endpoint,
    },
};

/// Return a router with all the app's routes.
pub fn build_router(state: AppState) -> Router {
    let auth_routes = Router::new()
        .route(endpoints::REGISTER, post(register_user))
        .route(endpoints::LOG_IN, post(log_in))
        .route(endpoints::FORGOT_PASSWORD, post(forgot_password))
        .route(endpoints::RESET_PASSWORD, post(reset_password));

    let user_routes = Router::new()
        .route(endpoints::ME, get(get_profile).patch(patch_profile))
        .route(endpoints::ME_PASSWORD, put(change_password));

    let category_routes = Router::new()
        .route(
            endpoints::CATEGORIES,
            get(list_categories_endpoint).post(create_category_endpoint),
        )
        .route(endpoints::CATEGORY_ICONS, get(get_icons_endpoint))
        .route(
            endpoints::CATEGORY,
            get(get_category_endpoint)
                .patch(update_category_endpoint)
                .delete(delete_category_endpoint),
        );

    let transaction_routes = Router::new()
        .route(
            endpoints::TRANSACTIONS,
            get(list_transactions_endpoint).post(create_transaction_endpoint),
        )
        .route(
            endpoints::TRANSACTION,
            get(get_transaction_endpoint)
                .patch(update_transaction_endpoint)
                .delete(delete_transaction_endpoint),
        )
        .route(
            endpoints::IMPORT,
            post(import_transactions_endpoint).layer(DefaultBodyLimit::max(MAX_IMPORT_BODY_SIZE)),
        );

    let budget_routes = Router::new()
        .route(
            endpoints::BUDGETS,
            get(list_budgets_endpoint).post(create_budget_endpoint),
        )
        .route(
            endpoints::BUDGET,
            get(get_budget_endpoint).delete(delete_budget_endpoint),
        );

    Router::new()
        .route(endpoints::COFFEE, get(get_coffee))
        .route(endpoints::REPORT_SUMMARY, get(get_summary_report_endpoint))
        .merge(auth_routes)
        .merge(user_routes)
        .merge(category_routes)
        .merge(transaction_routes)
        .merge(budget_routes)
        .fallback(get_404_not_found)
        .layer(middleware::from_fn(logging_middleware))
        .with_state(state)
}

/// Attempt to get a cup of coffee from the server.
async fn get_coffee() -> Response {
    (
        StatusCode::IM_A_TEAPOT,
        Json(json!({ "message": "I'm a teapot" })),
    )
        .into_response()
}

async fn get_404_not_found() -> Response {
    Error::NotFound.into_response()
}

#[cfg(test)]
mod router_tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::{
        endpoints,
        test_utils::{assert_message, get_test_app_state, get_test_server, must_create_test_user},
    };

    #[tokio::test]
    async fn coffee_is_a_teapot() {
        let server = get_test_server(get_test_app_state());

        let response = server.get(endpoints::COFFEE).await;

        assert_message(&response, StatusCode::IM_A_TEAPOT, "I'm a teapot");
    }

    #[tokio::test]
    async fn unknown_routes_are_json_404s() {
        let server = get_test_server(get_test_app_state());

        let response = server.get("/api/does-not-exist").await;

        assert_message(
            &response,
            StatusCode::NOT_FOUND,
            "The requested resource could not be found",
        );
    }

    #[tokio::test]
    async fn protected_routes_require_a_token() {
        let server = get_test_server(get_test_app_state());

        for route in [
            endpoints::ME,
            endpoints::CATEGORIES,
            endpoints::CATEGORY_ICONS,
            endpoints::TRANSACTIONS,
            endpoints::BUDGETS,
        ] {
            let response = server.get(route).await;

            assert_message(
                &response,
                StatusCode::UNAUTHORIZED,
                "Authorization header missing",
            );
        }
    }

    #[tokio::test]
    async fn icon_route_is_not_shadowed_by_category_id() {
        let state = get_test_app_state();
        let (_, token) = must_create_test_user(&state);
        let server = get_test_server(state);

        server
            .get(endpoints::CATEGORY_ICONS)
            .authorization_bearer(token)
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn logging_middleware_passes_bodies_through() {
        let server = get_test_server(get_test_app_state());

        let response = server
            .post(endpoints::REGISTER)
            .json(&json!({
                "email": "logged@example.com",
                "password": "Hunter2Hunter2",
                "name": "Logged User",
            }))
            .await;

        response.assert_status(StatusCode::CREATED);
        assert_eq!(response.json::<serde_json::Value>()["email"], "logged@example.com");
    }
}
