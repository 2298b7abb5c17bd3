use axum::http::StatusCode;
use axum_test::TestResponse;
use serde_json::Value;

/// Assert the response has `status` and a JSON body with `message`.
#[track_caller]
pub(crate) fn assert_message(response: &TestResponse, status: StatusCode, message: &str) {
    response.assert_status(status);

    let body = response.json::<Value>();
    assert_eq!(
        body["message"], message,
        "want message {message:?}, got {:?}",
        body["message"]
    );
}

/// Assert the response is a validation failure that names `field`.
#[track_caller]
pub(crate) fn assert_violation(response: &TestResponse, field: &str) {
    response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);

    let body = response.json::<Value>();
    let fields: Vec<&str> = body["errors"]
        .as_array()
        .expect("validation response should list errors")
        .iter()
        .filter_map(|violation| violation["field"].as_str())
        .collect();

    assert!(
        fields.contains(&field),
        "want a violation for {field:?}, got {fields:?}"
    );
}
