#![allow(missing_docs)]

pub(crate) mod app;
pub(crate) mod http;

pub(crate) use app::{
    TEST_PASSWORD, get_test_app_state, get_test_server, must_create_category,
    must_create_test_user, must_create_user_with_email, must_insert_user,
};
pub(crate) use http::{assert_message, assert_violation};
