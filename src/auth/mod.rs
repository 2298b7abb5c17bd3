//! Bearer-token authentication and the account endpoints built on it.

mod change_password;
mod log_in;
mod password_reset;
mod profile;
mod register;
mod token;

pub use change_password::change_password;
pub use log_in::{LogInResponse, log_in};
pub use password_reset::{
    DEFAULT_RESET_TOKEN_DURATION, create_password_reset_token_table, forgot_password,
    reset_password,
};
pub use profile::{get_profile, patch_profile};
pub use register::register_user;
pub use token::{AuthState, CurrentUser, DEFAULT_TOKEN_DURATION, JwtKeys, issue_token};
