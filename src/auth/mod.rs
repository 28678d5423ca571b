//! Session cookies, the auth middleware and the log-in, registration and log-out pages.

mod cookie;
mod log_in;
mod log_out;
mod middleware;
mod register;
mod token;

pub(crate) use cookie::DEFAULT_COOKIE_DURATION;
pub use log_in::{get_log_in_page, post_log_in};
pub use log_out::get_log_out;
pub use middleware::auth_guard;
pub use register::{get_register_page, post_register};

#[cfg(test)]
pub(crate) use cookie::{COOKIE_TOKEN, set_auth_cookie};
#[cfg(test)]
pub use middleware::AuthState;

/// Reasons why a request does not carry a valid session.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub(crate) enum AuthError {
    /// There is no auth cookie, or it was not encrypted with the server's key.
    #[error("the auth cookie is missing")]
    CookieMissing,

    /// The auth cookie does not hold a token.
    #[error("the auth cookie does not contain a valid token")]
    InvalidToken,

    /// The token in the auth cookie has expired.
    #[error("the auth token has expired")]
    TokenExpired,

    /// The new expiry date could not be computed.
    #[error("could not compute the new expiry date")]
    DateError,
}
