//! Tally is a web app for keeping track of personal income and expenses.
//!
//! This library provides a web server that directly serves HTML pages, along
//! with the record store, user store and the aggregation functions used to
//! build monthly and weekly summaries.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_server::Handle;
use tokio::signal;

mod app_state;
mod auth;
mod database_id;
mod db;
mod endpoints;
mod health;
mod html;
mod internal_server_error;
mod logging;
mod navigation;
mod not_found;
mod password;
mod record;
mod routing;
mod summary;
mod timezone;
mod user;

#[cfg(test)]
mod test_utils;

pub use app_state::AppState;
pub use database_id::RecordId;
pub use db::initialize as initialize_db;
pub use logging::{LOG_BODY_LENGTH_LIMIT, logging_middleware};
pub use password::{PasswordHash, ValidatedPassword};
pub use record::{
    Amount, DEFAULT_LIST_LIMIT, NewRecord, Record, RecordType, count_records, create_record,
    delete_record, get_record, list_records,
};
pub use routing::build_router;
pub use summary::{
    CategoryTotal, DateRange, MonthTotals, Period, RangeSummary, UNCATEGORIZED_LABEL,
    category_breakdown, month_range, monthly_history, range_summary, week_range,
};
pub use timezone::get_local_offset;
pub use user::{
    DEMO_PASSWORD, DEMO_USERNAME, Phone, User, UserID, Username, count_users, create_user,
    get_or_create_demo_user, get_user_by_id, get_user_by_username, update_password,
    verify_credentials,
};

use crate::{
    html::error_view, internal_server_error::InternalServerError,
    not_found::get_404_not_found_response,
};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// Reasons why user supplied data was rejected.
///
/// The messages are shown to the user, so they should explain how to fix the
/// input.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum ValidationError {
    /// The record type was not one of "expense" or "income".
    #[error("\"{0}\" is not a valid type, choose either expense or income")]
    RecordType(String),

    /// The amount was not a decimal number between zero and [Amount::MAX].
    #[error("\"{0}\" is not a valid amount, enter a number from 0 to 9999999999.99")]
    Amount(String),

    /// The date was not a valid calendar date in the format YYYY-MM-DD.
    #[error("\"{0}\" is not a valid date, use the format YYYY-MM-DD")]
    Date(String),

    /// The username was empty, too long or contained disallowed characters.
    #[error(
        "usernames must be 3 to 50 characters long and only contain letters, \
        digits, '_', '-' or '.'"
    )]
    Username(String),

    /// The phone number contained disallowed characters or was too long.
    #[error("\"{0}\" is not a valid phone number")]
    Phone(String),

    /// The password and its confirmation were different.
    #[error("passwords do not match")]
    PasswordMismatch,
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided data that failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A month or week identifier could not be parsed.
    ///
    /// Months must look like "2024-02" and weeks like "2024-W07".
    #[error("\"{0}\" is not a valid period, use YYYY-MM for months or YYYY-Www for weeks")]
    InvalidPeriod(String),

    /// The username is already taken by another user.
    #[error("the username \"{0}\" is already taken")]
    DuplicateUsername(String),

    /// The user provided an invalid combination of username and password.
    #[error("invalid username or password")]
    InvalidCredentials,

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// A record referred to a user that does not exist.
    ///
    /// This happens when a session outlives the user it belongs to, e.g.
    /// after the database has been replaced.
    #[error("the user {0} does not exist")]
    UnknownOwner(UserID),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// The auth cookie could not be created or read.
    #[error("could not create the auth cookie: {0}")]
    CookieError(String),

    /// An error occurred while getting the local timezone from a canonical timezone string.
    #[error("invalid timezone {0}")]
    InvalidTimezoneError(String),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            Error::InvalidPeriod(_) | Error::Validation(_) => {
                let fix = self.to_string();
                let page = error_view("Bad Request", "400", "Invalid request", &fix);

                (StatusCode::BAD_REQUEST, page).into_response()
            }
            Error::UnknownOwner(user_id) => {
                tracing::warn!("Session refers to missing user {user_id}, logging out.");
                Redirect::to(endpoints::LOG_OUT).into_response()
            }
            Error::InvalidTimezoneError(timezone) => InternalServerError {
                description: "Invalid Timezone Settings",
                fix: &format!(
                    "Could not get local timezone \"{timezone}\". Check your server settings and \
                    ensure the timezone has been set to valid, canonical timezone string"
                ),
            }
            .into_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}
