//! The registration page for creating a new account.
use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword, ValidationError,
    auth::cookie::set_auth_cookie,
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_ERROR_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base,
        link, log_in_register, password_input,
    },
    user::{Phone, Username, create_user},
};

/// Error messages to show next to the fields of the registration form.
#[derive(Debug, Default)]
struct RegistrationErrors {
    username: Option<String>,
    phone: Option<String>,
    password: Option<String>,
    confirm_password: Option<String>,
}

fn text_input(
    name: &str,
    label: &str,
    value: &str,
    required: bool,
    error_message: Option<&str>,
) -> Markup {
    html! {
        div
        {
            label for=(name) class=(FORM_LABEL_STYLE) { (label) }

            input
                type="text"
                name=(name)
                id=(name)
                class=(FORM_TEXT_INPUT_STYLE)
                required[required]
                value=(value);

            @if let Some(error_message) = error_message
            {
                p class=(FORM_ERROR_STYLE) { (error_message) }
            }
        }
    }
}

fn registration_form(form: &RegisterForm, errors: &RegistrationErrors) -> Markup {
    html! {
        form method="post" action=(endpoints::REGISTER) class="form"
        {
            (text_input("username", "Username", &form.username, true, errors.username.as_deref()))
            (text_input("phone", "Phone (optional)", &form.phone, false, errors.phone.as_deref()))
            (password_input("password", "Password", &form.password, errors.password.as_deref()))
            (password_input(
                "confirm_password",
                "Confirm Password",
                &form.confirm_password,
                errors.confirm_password.as_deref(),
            ))

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Create Account" }

            p class="form-hint"
            {
                "Already have an account? "
                (link(endpoints::LOG_IN, "Log in here"))
            }
        }
    }
}

fn registration_page(form: &RegisterForm, errors: &RegistrationErrors) -> Markup {
    let content = log_in_register("Create an account", &registration_form(form, errors));

    base("Register", &[], &content)
}

/// Display the registration page.
pub async fn get_register_page() -> Response {
    registration_page(&RegisterForm::default(), &RegistrationErrors::default()).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    #[serde(default)]
    pub phone: String,
}

/// Create a new account, log the new user in and redirect to the records page.
///
/// Invalid input re-renders the form with status 400, or 409 if the username
/// is already taken.
pub async fn post_register(
    State(state): State<RegistrationState>,
    jar: PrivateCookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    let reject = |status: StatusCode, errors: RegistrationErrors| {
        (status, registration_page(&form, &errors)).into_response()
    };

    let username = match Username::new(&form.username) {
        Ok(username) => username,
        Err(error) => {
            return reject(
                StatusCode::BAD_REQUEST,
                RegistrationErrors {
                    username: Some(error.to_string()),
                    ..Default::default()
                },
            );
        }
    };

    let phone = match Phone::parse_optional(&form.phone) {
        Ok(phone) => phone,
        Err(error) => {
            return reject(
                StatusCode::BAD_REQUEST,
                RegistrationErrors {
                    phone: Some(error.to_string()),
                    ..Default::default()
                },
            );
        }
    };

    if form.password != form.confirm_password {
        return reject(
            StatusCode::BAD_REQUEST,
            RegistrationErrors {
                confirm_password: Some(ValidationError::PasswordMismatch.to_string()),
                ..Default::default()
            },
        );
    }

    let validated_password = match ValidatedPassword::new(
        &form.password,
        &[username.as_ref(), form.phone.trim()],
    ) {
        Ok(password) => password,
        Err(error) => {
            return reject(
                StatusCode::BAD_REQUEST,
                RegistrationErrors {
                    password: Some(error.to_string()),
                    ..Default::default()
                },
            );
        }
    };

    let password_hash = match PasswordHash::new(validated_password, PasswordHash::DEFAULT_COST) {
        Ok(password_hash) => password_hash,
        Err(error) => return error.into_response(),
    };

    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return Error::DatabaseLockError.into_response(),
        };

        match create_user(username, password_hash, phone, &connection) {
            Ok(user) => user,
            Err(error @ Error::DuplicateUsername(_)) => {
                return reject(
                    StatusCode::CONFLICT,
                    RegistrationErrors {
                        username: Some(error.to_string()),
                        ..Default::default()
                    },
                );
            }
            Err(error) => return error.into_response(),
        }
    };

    tracing::info!("Registered new user \"{}\" with ID {}.", user.username, user.id);

    match set_auth_cookie(jar, user.id, state.cookie_duration) {
        Ok(jar) => (jar, Redirect::to(endpoints::ROOT)).into_response(),
        Err(error) => error.into_response(),
    }
}
