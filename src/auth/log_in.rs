//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The cookie module handles the lower level session cookie logic.

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
    AppState, Error,
    auth::cookie::{REMEMBER_ME_COOKIE_DURATION, set_auth_cookie},
    endpoints,
    html::{
        BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, base, link,
        log_in_register, password_input,
    },
    user::verify_credentials,
};

pub const INVALID_CREDENTIALS_ERROR_MSG: &str = "Incorrect username or password.";

fn log_in_form(username: &str, error_message: Option<&str>) -> Markup {
    html! {
        form method="post" action=(endpoints::LOG_IN) class="form"
        {
            div
            {
                label for="username" class=(FORM_LABEL_STYLE) { "Username" }

                input
                    type="text"
                    name="username"
                    id="username"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    autofocus
                    value=(username);
            }

            (password_input("password", "Password", "", error_message))

            div class="form-checkbox"
            {
                input type="checkbox" name="remember_me" id="remember_me";

                label for="remember_me" { "Keep me logged in for one week" }
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Log in" }

            p class="form-hint"
            {
                "Don't have an account? "
                (link(endpoints::REGISTER, "Register here"))
            }
        }
    }
}

fn log_in_page(username: &str, error_message: Option<&str>) -> Markup {
    let content = log_in_register("Log in to your account", &log_in_form(username, error_message));

    base("Log In", &[], &content)
}

/// Display the log-in page.
pub async fn get_log_in_page() -> Response {
    log_in_page("", None).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the log-in form.
///
/// The password is stored as a plain string. There is no need for validation here since
/// it will be compared against the password hash in the database.
#[derive(Clone, Deserialize)]
pub struct LogInData {
    /// Username entered during log-in.
    pub username: String,

    /// Password entered during log-in.
    pub password: String,

    /// Whether to extend the initial auth cookie duration.
    ///
    /// This value comes from a checkbox, so it either has a string value or is not set
    /// (see the [MDN docs](https://developer.mozilla.org/en-US/docs/Web/HTML/Element/input/checkbox#value_2)).
    /// The `Some` variant should be interpreted as `true` irregardless of the
    /// string value, and the `None` variant should be interpreted as `false`.
    pub remember_me: Option<String>,
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the auth cookie is set and the client is redirected to the
/// records page. Otherwise, the form is returned with status 401 and an error message.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInData>,
) -> Response {
    let user = {
        let connection = match state.db_connection.lock() {
            Ok(connection) => connection,
            Err(_) => return Error::DatabaseLockError.into_response(),
        };

        match verify_credentials(&user_data.username, &user_data.password, &connection) {
            Ok(user) => user,
            Err(Error::InvalidCredentials) => {
                tracing::info!("Failed log-in attempt for \"{}\".", user_data.username);
                return (
                    StatusCode::UNAUTHORIZED,
                    log_in_page(&user_data.username, Some(INVALID_CREDENTIALS_ERROR_MSG)),
                )
                    .into_response();
            }
            Err(error) => return error.into_response(),
        }
    };

    let cookie_duration = if user_data.remember_me.is_some() {
        REMEMBER_ME_COOKIE_DURATION
    } else {
        state.cookie_duration
    };

    match set_auth_cookie(jar, user.id, cookie_duration) {
        Ok(jar) => (jar, Redirect::to(endpoints::ROOT)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Form,
        extract::State,
        http::{StatusCode, header::SET_COOKIE},
    };
    use axum_extra::extract::{PrivateCookieJar, cookie::Cookie};
    use time::{Duration, OffsetDateTime};

    use crate::{
        PasswordHash, ValidatedPassword,
        app_state::create_cookie_key,
        auth::cookie::{COOKIE_TOKEN, DEFAULT_COOKIE_DURATION},
        endpoints,
        test_utils::{
            assert_form_error_message, assert_form_input, assert_redirect, assert_valid_html,
            get_test_connection, must_get_form, parse_html_document,
        },
        user::{Username, create_user},
    };

    use super::{INVALID_CREDENTIALS_ERROR_MSG, LogInData, LogInState, get_log_in_page, post_log_in};

    const TEST_PASSWORD: &str = "averysafeandsecurepassword";

    fn get_test_state() -> LogInState {
        let connection = get_test_connection();
        create_user(
            Username::new("alice").unwrap(),
            PasswordHash::new(ValidatedPassword::new_unchecked(TEST_PASSWORD), 4).unwrap(),
            None,
            &connection,
        )
        .expect("Could not create test user");

        LogInState {
            cookie_key: create_cookie_key("foobar"),
            cookie_duration: DEFAULT_COOKIE_DURATION,
            db_connection: Arc::new(Mutex::new(connection)),
        }
    }

    fn log_in_data(username: &str, password: &str, remember_me: bool) -> LogInData {
        LogInData {
            username: username.to_owned(),
            password: password.to_owned(),
            remember_me: remember_me.then(|| "on".to_owned()),
        }
    }

    async fn log_in(state: LogInState, data: LogInData) -> axum::response::Response {
        let jar = PrivateCookieJar::new(state.cookie_key.clone());

        post_log_in(State(state), jar, Form(data)).await
    }

    fn get_token_cookie(response: &axum::response::Response) -> Cookie<'static> {
        response
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .map(|header| Cookie::parse(header.to_str().unwrap().to_owned()).unwrap())
            .find(|cookie| cookie.name() == COOKIE_TOKEN)
            .expect("token cookie not set")
    }

    #[tokio::test]
    async fn log_in_page_displays_form() {
        let response = get_log_in_page().await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_eq!(form.value().attr("action"), Some(endpoints::LOG_IN));
        assert_form_input(&form, "username", "text");
        assert_form_input(&form, "password", "password");
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let response = log_in(get_test_state(), log_in_data("alice", TEST_PASSWORD, false)).await;

        assert_redirect(&response, endpoints::ROOT);
        let cookie = get_token_cookie(&response);
        let expiry = cookie.expires_datetime().unwrap();
        assert!(
            (expiry - (OffsetDateTime::now_utc() + DEFAULT_COOKIE_DURATION)).abs()
                < Duration::seconds(2)
        );
    }

    #[tokio::test]
    async fn remember_me_extends_session_to_a_week() {
        let response = log_in(get_test_state(), log_in_data("alice", TEST_PASSWORD, true)).await;

        let cookie = get_token_cookie(&response);
        let expiry = cookie.expires_datetime().unwrap();
        assert!(
            (expiry - (OffsetDateTime::now_utc() + Duration::days(7))).abs() < Duration::seconds(2)
        );
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let response = log_in(get_test_state(), log_in_data("alice", "wrong", false)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(response.headers().get(SET_COOKIE).is_none());
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        let form = must_get_form(&document);
        assert_form_error_message(&form, INVALID_CREDENTIALS_ERROR_MSG);
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_username() {
        let response = log_in(get_test_state(), log_in_data("mallory", TEST_PASSWORD, false)).await;

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let document = parse_html_document(response).await;
        let form = must_get_form(&document);
        assert_form_error_message(&form, INVALID_CREDENTIALS_ERROR_MSG);
    }
}
