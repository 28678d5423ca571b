//! The endpoint URIs.
//!
//! For endpoints that take a parameter, e.g., '/delete/{record_id}', use [format_endpoint].

/// The landing page which lists recent records and the add form.
pub const ROOT: &str = "/";
/// The route for saving a new record.
pub const ADD_RECORD: &str = "/add";
/// The route for deleting a record.
pub const DELETE_RECORD: &str = "/delete/{record_id}";
/// The page with monthly and weekly summaries.
pub const STATS_VIEW: &str = "/stats";
/// The liveness probe.
pub const HEALTH: &str = "/health";
/// The route for getting the log in page and logging in.
pub const LOG_IN: &str = "/login";
/// The route for getting the registration page and registering.
pub const REGISTER: &str = "/register";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/logout";
/// The route for static files.
pub const STATIC: &str = "/static";

/// Replace the parameter in `endpoint_path` with `id`.
///
/// A parameter is a string that starts with a left brace, followed by
/// lowercase letters or underscores, and ends with a right brace.
/// For example, in the endpoint path '/delete/{record_id}', '{record_id}' is the parameter.
///
/// This function assumes that an endpoint path only contains ASCII characters
/// and a single parameter.
///
/// If no parameter is found in `endpoint_path`, the function returns the
/// the original `endpoint_path`.
pub fn format_endpoint(endpoint_path: &str, id: i64) -> String {
    let mut param_start = None;
    let mut param_end = None;

    for (i, c) in endpoint_path.chars().enumerate() {
        if c == '{' {
            param_start = Some(i);
        } else if param_start.is_some() && c == '}' {
            param_end = Some(i + 1);
            break;
        }
    }

    let param_start = match param_start {
        Some(start) => start,
        None => return endpoint_path.to_string(),
    };

    let param_end = param_end.unwrap_or(endpoint_path.len());

    format!(
        "{}{}{}",
        &endpoint_path[..param_start],
        id,
        &endpoint_path[param_end..]
    )
}
