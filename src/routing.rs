//! Application router configuration with protected and unprotected route definitions.

use axum::{
    Router, middleware,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::{
    AppState,
    auth::{auth_guard, get_log_in_page, get_log_out, get_register_page, post_log_in, post_register},
    endpoints,
    health::get_health,
    not_found::get_404_not_found,
    record::{add_record_endpoint, delete_record_endpoint, get_index_page},
    summary::get_stats_page,
};

/// Return a router with all the app's routes.
///
/// Pages that show or change records require a session, the log-in,
/// registration and health routes do not.
pub fn build_router(state: AppState) -> Router {
    let unprotected_routes = Router::new()
        .route(endpoints::LOG_IN, get(get_log_in_page).post(post_log_in))
        .route(
            endpoints::REGISTER,
            get(get_register_page).post(post_register),
        )
        .route(endpoints::LOG_OUT, get(get_log_out))
        .route(endpoints::HEALTH, get(get_health));

    let protected_routes = Router::new()
        .route(endpoints::ROOT, get(get_index_page))
        .route(endpoints::ADD_RECORD, post(add_record_endpoint))
        .route(endpoints::DELETE_RECORD, post(delete_record_endpoint))
        .route(endpoints::STATS_VIEW, get(get_stats_page))
        .layer(middleware::from_fn_with_state(state.clone(), auth_guard));

    protected_routes
        .merge(unprotected_routes)
        .nest_service(endpoints::STATIC, ServeDir::new("static/"))
        .fallback(get_404_not_found)
        .with_state(state)
}
