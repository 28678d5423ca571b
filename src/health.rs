//! A liveness check for load balancers and uptime monitors.

use axum::Json;
use serde::Serialize;

/// The body of the health check response.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct Health {
    /// Always `true` while the server is able to respond.
    pub ok: bool,
}

/// Report that the server is up. Always responds with `{"ok": true}`.
pub async fn get_health() -> Json<Health> {
    Json(Health { ok: true })
}
