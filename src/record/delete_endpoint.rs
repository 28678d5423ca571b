//! Defines the endpoint for deleting a record.
use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
};
use axum_htmx::HX_REQUEST;
use rusqlite::Connection;

use crate::{AppState, Error, database_id::RecordId, endpoints, record::delete_record, user::UserID};

/// The state needed to delete a record.
#[derive(Debug, Clone)]
pub struct DeleteRecordState {
    /// The database connection for managing records.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DeleteRecordState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler for deleting one of the user's records.
///
/// Deleting a record that does not exist, or belongs to someone else, does
/// nothing. HTMX requests get an empty response so the table row is swapped
/// out in place, other requests are redirected to the records page.
pub async fn delete_record_endpoint(
    State(state): State<DeleteRecordState>,
    Extension(user_id): Extension<UserID>,
    Path(record_id): Path<RecordId>,
    headers: HeaderMap,
) -> Result<Response, Error> {
    let deleted = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        delete_record(Some(user_id), record_id, &connection)
            .inspect_err(|error| tracing::error!("Could not delete record {record_id}: {error}"))?
    };

    if !deleted {
        tracing::debug!("User {user_id} tried to delete missing record {record_id}.");
    }

    if headers.contains_key(HX_REQUEST) {
        // The status code has to be 200 OK or HTMX will not remove the table row.
        Ok(StatusCode::OK.into_response())
    } else {
        Ok(Redirect::to(endpoints::ROOT).into_response())
    }
}
