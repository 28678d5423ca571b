//! Defines the endpoint for adding a new record.

use axum::{
    Extension,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
// Must use axum_extra's Form so that the body is parsed by serde_html_form,
// which is what the field alias tests below use.
use axum_extra::extract::Form;
use serde::Deserialize;

use crate::{
    DEFAULT_LIST_LIMIT, Error, endpoints,
    record::{NewRecord, create_record, index_page::index_page},
    timezone::local_today,
    user::UserID,
};

use super::RecordPageState;

/// The raw form data for adding a record.
///
/// Every field is kept as entered so the form can be shown again with the
/// same values if it is rejected.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct AddRecordForm {
    /// "expense" or "income". Older forms call this field `r_type`.
    #[serde(default, rename = "type", alias = "r_type")]
    pub record_type: String,
    /// A non-negative decimal number.
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub category: String,
    /// The date as YYYY-MM-DD, or empty for today. Older forms call this
    /// field `date_str`.
    #[serde(default, alias = "date_str")]
    pub date: String,
    #[serde(default)]
    pub note: String,
}

/// A route handler for adding a record, redirects to the records page on success.
///
/// Invalid input re-renders the records page with the error message and the
/// entered values, with status 400.
pub async fn add_record_endpoint(
    State(state): State<RecordPageState>,
    Extension(user_id): Extension<UserID>,
    Form(form): Form<AddRecordForm>,
) -> Result<Response, Error> {
    let date = match form.date.trim() {
        "" => local_today(&state.local_timezone)?.to_string(),
        date => date.to_owned(),
    };

    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let result = NewRecord::parse(
        Some(user_id),
        &form.record_type,
        &form.amount,
        &form.category,
        &date,
        &form.note,
    )
    .and_then(|new_record| create_record(new_record, &connection));

    match result {
        Ok(record) => {
            tracing::debug!("Saved record {} for user {user_id}.", record.id);
            Ok(Redirect::to(endpoints::ROOT).into_response())
        }
        Err(Error::Validation(error)) => {
            tracing::debug!("Rejected record for user {user_id}: {error}");
            let page = index_page(
                user_id,
                DEFAULT_LIST_LIMIT,
                &form,
                Some(&error.to_string()),
                &state.local_timezone,
                &connection,
            )?;

            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
        Err(error) => {
            tracing::error!("could not create record: {error}");
            Err(error)
        }
    }
}
