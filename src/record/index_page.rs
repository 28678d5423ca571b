//! The records page: the add form, this month's totals and the most recent records.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, Query, State},
    response::{IntoResponse, Response},
};
use maud::{Markup, html};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error, endpoints,
    html::{
        BUTTON_DELETE_STYLE, BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_ERROR_STYLE, FORM_LABEL_STYLE,
        FORM_TEXT_INPUT_STYLE, LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_NUMBER_STYLE,
        TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE, base, format_amount,
    },
    navigation::NavBar,
    record::{
        AddRecordForm, DEFAULT_LIST_LIMIT, Record, RecordType, count_records, list_records,
    },
    summary::{Period, RangeSummary, UNCATEGORIZED_LABEL, range_summary},
    timezone::local_today,
    user::UserID,
};

/// The largest number of records that can be shown at once.
pub const MAX_LIST_LIMIT: u32 = 1000;

/// The state needed for the records page and the add endpoint.
#[derive(Debug, Clone)]
pub struct RecordPageState {
    /// The database connection for managing records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for RecordPageState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The query string of the records page.
#[derive(Debug, Default, Deserialize)]
pub struct IndexQuery {
    /// How many records to show. Kept as text so that an empty or malformed
    /// value falls back to the default instead of rejecting the request.
    pub limit: Option<String>,
}

impl IndexQuery {
    fn limit(&self) -> u32 {
        self.limit
            .as_deref()
            .and_then(|limit| limit.trim().parse::<i64>().ok())
            .map(|limit| limit.clamp(1, MAX_LIST_LIMIT as i64) as u32)
            .unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

/// Display the records page with an empty add form.
pub async fn get_index_page(
    State(state): State<RecordPageState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<IndexQuery>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
        .map_err(|_| Error::DatabaseLockError)?;

    let page = index_page(
        user_id,
        query.limit(),
        &AddRecordForm::default(),
        None,
        &state.local_timezone,
        &connection,
    )?;

    Ok(page.into_response())
}

/// Everything shown on the records page.
struct IndexData<'a> {
    records: Vec<Record>,
    record_count: usize,
    month: Period,
    month_summary: RangeSummary,
    form: &'a AddRecordForm,
    error_message: Option<&'a str>,
}

/// Render the records page for `owner`.
///
/// `form` holds the values to fill the add form with and `error_message` is
/// shown above the form, e.g. after a rejected submission.
pub(super) fn index_page(
    owner: UserID,
    limit: u32,
    form: &AddRecordForm,
    error_message: Option<&str>,
    local_timezone: &str,
    connection: &Connection,
) -> Result<Markup, Error> {
    let today = local_today(local_timezone)?;
    let month = Period::month_of(today);

    let data = IndexData {
        records: list_records(Some(owner), limit, connection)?,
        record_count: count_records(Some(owner), connection)?,
        month,
        month_summary: range_summary(Some(owner), month.range(), connection)?.rounded(),
        form,
        error_message,
    };

    Ok(index_view(&data))
}

fn index_view(data: &IndexData) -> Markup {
    let nav_bar = NavBar::new(endpoints::ROOT).into_html();

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            (month_summary_view(data.month, &data.month_summary))

            section class=(CARD_STYLE)
            {
                h2 { "Add a record" }

                (add_record_form(data.form, data.error_message))
            }

            section class=(CARD_STYLE)
            {
                h2 { "Recent records" }

                @if data.records.is_empty() {
                    p class="empty-state" { "No records yet." }
                } @else {
                    p class="table-caption"
                    {
                        "Showing " (data.records.len()) " of " (data.record_count) " records."
                    }

                    (records_table(&data.records))
                }
            }
        }
    );

    base("Records", &[], &content)
}

fn month_summary_view(month: Period, summary: &RangeSummary) -> Markup {
    let stats_url = format!("{}?month={month}", endpoints::STATS_VIEW);

    html!(
        section class="summary-cards" id="month-summary"
        {
            div class=(CARD_STYLE)
            {
                h2 class="card-title" { "Spent in " (month.label()) }
                p class="card-value" id="month-expenses" { (format_amount(summary.expense_total)) }
            }

            div class=(CARD_STYLE)
            {
                h2 class="card-title" { "Earned in " (month.label()) }
                p class="card-value" id="month-income" { (format_amount(summary.income_total)) }
            }

            div class=(CARD_STYLE)
            {
                h2 class="card-title" { "Balance" }
                p class="card-value" id="month-balance" { (format_amount(summary.balance)) }
                a href=(stats_url) class=(LINK_STYLE) { "See the breakdown" }
            }
        }
    )
}

fn add_record_form(form: &AddRecordForm, error_message: Option<&str>) -> Markup {
    let is_income = form
        .record_type
        .trim()
        .eq_ignore_ascii_case(RecordType::Income.as_str());

    html!(
        form method="post" action=(endpoints::ADD_RECORD) class="form-grid"
        {
            @if let Some(error_message) = error_message {
                p class=(FORM_ERROR_STYLE) { (error_message) }
            }

            div
            {
                label for="type" class=(FORM_LABEL_STYLE) { "Type" }

                select name="type" id="type" class=(FORM_TEXT_INPUT_STYLE) required
                {
                    option value=(RecordType::Expense.as_str()) selected[!is_income]
                    {
                        (RecordType::Expense.label())
                    }
                    option value=(RecordType::Income.as_str()) selected[is_income]
                    {
                        (RecordType::Income.label())
                    }
                }
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                input
                    type="text"
                    inputmode="decimal"
                    name="amount"
                    id="amount"
                    placeholder="0.00"
                    class=(FORM_TEXT_INPUT_STYLE)
                    required
                    value=(form.amount);
            }

            div
            {
                label for="category" class=(FORM_LABEL_STYLE) { "Category" }

                input
                    type="text"
                    name="category"
                    id="category"
                    placeholder=(UNCATEGORIZED_LABEL)
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(form.category);
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    type="date"
                    name="date"
                    id="date"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(form.date);
            }

            div
            {
                label for="note" class=(FORM_LABEL_STYLE) { "Note" }

                input
                    type="text"
                    name="note"
                    id="note"
                    class=(FORM_TEXT_INPUT_STYLE)
                    value=(form.note);
            }

            button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Add" }
        }
    )
}

fn records_table(records: &[Record]) -> Markup {
    html!(
        table class=(TABLE_STYLE) id="records"
        {
            thead class=(TABLE_HEADER_STYLE)
            {
                tr
                {
                    th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                    th scope="col" class=(TABLE_CELL_NUMBER_STYLE) { "Amount" }
                    th scope="col" class=(TABLE_CELL_STYLE) { "Note" }
                    th scope="col" class=(TABLE_CELL_STYLE) { span class="sr-only" { "Actions" } }
                }
            }

            tbody
            {
                @for record in records {
                    (record_row(record))
                }
            }
        }
    )
}

fn record_row(record: &Record) -> Markup {
    let delete_url = endpoints::format_endpoint(endpoints::DELETE_RECORD, record.id);
    let row_id = format!("record-{}", record.id);
    let type_style = format!("{TABLE_CELL_STYLE} {}", record.record_type.as_str());
    let category = if record.category.is_empty() {
        UNCATEGORIZED_LABEL
    } else {
        &record.category
    };

    html!(
        tr class=(TABLE_ROW_STYLE) id=(row_id)
        {
            td class=(TABLE_CELL_STYLE) { (record.date) }
            td class=(type_style) { (record.record_type.label()) }
            td class=(TABLE_CELL_STYLE) { (category) }
            td class=(TABLE_CELL_NUMBER_STYLE) { (format_amount(record.amount.value())) }
            td class=(TABLE_CELL_STYLE) { (record.note.as_deref().unwrap_or_default()) }
            td class=(TABLE_CELL_STYLE)
            {
                form
                    method="post"
                    action=(delete_url)
                    hx-post=(delete_url)
                    hx-target="closest tr"
                    hx-swap="outerHTML"
                    hx-confirm="Delete this record?"
                {
                    button type="submit" class=(BUTTON_DELETE_STYLE) { "Delete" }
                }
            }
        }
    )
}

#[cfg(test)]
mod index_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
    };
    use scraper::{ElementRef, Html, Selector};

    use crate::{
        endpoints,
        record::{NewRecord, create_record},
        test_utils::{
            assert_form_input, assert_form_submit_button_with_text, assert_hx_endpoint,
            assert_valid_html, create_test_user, get_test_connection, must_get_form_with_action,
            parse_html_document, text_of, texts_of,
        },
        user::UserID,
    };

    use super::{IndexQuery, RecordPageState, get_index_page};

    fn get_test_state() -> (RecordPageState, UserID) {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);

        let state = RecordPageState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        (state, user_id)
    }

    fn add(state: &RecordPageState, owner: UserID, amount: &str, category: &str, date: &str) {
        let record =
            NewRecord::parse(Some(owner), "expense", amount, category, date, "lunch").unwrap();
        create_record(record, &state.db_connection.lock().unwrap()).unwrap();
    }

    async fn get_document(state: RecordPageState, user_id: UserID, limit: Option<&str>) -> Html {
        let query = IndexQuery {
            limit: limit.map(str::to_owned),
        };
        let response = get_index_page(State(state), Extension(user_id), Query(query))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        document
    }

    fn record_rows(document: &Html) -> Vec<ElementRef<'_>> {
        document
            .select(&Selector::parse("#records tbody tr").unwrap())
            .collect()
    }

    #[tokio::test]
    async fn shows_add_form() {
        let (state, user_id) = get_test_state();

        let document = get_document(state, user_id, None).await;

        let form = must_get_form_with_action(&document, endpoints::ADD_RECORD);
        assert_form_input(&form, "amount", "text");
        assert_form_submit_button_with_text(&form, "Add");
        let select = form
            .select(&Selector::parse("select[name=type]").unwrap())
            .next()
            .expect("No type select found");
        let options: Vec<_> = select
            .select(&Selector::parse("option").unwrap())
            .filter_map(|option| option.value().attr("value"))
            .collect();
        assert_eq!(options, vec!["expense", "income"]);
    }

    #[tokio::test]
    async fn lists_records_newest_first_with_delete_buttons() {
        let (state, user_id) = get_test_state();
        add(&state, user_id, "1", "", "2024-01-01");
        add(&state, user_id, "2", "bus", "2024-03-01");
        add(&state, user_id, "3", "food", "2024-02-01");

        let document = get_document(state, user_id, None).await;

        let rows = record_rows(&document);
        let ids: Vec<_> = rows
            .iter()
            .filter_map(|row| row.value().attr("id"))
            .collect();
        assert_eq!(ids, vec!["record-2", "record-3", "record-1"]);

        let cells = texts_of(&document, "#record-1 td");
        assert_eq!(
            cells[..5],
            ["2024-01-01", "Expense", "Uncategorized", "1.00", "lunch"]
        );

        let delete_form = rows[0]
            .select(&Selector::parse("form").unwrap())
            .next()
            .expect("No delete form found");
        assert_hx_endpoint(&delete_form, "/delete/2", "hx-post");
        assert_eq!(delete_form.value().attr("hx-target"), Some("closest tr"));
        assert_eq!(delete_form.value().attr("hx-swap"), Some("outerHTML"));
    }

    #[tokio::test]
    async fn limit_bounds_number_of_rows() {
        let (state, user_id) = get_test_state();
        for day in 1..=5 {
            add(&state, user_id, "1", "", &format!("2024-01-0{day}"));
        }

        let document = get_document(state.clone(), user_id, Some("2")).await;
        assert_eq!(record_rows(&document).len(), 2);

        let document = get_document(state.clone(), user_id, Some("0")).await;
        assert_eq!(record_rows(&document).len(), 1);

        let document = get_document(state, user_id, Some("")).await;
        assert_eq!(record_rows(&document).len(), 5);
    }

    #[tokio::test]
    async fn shows_empty_state_without_records() {
        let (state, user_id) = get_test_state();

        let document = get_document(state, user_id, None).await;

        assert!(record_rows(&document).is_empty());
        assert_eq!(text_of(&document, ".empty-state"), "No records yet.");
    }

    #[tokio::test]
    async fn shows_current_month_totals() {
        let (state, user_id) = get_test_state();
        let today = time::OffsetDateTime::now_utc().date().to_string();
        add(&state, user_id, "10.005", "food", &today);
        add(&state, user_id, "99", "food", "2000-01-01");

        let document = get_document(state, user_id, None).await;

        assert_eq!(text_of(&document, "#month-expenses"), "10.01");
    }

    #[test]
    fn limit_is_clamped() {
        let limit = |value: &str| {
            IndexQuery {
                limit: Some(value.to_owned()),
            }
            .limit()
        };

        assert_eq!(IndexQuery::default().limit(), 200);
        assert_eq!(limit("50"), 50);
        assert_eq!(limit("0"), 1);
        assert_eq!(limit("-3"), 1);
        assert_eq!(limit("5000"), 1000);
        assert_eq!(limit("lots"), 200);
    }
}
