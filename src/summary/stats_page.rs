//! The stats page: totals, category breakdowns and a month-by-month history
//! for one calendar month or ISO week.

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
        BUTTON_PRIMARY_STYLE, CARD_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, HeadElement,
        LINK_STYLE, PAGE_CONTAINER_STYLE, TABLE_CELL_NUMBER_STYLE, TABLE_CELL_STYLE,
        TABLE_HEADER_STYLE, TABLE_ROW_STYLE, TABLE_STYLE, base, format_amount, link,
    },
    navigation::NavBar,
    record::RecordType,
    summary::{
        aggregation::{
            CategoryTotal, MonthTotals, RangeSummary, breakdown_by_category, get_entries,
            monthly_history, summarize,
        },
        charts::{
            ECHARTS_SCRIPT_URL, EXPENSE_CHART_ID, StatsChart, chart_script, chart_view,
            expense_pie_chart,
        },
        period::Period,
    },
    timezone::local_today,
    user::UserID,
};

/// The state needed for the stats page.
#[derive(Debug, Clone)]
pub struct StatsState {
    /// The database connection for reading records.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The local timezone as a canonical timezone name, e.g. "Pacific/Auckland".
    pub local_timezone: String,
}

impl FromRef<AppState> for StatsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            local_timezone: state.local_timezone.clone(),
        }
    }
}

/// The query string of the stats page.
///
/// Empty values are treated the same as missing ones, so submitting the
/// period picker without choosing anything shows the current period.
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    /// "week" to show ISO weeks, anything else shows calendar months.
    pub mode: Option<String>,
    /// The month to show, e.g. "2024-02".
    pub month: Option<String>,
    /// The week to show, e.g. "2024-W07".
    pub week: Option<String>,
}

impl StatsQuery {
    fn is_week_mode(&self) -> bool {
        non_empty(&self.mode).is_some_and(|mode| mode.eq_ignore_ascii_case("week"))
    }

    /// The period named by the query, or the one containing `today`.
    fn period(&self, today: time::Date) -> Result<Period, Error> {
        if self.is_week_mode() {
            match non_empty(&self.week) {
                Some(week) => Period::parse_week(week),
                None => Ok(Period::week_of(today)),
            }
        } else {
            match non_empty(&self.month) {
                Some(month) => Period::parse_month(month),
                None => Ok(Period::month_of(today)),
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

/// Everything shown on the stats page.
struct StatsData {
    period: Period,
    summary: RangeSummary,
    expenses: Vec<CategoryTotal>,
    income: Vec<CategoryTotal>,
    history: Vec<MonthTotals>,
}

/// Display the totals and category breakdowns for a month or week.
///
/// # Errors
/// Returns [Error::InvalidPeriod] if the query names a malformed month or week.
pub async fn get_stats_page(
    State(state): State<StatsState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<StatsQuery>,
) -> Result<Response, Error> {
    let today = local_today(&state.local_timezone)?;
    let period = query.period(today)?;
    let range = period.range();

    let data = {
        let connection = state
            .db_connection
            .lock()
            .inspect_err(|error| tracing::error!("could not acquire database lock: {error}"))
            .map_err(|_| Error::DatabaseLockError)?;

        let entries = get_entries(Some(user_id), Some(range), &connection)?;
        let history = monthly_history(Some(user_id), &connection)?;

        StatsData {
            period,
            summary: summarize(&entries, range),
            expenses: breakdown_by_category(&entries, range, RecordType::Expense),
            income: breakdown_by_category(&entries, range, RecordType::Income),
            history,
        }
    };

    Ok(stats_view(&data).into_response())
}

/// The stats page URL that shows `period`.
fn period_url(period: &Period) -> String {
    match period {
        Period::Month { .. } => format!("{}?month={period}", endpoints::STATS_VIEW),
        Period::Week { .. } => format!("{}?mode=week&week={period}", endpoints::STATS_VIEW),
    }
}

fn stats_view(data: &StatsData) -> Markup {
    let nav_bar = NavBar::new(endpoints::STATS_VIEW).into_html();

    let chart = (!data.expenses.is_empty()).then(|| StatsChart {
        id: EXPENSE_CHART_ID,
        options: expense_pie_chart(&data.expenses, &data.period.label()).to_string(),
    });
    let head_elements = match &chart {
        Some(chart) => vec![
            HeadElement::ScriptLink(ECHARTS_SCRIPT_URL.to_owned()),
            chart_script(chart),
        ],
        None => vec![],
    };

    let content = html!(
        (nav_bar)

        main class=(PAGE_CONTAINER_STYLE)
        {
            (period_header(&data.period))
            (period_picker(&data.period))
            (summary_cards(&data.summary.rounded()))

            @if let Some(chart) = &chart {
                section class=(CARD_STYLE) { (chart_view(chart)) }
            }

            div class="breakdowns"
            {
                (breakdown_table("Expenses by category", &data.expenses))
                (breakdown_table("Income by category", &data.income))
            }

            (history_table(&data.history))
        }
    );

    base("Stats", &head_elements, &content)
}

fn period_header(period: &Period) -> Markup {
    html!(
        header class="period-header"
        {
            @if let Some(previous) = period.previous() {
                a href=(period_url(&previous)) class=(LINK_STYLE) rel="prev" { "← Previous" }
            }

            h1 { (period.label()) }

            @if let Some(next) = period.next() {
                a href=(period_url(&next)) class=(LINK_STYLE) rel="next" { "Next →" }
            }
        }
    )
}

fn period_picker(period: &Period) -> Markup {
    let is_week = matches!(period, Period::Week { .. });
    let week_mode_url = format!("{}?mode=week", endpoints::STATS_VIEW);

    html!(
        div class="period-picker"
        {
            nav class="period-modes"
            {
                a
                    href=(endpoints::STATS_VIEW)
                    class=(if is_week { "nav-link" } else { "nav-link nav-link-current" })
                { "Month" }

                a
                    href=(week_mode_url)
                    class=(if is_week { "nav-link nav-link-current" } else { "nav-link" })
                { "Week" }
            }

            form method="get" action=(endpoints::STATS_VIEW) class="form-inline"
            {
                @if is_week {
                    input type="hidden" name="mode" value="week";
                    label for="week" class=(FORM_LABEL_STYLE) { "Week" }
                    input
                        type="week"
                        name="week"
                        id="week"
                        class=(FORM_TEXT_INPUT_STYLE)
                        value=(period);
                } @else {
                    label for="month" class=(FORM_LABEL_STYLE) { "Month" }
                    input
                        type="month"
                        name="month"
                        id="month"
                        class=(FORM_TEXT_INPUT_STYLE)
                        value=(period);
                }

                button type="submit" class=(BUTTON_PRIMARY_STYLE) { "Show" }
            }
        }
    )
}

fn summary_cards(summary: &RangeSummary) -> Markup {
    let balance_style = if summary.balance.is_sign_negative() {
        "card-value negative"
    } else {
        "card-value positive"
    };

    html!(
        section class="summary-cards"
        {
            div class=(CARD_STYLE) id="expense-total"
            {
                h2 class="card-title" { "Expenses" }
                p class="card-value" { (format_amount(summary.expense_total)) }
            }

            div class=(CARD_STYLE) id="income-total"
            {
                h2 class="card-title" { "Income" }
                p class="card-value" { (format_amount(summary.income_total)) }
            }

            div class=(CARD_STYLE) id="balance"
            {
                h2 class="card-title" { "Balance" }
                p class=(balance_style) { (format_amount(summary.balance)) }
            }
        }
    )
}

fn breakdown_table(title: &str, totals: &[CategoryTotal]) -> Markup {
    html!(
        section class=(CARD_STYLE)
        {
            h2 { (title) }

            @if totals.is_empty() {
                p class="empty-state" { "Nothing recorded for this period." }
            } @else {
                table class=(TABLE_STYLE)
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Category" }
                            th scope="col" class=(TABLE_CELL_NUMBER_STYLE) { "Total" }
                        }
                    }

                    tbody
                    {
                        @for total in totals {
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE) { (total.category) }
                                td class=(TABLE_CELL_NUMBER_STYLE) { (format_amount(total.total)) }
                            }
                        }
                    }
                }
            }
        }
    )
}

fn history_table(history: &[MonthTotals]) -> Markup {
    html!(
        section class=(CARD_STYLE) id="history"
        {
            h2 { "Monthly history" }

            @if history.is_empty() {
                p class="empty-state"
                {
                    "No records yet. "
                    (link(endpoints::ROOT, "Add your first record"))
                    "."
                }
            } @else {
                table class=(TABLE_STYLE)
                {
                    thead class=(TABLE_HEADER_STYLE)
                    {
                        tr
                        {
                            th scope="col" class=(TABLE_CELL_STYLE) { "Month" }
                            th scope="col" class=(TABLE_CELL_NUMBER_STYLE) { "Expenses" }
                            th scope="col" class=(TABLE_CELL_NUMBER_STYLE) { "Income" }
                            th scope="col" class=(TABLE_CELL_NUMBER_STYLE) { "Balance" }
                        }
                    }

                    tbody
                    {
                        @for month in history {
                            @let summary = month.summary.rounded();
                            tr class=(TABLE_ROW_STYLE)
                            {
                                td class=(TABLE_CELL_STYLE)
                                {
                                    (link(&period_url(&month.month), &month.month.label()))
                                }
                                td class=(TABLE_CELL_NUMBER_STYLE) { (format_amount(summary.expense_total)) }
                                td class=(TABLE_CELL_NUMBER_STYLE) { (format_amount(summary.income_total)) }
                                td class=(TABLE_CELL_NUMBER_STYLE) { (format_amount(summary.balance)) }
                            }
                        }
                    }
                }
            }
        }
    )
}

#[cfg(test)]
mod stats_page_tests {
    use std::sync::{Arc, Mutex};

    use axum::{
        Extension,
        extract::{Query, State},
        http::StatusCode,
        response::IntoResponse,
    };
    use scraper::{Html, Selector};
    use time::Month;

    use crate::{
        Error,
        record::{NewRecord, create_record},
        summary::period::Period,
        test_utils::{
            assert_valid_html, contains, create_test_user, get_test_connection,
            parse_html_document, text_of, texts_of,
        },
        user::UserID,
    };

    use super::{StatsQuery, StatsState, get_stats_page, period_url};

    fn get_test_state() -> (StatsState, UserID) {
        let connection = get_test_connection();
        let user_id = create_test_user("alice", &connection);

        let state = StatsState {
            db_connection: Arc::new(Mutex::new(connection)),
            local_timezone: "Etc/UTC".to_owned(),
        };

        (state, user_id)
    }

    fn add(
        state: &StatsState,
        owner: UserID,
        record_type: &str,
        amount: &str,
        category: &str,
        date: &str,
    ) {
        let record =
            NewRecord::parse(Some(owner), record_type, amount, category, date, "").unwrap();
        create_record(record, &state.db_connection.lock().unwrap()).unwrap();
    }

    fn query(mode: &str, month: &str, week: &str) -> StatsQuery {
        let to_option = |value: &str| Some(value.to_owned());

        StatsQuery {
            mode: to_option(mode),
            month: to_option(month),
            week: to_option(week),
        }
    }

    async fn get_document(state: StatsState, user_id: UserID, query: StatsQuery) -> Html {
        let response = get_stats_page(State(state), Extension(user_id), Query(query))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        document
    }

    #[tokio::test]
    async fn shows_month_totals_and_breakdowns() {
        let (state, user_id) = get_test_state();
        add(&state, user_id, "expense", "12.345", "food", "2024-02-03");
        add(&state, user_id, "expense", "100", "rent", "2024-02-10");
        add(&state, user_id, "expense", "7", "", "2024-02-29");
        add(&state, user_id, "income", "500", "pay", "2024-02-15");
        add(&state, user_id, "expense", "999", "rent", "2024-03-01");

        let document = get_document(state, user_id, query("", "2024-02", "")).await;

        assert_eq!(text_of(&document, "h1"), "February 2024");
        assert_eq!(text_of(&document, "#expense-total .card-value"), "119.35");
        assert_eq!(text_of(&document, "#income-total .card-value"), "500.00");
        assert_eq!(text_of(&document, "#balance .card-value"), "380.66");
        let categories = texts_of(&document, ".breakdowns section:first-child tbody td:first-child");
        assert_eq!(categories, vec!["rent", "food", "Uncategorized"]);
        assert!(contains(&document, "#expense-chart"), "want expense chart container");
    }

    #[tokio::test]
    async fn shows_iso_week() {
        let (state, user_id) = get_test_state();
        add(&state, user_id, "expense", "5", "bus", "2023-12-31");
        add(&state, user_id, "expense", "10", "bus", "2024-01-01");
        add(&state, user_id, "expense", "20", "bus", "2024-01-07");
        add(&state, user_id, "expense", "40", "bus", "2024-01-08");

        let document = get_document(state, user_id, query("week", "", "2024-W01")).await;

        assert_eq!(text_of(&document, "h1"), "Week 1, 2024");
        assert_eq!(text_of(&document, "#expense-total .card-value"), "30.00");
        assert_eq!(text_of(&document, "a[rel=prev]"), "← Previous");
        let previous = document
            .select(&Selector::parse("a[rel=prev]").unwrap())
            .next()
            .unwrap();
        assert_eq!(
            previous.value().attr("href"),
            Some("/stats?mode=week&week=2023-W52")
        );
    }

    #[tokio::test]
    async fn first_month_of_year_one_has_no_previous_link() {
        let (state, user_id) = get_test_state();

        let document = get_document(state, user_id, query("", "0001-01", "")).await;

        assert!(!contains(&document, "a[rel=prev]"), "want no previous link");
        let next = document
            .select(&Selector::parse("a[rel=next]").unwrap())
            .next()
            .unwrap();
        assert_eq!(next.value().attr("href"), Some("/stats?month=0001-02"));
    }

    #[tokio::test]
    async fn empty_period_shows_zero_totals_without_chart() {
        let (state, user_id) = get_test_state();

        let document = get_document(state, user_id, query("", "2024-02", "")).await;

        assert_eq!(text_of(&document, "#balance .card-value"), "0.00");
        assert!(
            !contains(&document, "#expense-chart"),
            "want no chart without expenses"
        );
    }

    #[tokio::test]
    async fn history_lists_months_most_recent_first() {
        let (state, user_id) = get_test_state();
        add(&state, user_id, "expense", "5", "", "2023-12-31");
        add(&state, user_id, "income", "10", "", "2024-02-01");

        let document = get_document(state, user_id, query("", "2024-02", "")).await;

        let months = texts_of(&document, "#history tbody td:first-child");
        assert_eq!(months, vec!["February 2024", "December 2023"]);
    }

    #[tokio::test]
    async fn ignores_other_users_records() {
        let (state, user_id) = get_test_state();
        let bob = create_test_user("bob", &state.db_connection.lock().unwrap());
        add(&state, bob, "expense", "50", "food", "2024-02-03");

        let document = get_document(state, user_id, query("", "2024-02", "")).await;

        assert_eq!(text_of(&document, "#expense-total .card-value"), "0.00");
    }

    #[tokio::test]
    async fn malformed_month_is_bad_request() {
        let (state, user_id) = get_test_state();

        let result =
            get_stats_page(State(state), Extension(user_id), Query(query("", "2024-13", ""))).await;

        let error = result.unwrap_err();
        assert_eq!(error, Error::InvalidPeriod("2024-13".to_owned()));
        assert_eq!(error.into_response().status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn malformed_week_is_bad_request() {
        let (state, user_id) = get_test_state();

        let result = get_stats_page(
            State(state),
            Extension(user_id),
            Query(query("week", "", "2021-W53")),
        )
        .await;

        assert_eq!(
            result.unwrap_err(),
            Error::InvalidPeriod("2021-W53".to_owned())
        );
    }

    #[tokio::test]
    async fn no_parameters_shows_current_month() {
        let (state, user_id) = get_test_state();
        let today = time::OffsetDateTime::now_utc().date();

        let document = get_document(state, user_id, StatsQuery::default()).await;

        assert_eq!(text_of(&document, "h1"), Period::month_of(today).label());
    }

    #[test]
    fn period_urls() {
        assert_eq!(
            period_url(&Period::Month {
                year: 2024,
                month: Month::February
            }),
            "/stats?month=2024-02"
        );
        assert_eq!(
            period_url(&Period::Week {
                year: 2024,
                week: 7
            }),
            "/stats?mode=week&week=2024-W07"
        );
    }
}
