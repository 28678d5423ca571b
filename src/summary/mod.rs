//! Summaries of records over calendar months and ISO weeks.

mod aggregation;
mod charts;
mod period;
mod stats_page;

pub use aggregation::{
    CategoryTotal, MonthTotals, RangeSummary, UNCATEGORIZED_LABEL, category_breakdown,
    monthly_history, range_summary,
};
pub use period::{DateRange, Period, month_range, week_range};
pub use stats_page::get_stats_page;
