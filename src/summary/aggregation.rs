//! Totals and per-category breakdowns of records over a date range.
//!
//! The pure functions ([summarize], [breakdown_by_category], [totals_by_month])
//! work on [Entry] slices and the database functions load the entries they
//! need and hand them over. Sums are computed with exact decimals and only
//! rounded for display.

use std::collections::HashMap;

use rusqlite::Connection;
use rust_decimal::{Decimal, RoundingStrategy};
use time::Date;

use crate::{
    Error,
    record::{Amount, RecordType},
    summary::period::{DateRange, Period},
    user::UserID,
};

/// The label used for records without a category.
pub const UNCATEGORIZED_LABEL: &str = "Uncategorized";

/// The parts of a record needed for aggregation.
#[derive(Debug, Clone, PartialEq)]
pub struct Entry {
    /// Whether money was spent or earned.
    pub record_type: RecordType,
    /// How much money was spent or earned.
    pub amount: Amount,
    /// The category as stored, possibly blank.
    pub category: String,
    /// When the money was spent or earned.
    pub date: Date,
}

/// Expense and income totals over a range of dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RangeSummary {
    /// The sum of all expenses.
    pub expense_total: Decimal,
    /// The sum of all income.
    pub income_total: Decimal,
    /// Income minus expenses.
    pub balance: Decimal,
}

impl RangeSummary {
    /// Round each figure to two decimal places for display.
    ///
    /// Midpoints are rounded away from zero. The balance is rounded from the
    /// exact balance, not recomputed from the rounded totals.
    pub fn rounded(&self) -> Self {
        let round = |value: Decimal| {
            value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        };

        Self {
            expense_total: round(self.expense_total),
            income_total: round(self.income_total),
            balance: round(self.balance),
        }
    }
}

/// The total for one category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryTotal {
    /// The category name, or [UNCATEGORIZED_LABEL] for blank categories.
    pub category: String,
    /// The exact sum of the category's amounts.
    pub total: Decimal,
}

/// The totals for one calendar month.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthTotals {
    /// The month, always a [Period::Month].
    pub month: Period,
    /// The expense and income totals over the whole month.
    pub summary: RangeSummary,
}

/// Sum the expenses and income of the entries dated within `range`.
pub fn summarize(entries: &[Entry], range: DateRange) -> RangeSummary {
    let mut expense_total = Decimal::ZERO;
    let mut income_total = Decimal::ZERO;

    for entry in entries.iter().filter(|entry| range.contains(entry.date)) {
        match entry.record_type {
            RecordType::Expense => {
                expense_total = expense_total.saturating_add(entry.amount.value());
            }
            RecordType::Income => {
                income_total = income_total.saturating_add(entry.amount.value());
            }
        }
    }

    RangeSummary {
        expense_total,
        income_total,
        balance: income_total - expense_total,
    }
}

/// Sum the entries of `record_type` dated within `range` by category.
///
/// The result is ordered by total, largest first, and then by category name.
/// Blank categories are grouped under [UNCATEGORIZED_LABEL].
pub fn breakdown_by_category(
    entries: &[Entry],
    range: DateRange,
    record_type: RecordType,
) -> Vec<CategoryTotal> {
    let mut totals: HashMap<&str, Decimal> = HashMap::new();

    for entry in entries
        .iter()
        .filter(|entry| entry.record_type == record_type && range.contains(entry.date))
    {
        let category = match entry.category.trim() {
            "" => UNCATEGORIZED_LABEL,
            category => category,
        };

        let total = totals.entry(category).or_default();
        *total = total.saturating_add(entry.amount.value());
    }

    let mut breakdown: Vec<CategoryTotal> = totals
        .into_iter()
        .map(|(category, total)| CategoryTotal {
            category: category.to_owned(),
            total,
        })
        .collect();

    breakdown.sort_by(|a, b| {
        b.total
            .cmp(&a.total)
            .then_with(|| a.category.cmp(&b.category))
    });

    breakdown
}

/// Group the entries by calendar month, most recent month first.
pub fn totals_by_month(entries: &[Entry]) -> Vec<MonthTotals> {
    let mut months: Vec<Period> = entries
        .iter()
        .map(|entry| Period::month_of(entry.date))
        .collect();
    months.sort_by_key(|month| std::cmp::Reverse(month.range().start));
    months.dedup();

    months
        .into_iter()
        .map(|month| MonthTotals {
            month,
            summary: summarize(entries, month.range()),
        })
        .collect()
}

/// Load the entries visible to `owner`, limited to `range` if given.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn get_entries(
    owner: Option<UserID>,
    range: Option<DateRange>,
    connection: &Connection,
) -> Result<Vec<Entry>, Error> {
    let (start, end) = match range {
        Some(range) => (Some(range.start), Some(range.end)),
        None => (None, None),
    };

    connection
        .prepare(
            "SELECT type, amount, category, date FROM record
             WHERE (?1 IS NULL OR user_id = ?1)
             AND (?2 IS NULL OR date >= ?2)
             AND (?3 IS NULL OR date <= ?3)",
        )?
        .query_map((owner.map(|owner| owner.as_i64()), start, end), |row| {
            Ok(Entry {
                record_type: row.get(0)?,
                amount: row.get(1)?,
                category: row.get(2)?,
                date: row.get(3)?,
            })
        })?
        .map(|maybe_entry| maybe_entry.map_err(Error::from))
        .collect()
}

/// The expense and income totals of the records visible to `owner` in `range`.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn range_summary(
    owner: Option<UserID>,
    range: DateRange,
    connection: &Connection,
) -> Result<RangeSummary, Error> {
    let entries = get_entries(owner, Some(range), connection)?;

    Ok(summarize(&entries, range))
}

/// The per-category totals of the `record_type` records visible to `owner` in `range`.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn category_breakdown(
    owner: Option<UserID>,
    range: DateRange,
    record_type: RecordType,
    connection: &Connection,
) -> Result<Vec<CategoryTotal>, Error> {
    let entries = get_entries(owner, Some(range), connection)?;

    Ok(breakdown_by_category(&entries, range, record_type))
}

/// The totals of every month that has records visible to `owner`, most recent first.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn monthly_history(
    owner: Option<UserID>,
    connection: &Connection,
) -> Result<Vec<MonthTotals>, Error> {
    let entries = get_entries(owner, None, connection)?;

    Ok(totals_by_month(&entries))
}


#[cfg(test)]
mod breakdown_tests {
    use rust_decimal_macros::dec;
    use time::macros::date;

    use crate::{
        record::{Amount, RecordType},
        summary::period::DateRange,
    };

    use super::{CategoryTotal, Entry, UNCATEGORIZED_LABEL, breakdown_by_category};

    fn expense(category: &str, amount: &str) -> Entry {
        Entry {
            record_type: RecordType::Expense,
            amount: amount.parse::<Amount>().unwrap(),
            category: category.to_owned(),
            date: date!(2024 - 01 - 15),
        }
    }

    const JANUARY: DateRange = DateRange {
        start: date!(2024 - 01 - 01),
        end: date!(2024 - 01 - 31),
    };

    #[test]
    fn orders_by_total_then_name() {
        let entries = [
            expense("rent", "500"),
            expense("food", "20"),
            expense("fun", "20"),
            expense("food", "30"),
            expense("bus", "50"),
        ];

        let breakdown = breakdown_by_category(&entries, JANUARY, RecordType::Expense);

        assert_eq!(
            breakdown,
            vec![
                CategoryTotal {
                    category: "rent".to_owned(),
                    total: dec!(500)
                },
                CategoryTotal {
                    category: "bus".to_owned(),
                    total: dec!(50)
                },
                CategoryTotal {
                    category: "food".to_owned(),
                    total: dec!(50)
                },
                CategoryTotal {
                    category: "fun".to_owned(),
                    total: dec!(20)
                },
            ]
        );
    }

    #[test]
    fn blank_categories_are_uncategorized() {
        let entries = [expense("", "1.5"), expense("  ", "2")];

        let breakdown = breakdown_by_category(&entries, JANUARY, RecordType::Expense);

        assert_eq!(
            breakdown,
            vec![CategoryTotal {
                category: UNCATEGORIZED_LABEL.to_owned(),
                total: dec!(3.5)
            }]
        );
    }

    #[test]
    fn only_includes_requested_type() {
        let mut salary = expense("salary", "3000");
        salary.record_type = RecordType::Income;
        let entries = [expense("food", "10"), salary];

        let breakdown = breakdown_by_category(&entries, JANUARY, RecordType::Income);

        assert_eq!(breakdown.len(), 1);
        assert_eq!(breakdown[0].category, "salary");
    }
}
