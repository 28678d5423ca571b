//! Calendar months and ISO weeks, and the date ranges they cover.

use std::fmt::Display;

use time::{Date, Month, Weekday};

use crate::Error;

/// The years a period may fall in, the years with four digits.
const YEARS: std::ops::RangeInclusive<i32> = 1..=9999;

/// A closed range of dates, including both `start` and `end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    /// The first day in the range.
    pub start: Date,
    /// The last day in the range.
    pub end: Date,
}

impl DateRange {
    /// Whether `date` falls within the range.
    pub fn contains(&self, date: Date) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A calendar month or an ISO 8601 week.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    /// A calendar month, written as "YYYY-MM".
    Month {
        /// The calendar year.
        year: i32,
        /// The month of the year.
        month: Month,
    },
    /// An ISO week, written as "YYYY-Www".
    Week {
        /// The ISO week-numbering year, which can differ from the calendar
        /// year for days at the start or end of a year.
        year: i32,
        /// The week of the year, from 1 to 53.
        week: u8,
    },
}

impl Period {
    /// Parse a month written as "YYYY-MM", e.g. "2024-02".
    ///
    /// # Errors
    /// Returns [Error::InvalidPeriod] if the text is not a four digit year
    /// from 0001 and a two digit month from 01 to 12 separated by '-'.
    pub fn parse_month(text: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidPeriod(text.to_owned());

        let (year, month) = text.trim().split_once('-').ok_or_else(invalid)?;
        let year = parse_year(year).ok_or_else(invalid)?;
        let month = parse_digits(month, 2).ok_or_else(invalid)?;
        let month = u8::try_from(month)
            .ok()
            .and_then(|month| Month::try_from(month).ok())
            .ok_or_else(invalid)?;

        Ok(Period::Month { year, month })
    }

    /// Parse an ISO week written as "YYYY-Www", e.g. "2024-W07".
    ///
    /// # Errors
    /// Returns [Error::InvalidPeriod] if the text is malformed or the week
    /// does not exist in that year, e.g. week 53 of a year with 52 weeks.
    pub fn parse_week(text: &str) -> Result<Self, Error> {
        let invalid = || Error::InvalidPeriod(text.to_owned());

        let (year, week) = text.trim().split_once('-').ok_or_else(invalid)?;
        let week = week
            .strip_prefix('W')
            .or_else(|| week.strip_prefix('w'))
            .ok_or_else(invalid)?;
        let year = parse_year(year).ok_or_else(invalid)?;
        let week = parse_digits(week, 2).ok_or_else(invalid)?;
        let week = u8::try_from(week).map_err(|_| invalid())?;

        Date::from_iso_week_date(year, week, Weekday::Monday).map_err(|_| invalid())?;

        Ok(Period::Week { year, week })
    }

    /// The month that contains `date`.
    pub fn month_of(date: Date) -> Self {
        Period::Month {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The ISO week that contains `date`.
    pub fn week_of(date: Date) -> Self {
        let (year, week, _) = date.to_iso_week_date();

        Period::Week { year, week }
    }

    /// The first and last day of the period.
    pub fn range(&self) -> DateRange {
        match *self {
            Period::Month { year, month } => {
                // The parsers only accept four digit years and real months,
                // so these dates always exist.
                let start = Date::from_calendar_date(year, month, 1).unwrap_or(Date::MIN);
                let end = Date::from_calendar_date(year, month, last_day_of_month(year, month))
                    .unwrap_or(Date::MAX);

                DateRange { start, end }
            }
            Period::Week { year, week } => {
                let start =
                    Date::from_iso_week_date(year, week, Weekday::Monday).unwrap_or(Date::MIN);
                let end =
                    Date::from_iso_week_date(year, week, Weekday::Sunday).unwrap_or(Date::MAX);

                DateRange { start, end }
            }
        }
    }

    /// The period of the same kind just before this one, or `None` before
    /// the year 0001.
    pub fn previous(&self) -> Option<Self> {
        let day_before = self.range().start.previous_day()?;

        self.same_kind_containing(day_before)
    }

    /// The period of the same kind just after this one, or `None` after the
    /// year 9999.
    pub fn next(&self) -> Option<Self> {
        let day_after = self.range().end.next_day()?;

        self.same_kind_containing(day_after)
    }

    fn year(&self) -> i32 {
        match *self {
            Period::Month { year, .. } | Period::Week { year, .. } => year,
        }
    }

    /// A human readable name, e.g. "February 2024" or "Week 7, 2024".
    pub fn label(&self) -> String {
        match self {
            Period::Month { year, month } => format!("{month} {year}"),
            Period::Week { year, week } => format!("Week {week}, {year}"),
        }
    }

    fn same_kind_containing(&self, date: Date) -> Option<Self> {
        let period = match self {
            Period::Month { .. } => Period::month_of(date),
            Period::Week { .. } => Period::week_of(date),
        };

        YEARS.contains(&period.year()).then_some(period)
    }
}

impl Display for Period {
    /// Formats the period the same way it is parsed, e.g. "2024-02" or "2024-W07".
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Period::Month { year, month } => write!(f, "{year:04}-{:02}", *month as u8),
            Period::Week { year, week } => write!(f, "{year:04}-W{week:02}"),
        }
    }
}

/// The first and last day of the month written as "YYYY-MM".
///
/// # Errors
/// Returns [Error::InvalidPeriod] if `yyyy_mm` is malformed.
pub fn month_range(yyyy_mm: &str) -> Result<DateRange, Error> {
    Ok(Period::parse_month(yyyy_mm)?.range())
}

/// The Monday and Sunday of the ISO week written as "YYYY-Www".
///
/// # Errors
/// Returns [Error::InvalidPeriod] if `yyyy_www` is malformed or names a week
/// that does not exist.
pub fn week_range(yyyy_www: &str) -> Result<DateRange, Error> {
    Ok(Period::parse_week(yyyy_www)?.range())
}

/// Parse a four digit year within [YEARS].
fn parse_year(text: &str) -> Option<i32> {
    parse_digits(text, 4)
        .and_then(|year| i32::try_from(year).ok())
        .filter(|year| YEARS.contains(year))
}

/// Parse exactly `length` ASCII digits.
fn parse_digits(text: &str, length: usize) -> Option<u32> {
    if text.len() != length || !text.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }

    text.parse().ok()
}

fn last_day_of_month(year: i32, month: Month) -> u8 {
    match month {
        Month::January
        | Month::March
        | Month::May
        | Month::July
        | Month::August
        | Month::October
        | Month::December => 31,
        Month::April | Month::June | Month::September | Month::November => 30,
        Month::February => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0)
}
