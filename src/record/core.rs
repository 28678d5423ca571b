//! Defines the core data models and database queries for records.

use std::{fmt::Display, str::FromStr};

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlError, FromSqlResult, ToSqlOutput, ValueRef},
};
use rust_decimal::Decimal;
use time::{Date, OffsetDateTime, macros::format_description};
use unicode_segmentation::UnicodeSegmentation;

use crate::{Error, ValidationError, database_id::RecordId, user::UserID};

/// The number of records shown when no limit is given.
pub const DEFAULT_LIST_LIMIT: u32 = 200;

/// Categories longer than this many characters are truncated.
pub const CATEGORY_MAX_LENGTH: usize = 50;
/// Notes longer than this many characters are truncated.
pub const NOTE_MAX_LENGTH: usize = 200;

// ============================================================================
// MODELS
// ============================================================================

/// Whether a record is money spent or money earned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    /// Money spent.
    Expense,
    /// Money earned.
    Income,
}

impl RecordType {
    /// The name used for the type in forms and in the database.
    pub fn as_str(self) -> &'static str {
        match self {
            RecordType::Expense => "expense",
            RecordType::Income => "income",
        }
    }

    /// The name shown to users.
    pub fn label(self) -> &'static str {
        match self {
            RecordType::Expense => "Expense",
            RecordType::Income => "Income",
        }
    }
}

impl FromStr for RecordType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "expense" => Ok(RecordType::Expense),
            "income" => Ok(RecordType::Income),
            _ => Err(ValidationError::RecordType(s.to_owned())),
        }
    }
}

impl Display for RecordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ToSql for RecordType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for RecordType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// A non-negative amount of money.
///
/// Amounts are kept as exact decimals so that sums do not pick up
/// floating point error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(Decimal);

impl Amount {
    /// An amount of zero.
    pub const ZERO: Amount = Amount(Decimal::ZERO);

    /// The largest amount a single record may hold, 9,999,999,999.99.
    pub const MAX: Amount = Amount(Decimal::from_parts(3_567_587_327, 232, 0, false, 2));

    /// Create an amount from a decimal.
    ///
    /// # Errors
    /// Returns [ValidationError::Amount] if `value` is negative or greater
    /// than [Amount::MAX].
    pub fn new(value: Decimal) -> Result<Self, ValidationError> {
        if value.is_zero() {
            Ok(Self::ZERO)
        } else if value.is_sign_negative() || value > Self::MAX.0 {
            Err(ValidationError::Amount(value.to_string()))
        } else {
            Ok(Self(value))
        }
    }

    /// The amount as a decimal.
    pub fn value(self) -> Decimal {
        self.0
    }
}

impl FromStr for Amount {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value =
            Decimal::from_str(s.trim()).map_err(|_| ValidationError::Amount(s.to_owned()))?;

        Amount::new(value).map_err(|_| ValidationError::Amount(s.to_owned()))
    }
}

impl Display for Amount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl ToSql for Amount {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.to_string()))
    }
}

impl FromSql for Amount {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let decimal = Decimal::from_str(value.as_str()?)
            .map_err(|error| FromSqlError::Other(Box::new(error)))?;

        Amount::new(decimal).map_err(|error| FromSqlError::Other(Box::new(error)))
    }
}

/// A single income or expense.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    /// The ID of the record.
    pub id: RecordId,
    /// The user the record belongs to. Records without an owner are visible
    /// to everyone.
    pub owner: Option<UserID>,
    /// Whether money was spent or earned.
    pub record_type: RecordType,
    /// How much money was spent or earned.
    pub amount: Amount,
    /// A free text label for grouping records, may be empty.
    pub category: String,
    /// When the money was spent or earned.
    pub date: Date,
    /// An optional description.
    pub note: Option<String>,
    /// When the record was saved.
    pub created_at: OffsetDateTime,
}

/// A validated record that has not been saved yet.
///
/// Use [NewRecord::parse] to build one from form input.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// The user the record belongs to.
    pub owner: Option<UserID>,
    /// Whether money was spent or earned.
    pub record_type: RecordType,
    /// How much money was spent or earned.
    pub amount: Amount,
    /// A trimmed label of at most [CATEGORY_MAX_LENGTH] characters.
    pub category: String,
    /// When the money was spent or earned.
    pub date: Date,
    /// A trimmed note of at most [NOTE_MAX_LENGTH] characters.
    pub note: Option<String>,
}

impl NewRecord {
    /// Validate raw text input and build a record ready to be saved.
    ///
    /// The type is matched ignoring case, and the date may use either '-' or
    /// '/' between the year, month and day. Long categories and notes are
    /// cut short and a blank note becomes `None`.
    ///
    /// # Errors
    /// Returns an [Error::Validation] for the first field that is invalid.
    pub fn parse(
        owner: Option<UserID>,
        record_type: &str,
        amount: &str,
        category: &str,
        date: &str,
        note: &str,
    ) -> Result<Self, Error> {
        let record_type: RecordType = record_type.parse()?;
        let amount: Amount = amount.parse()?;
        let date = parse_date(date)?;

        let note = truncate(note.trim(), NOTE_MAX_LENGTH);
        let note = if note.is_empty() { None } else { Some(note) };

        Ok(Self {
            owner,
            record_type,
            amount,
            category: truncate(category.trim(), CATEGORY_MAX_LENGTH),
            date,
            note,
        })
    }
}

/// Parse a calendar date written as YYYY-MM-DD or YYYY/MM/DD.
///
/// # Errors
/// Returns [ValidationError::Date] if the text is not a real date in either format.
pub fn parse_date(raw_date: &str) -> Result<Date, ValidationError> {
    let normalized = raw_date.trim().replace('/', "-");

    Date::parse(&normalized, format_description!("[year]-[month]-[day]"))
        .map_err(|_| ValidationError::Date(raw_date.to_owned()))
}

fn truncate(text: &str, max_graphemes: usize) -> String {
    text.graphemes(true).take(max_graphemes).collect()
}

// ============================================================================
// DATABASE FUNCTIONS
// ============================================================================

/// Save a new record in the database.
///
/// # Errors
/// This function will return a:
/// - [Error::UnknownOwner] if the owner does not refer to an existing user,
/// - or [Error::SqlError] if there is some other SQL error.
pub fn create_record(new_record: NewRecord, connection: &Connection) -> Result<Record, Error> {
    let owner = new_record.owner;

    connection
        .prepare(
            "INSERT INTO record (user_id, type, amount, category, date, note, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             RETURNING id, user_id, type, amount, category, date, note, created_at",
        )?
        .query_row(
            (
                owner.map(|owner| owner.as_i64()),
                new_record.record_type,
                new_record.amount,
                &new_record.category,
                new_record.date,
                &new_record.note,
                OffsetDateTime::now_utc(),
            ),
            map_record_row,
        )
        .map_err(|error| match (error, owner) {
            (
                rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error {
                        code: _,
                        extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_FOREIGNKEY,
                    },
                    _,
                ),
                Some(owner),
            ) => Error::UnknownOwner(owner),
            (error, _) => error.into(),
        })
}

/// Get the record with the ID `id`.
///
/// # Errors
/// Returns [Error::NotFound] if there is no such record, or [Error::SqlError]
/// if there was some other SQL error.
pub fn get_record(id: RecordId, connection: &Connection) -> Result<Record, Error> {
    connection
        .prepare(
            "SELECT id, user_id, type, amount, category, date, note, created_at
             FROM record WHERE id = :id",
        )?
        .query_row(&[(":id", &id)], map_record_row)
        .map_err(|error| error.into())
}

/// Get at most `limit` of the most recent records, newest date first.
///
/// Records on the same date are ordered by ID, most recently saved first.
/// When `owner` is `None` the records of every user are included.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn list_records(
    owner: Option<UserID>,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Record>, Error> {
    connection
        .prepare(
            "SELECT id, user_id, type, amount, category, date, note, created_at
             FROM record
             WHERE ?1 IS NULL OR user_id = ?1
             ORDER BY date DESC, id DESC
             LIMIT ?2",
        )?
        .query_map(
            (owner.map(|owner| owner.as_i64()), limit),
            map_record_row,
        )?
        .map(|maybe_record| maybe_record.map_err(Error::from))
        .collect()
}

/// Delete the record with the ID `id`, returning whether a record was removed.
///
/// When `owner` is given, only a record belonging to that user is removed.
/// Deleting a record that does not exist is not an error.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn delete_record(
    owner: Option<UserID>,
    id: RecordId,
    connection: &Connection,
) -> Result<bool, Error> {
    let rows_affected = connection.execute(
        "DELETE FROM record WHERE id = ?1 AND (?2 IS NULL OR user_id = ?2)",
        (id, owner.map(|owner| owner.as_i64())),
    )?;

    Ok(rows_affected > 0)
}

/// Count the records visible to `owner`, or all records if `owner` is `None`.
///
/// # Errors
/// Returns [Error::SqlError] if there is an SQL error.
pub fn count_records(owner: Option<UserID>, connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row(
            "SELECT COUNT(id) FROM record WHERE ?1 IS NULL OR user_id = ?1",
            [owner.map(|owner| owner.as_i64())],
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}

/// Create the record table.
///
/// # Errors
/// Returns an error if the table or its index could not be created.
pub fn create_record_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS record (
                id INTEGER PRIMARY KEY,
                user_id INTEGER REFERENCES user(id) ON DELETE CASCADE,
                type TEXT NOT NULL CHECK (type IN ('expense', 'income')),
                amount TEXT NOT NULL CHECK (CAST(amount AS REAL) >= 0),
                category TEXT NOT NULL DEFAULT '',
                date TEXT NOT NULL,
                note TEXT,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    connection.execute(
        "CREATE INDEX IF NOT EXISTS idx_record_user_date ON record(user_id, date)",
        (),
    )?;

    Ok(())
}

/// Map a database row to a [Record].
///
/// Expects the columns id, user_id, type, amount, category, date, note and
/// created_at, in that order.
pub fn map_record_row(row: &Row) -> Result<Record, rusqlite::Error> {
    let owner: Option<i64> = row.get(1)?;

    Ok(Record {
        id: row.get(0)?,
        owner: owner.map(UserID::new),
        record_type: row.get(2)?,
        amount: row.get(3)?,
        category: row.get(4)?,
        date: row.get(5)?,
        note: row.get(6)?,
        created_at: row.get(7)?,
    })
}
