//! User accounts: the model, validated field types and database queries.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, PasswordHash, ValidatedPassword, ValidationError};

/// The name of the account used when demo mode is enabled.
pub const DEMO_USERNAME: &str = "demo";
/// The password of the demo account.
pub const DEMO_PASSWORD: &str = "demo123456";

/// A valid bcrypt hash that no user has, used to make failed log-ins for
/// unknown usernames take as long as failed log-ins for known usernames.
const UNKNOWN_USER_PASSWORD_HASH: &str =
    "$2b$12$Gwf0uvxH3L7JLfo0CC/NCOoijK2vQ/wbgP.LeNup8vj6gg31IiFkm";

const USERNAME_MIN_LENGTH: usize = 3;
const USERNAME_MAX_LENGTH: usize = 50;
const PHONE_MAX_LENGTH: usize = 20;

/// A newtype wrapper for integer user IDs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// The name a user logs in with.
///
/// Usernames are 3 to 50 characters of letters, digits, '_', '-' or '.'.
/// They are compared case-insensitively by the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Username(String);

impl Username {
    /// Trim and validate a username.
    ///
    /// # Errors
    /// Returns [ValidationError::Username] if the username is too short, too
    /// long or contains characters other than letters, digits, '_', '-' or '.'.
    pub fn new(raw_username: &str) -> Result<Self, ValidationError> {
        let username = raw_username.trim();
        let length = username.chars().count();

        let is_valid = (USERNAME_MIN_LENGTH..=USERNAME_MAX_LENGTH).contains(&length)
            && username
                .chars()
                .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'));

        if is_valid {
            Ok(Self(username.to_owned()))
        } else {
            Err(ValidationError::Username(raw_username.to_owned()))
        }
    }

    /// Create a username without validation, e.g. when reading from the database.
    pub fn new_unchecked(username: &str) -> Self {
        Self(username.to_owned())
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Username {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// An optional contact number for a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phone(String);

impl Phone {
    /// Parse a phone number entered in a form.
    ///
    /// Blank input means the user did not give a phone number and yields `None`.
    ///
    /// # Errors
    /// Returns [ValidationError::Phone] if the number is longer than 20
    /// characters, has no digits, or contains characters other than digits,
    /// spaces, '+', '-', '(' or ')'.
    pub fn parse_optional(raw_phone: &str) -> Result<Option<Self>, ValidationError> {
        let phone = raw_phone.trim();

        if phone.is_empty() {
            return Ok(None);
        }

        let is_valid = phone.chars().count() <= PHONE_MAX_LENGTH
            && phone.chars().any(|c| c.is_ascii_digit())
            && phone
                .chars()
                .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '+' | '-' | '(' | ')'));

        if is_valid {
            Ok(Some(Self(phone.to_owned())))
        } else {
            Err(ValidationError::Phone(raw_phone.to_owned()))
        }
    }
}

impl AsRef<str> for Phone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The name the user logs in with.
    pub username: Username,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The user's phone number, if they gave one.
    pub phone: Option<Phone>,
    /// When the user registered.
    pub created_at: OffsetDateTime,
}

/// Create the user table.
///
/// # Errors
///
/// This function will return an error if the SQL query failed.
pub fn create_user_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS user (
                id INTEGER PRIMARY KEY,
                username TEXT NOT NULL UNIQUE COLLATE NOCASE,
                password TEXT NOT NULL,
                phone TEXT,
                created_at TEXT NOT NULL
                )",
        (),
    )?;

    Ok(())
}

/// Create and insert a new user into the database.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateUsername] if another user already has the username,
///   ignoring case,
/// - or [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(
    username: Username,
    password_hash: PasswordHash,
    phone: Option<Phone>,
    connection: &Connection,
) -> Result<User, Error> {
    let created_at = OffsetDateTime::now_utc();

    connection
        .execute(
            "INSERT INTO user (username, password, phone, created_at) VALUES (?1, ?2, ?3, ?4)",
            (
                username.as_ref(),
                password_hash.as_ref(),
                phone.as_ref().map(|phone| phone.as_ref()),
                created_at,
            ),
        )
        .map_err(|error| match error {
            rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error {
                    code: _,
                    extended_code: rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE,
                },
                _,
            ) => Error::DuplicateUsername(username.to_string()),
            error => error.into(),
        })?;

    let id = UserID::new(connection.last_insert_rowid());

    Ok(User {
        id,
        username,
        password_hash,
        phone,
        created_at,
    })
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user,
/// - or there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, username, password, phone, created_at FROM user WHERE id = :id",
        )?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user with the name `username`, ignoring case.
///
/// # Errors
///
/// Returns [Error::NotFound] if no user has that name, or [Error::SqlError]
/// if there was some other SQL error.
pub fn get_user_by_username(username: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(
            "SELECT id, username, password, phone, created_at FROM user \
            WHERE username = :username",
        )?
        .query_row(&[(":username", &username.trim())], map_user_row)
        .map_err(|error| error.into())
}

/// Check the log-in details `username` and `password`, returning the matching user.
///
/// # Errors
///
/// Returns a:
/// - [Error::InvalidCredentials] if there is no such user or the password is wrong,
/// - [Error::HashingError] if the stored hash could not be checked,
/// - or [Error::SqlError] if there was some other SQL error.
pub fn verify_credentials(
    username: &str,
    password: &str,
    connection: &Connection,
) -> Result<User, Error> {
    let user = match get_user_by_username(username, connection) {
        Ok(user) => user,
        Err(Error::NotFound) => {
            // Keep the response time close to that of a wrong password.
            let _ = PasswordHash::new_unchecked(UNKNOWN_USER_PASSWORD_HASH).verify(password);
            return Err(Error::InvalidCredentials);
        }
        Err(error) => return Err(error),
    };

    match user.password_hash.verify(password) {
        Ok(true) => Ok(user),
        Ok(false) => Err(Error::InvalidCredentials),
        Err(error) => Err(Error::HashingError(error.to_string())),
    }
}

/// Replace the password hash of the user with the ID `user_id`.
///
/// # Errors
///
/// Returns [Error::NotFound] if there is no such user, or [Error::SqlError]
/// if there was some other SQL error.
pub fn update_password(
    user_id: UserID,
    password_hash: &PasswordHash,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "UPDATE user SET password = ?1 WHERE id = ?2",
        (password_hash.as_ref(), user_id.as_i64()),
    )?;

    match rows_affected {
        0 => Err(Error::NotFound),
        _ => Ok(()),
    }
}

/// Get the number of users in the database.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn count_users(connection: &Connection) -> Result<usize, Error> {
    connection
        .query_row("SELECT COUNT(id) FROM user;", [], |row| row.get(0))
        .map_err(|error| error.into())
}

/// Get the demo user, creating it with [DEMO_PASSWORD] if it does not exist.
///
/// # Errors
///
/// Returns an error if the password could not be hashed or there was an SQL error.
pub fn get_or_create_demo_user(connection: &Connection) -> Result<User, Error> {
    match get_user_by_username(DEMO_USERNAME, connection) {
        Ok(user) => Ok(user),
        Err(Error::NotFound) => {
            tracing::info!("Creating the demo user \"{DEMO_USERNAME}\".");
            let password_hash = PasswordHash::new(
                ValidatedPassword::new_unchecked(DEMO_PASSWORD),
                PasswordHash::DEFAULT_COST,
            )?;

            create_user(
                Username::new_unchecked(DEMO_USERNAME),
                password_hash,
                None,
                connection,
            )
        }
        Err(error) => Err(error),
    }
}

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let id = UserID::new(row.get(0)?);
    let username: String = row.get(1)?;
    let password_hash: String = row.get(2)?;
    let phone: Option<String> = row.get(3)?;
    let created_at = row.get(4)?;

    Ok(User {
        id,
        username: Username::new_unchecked(&username),
        password_hash: PasswordHash::new_unchecked(&password_hash),
        phone: phone.map(Phone),
        created_at,
    })
}
