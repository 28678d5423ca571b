/*! Sets up the application's SQLite database. */

use rusqlite::{Connection, TransactionBehavior, Transaction as SqlTransaction};

use crate::{Error, record::create_record_table, user::create_user_table};

/// Create the tables for all domain models if they do not exist yet.
///
/// Foreign key enforcement is switched on for `connection`, so deleting a
/// user also deletes that user's records.
///
/// # Errors
/// Returns an error if the tables could not be created.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;

    let transaction = SqlTransaction::new_unchecked(connection, TransactionBehavior::Exclusive)?;

    create_user_table(&transaction)?;
    create_record_table(&transaction)?;

    transaction.commit()?;

    Ok(())
}
