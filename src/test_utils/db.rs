use rusqlite::Connection;

use crate::{
    PasswordHash,
    db::initialize,
    user::{UserID, Username, create_user},
};

/// An initialized in-memory database.
pub(crate) fn get_test_connection() -> Connection {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");
    initialize(&connection).expect("Could not initialize database");

    connection
}

/// Create a user whose password hash is not a real hash, for tests that do
/// not log in.
pub(crate) fn create_test_user(username: &str, connection: &Connection) -> UserID {
    create_user(
        Username::new(username).expect("Invalid test username"),
        PasswordHash::new_unchecked("not a real hash"),
        None,
        connection,
    )
    .expect("Could not create test user")
    .id
}
