//! Database initialization.

use rusqlite::Connection;

use crate::{auth::create_user_table, profile::create_profile_table, transaction::create_transaction_table};

/// Create the application tables if they do not exist yet.
///
/// Safe to call on every start-up.
///
/// # Errors
/// Returns an error if any of the tables cannot be created.
pub fn initialize(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.pragma_update(None, "foreign_keys", "ON")?;

    create_user_table(connection)?;
    create_profile_table(connection)?;
    create_transaction_table(connection)?;

    Ok(())
}
