//! The profile table and queries over it.

use rusqlite::{Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

use crate::{Error, auth::UserID, currency::CurrencyCode};

/// A user's profile settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    /// The owning user.
    pub user_id: UserID,
    /// The currency all amounts are converted into.
    pub base_currency: CurrencyCode,
    /// The URL path of the user's avatar image, if one was uploaded.
    pub avatar_url: Option<String>,
}

impl Profile {
    fn new(user_id: UserID) -> Self {
        Self {
            user_id,
            base_currency: CurrencyCode::default_base(),
            avatar_url: None,
        }
    }
}

/// Create the table for storing profiles.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn create_profile_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS profile (
                user_id INTEGER PRIMARY KEY REFERENCES user(id) ON DELETE CASCADE,
                base_currency TEXT NOT NULL,
                avatar_url TEXT
                )",
        (),
    )?;

    Ok(())
}

/// Insert a fresh profile row for `user_id` with the default base currency.
///
/// Inserting twice is harmless, the existing row wins.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn create_profile(user_id: UserID, connection: &Connection) -> Result<(), Error> {
    connection.execute(
        "INSERT OR IGNORE INTO profile (user_id, base_currency) VALUES (?1, ?2)",
        (user_id.as_i64(), CurrencyCode::default_base().as_str()),
    )?;

    Ok(())
}

fn map_profile_row(row: &Row) -> Result<(i64, String, Option<String>), rusqlite::Error> {
    Ok((row.get(0)?, row.get(1)?, row.get(2)?))
}

/// Get the profile for `user_id`.
///
/// Users without a stored row get the defaults rather than an error, so
/// accounts that predate profiles keep working.
///
/// # Errors
/// Returns an error if the SQL query failed or the stored currency code is
/// invalid.
pub fn get_profile(user_id: UserID, connection: &Connection) -> Result<Profile, Error> {
    let row = connection
        .prepare("SELECT user_id, base_currency, avatar_url FROM profile WHERE user_id = :id")?
        .query_row(&[(":id", &user_id.as_i64())], map_profile_row)
        .optional()?;

    match row {
        Some((raw_id, raw_currency, avatar_url)) => Ok(Profile {
            user_id: UserID::new(raw_id),
            base_currency: CurrencyCode::new(&raw_currency)?,
            avatar_url,
        }),
        None => Ok(Profile::new(user_id)),
    }
}

/// Get the base currency for `user_id`, defaulting when no profile row
/// exists.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn get_base_currency(user_id: UserID, connection: &Connection) -> Result<CurrencyCode, Error> {
    Ok(get_profile(user_id, connection)?.base_currency)
}

/// Set the base currency for `user_id` and return the updated profile.
///
/// Stored transactions keep the base amounts they were converted with;
/// changing the base currency only affects future writes.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn set_base_currency(
    user_id: UserID,
    base_currency: &CurrencyCode,
    connection: &Connection,
) -> Result<Profile, Error> {
    connection.execute(
        "INSERT INTO profile (user_id, base_currency) VALUES (?1, ?2)
         ON CONFLICT(user_id) DO UPDATE SET base_currency = excluded.base_currency",
        (user_id.as_i64(), base_currency.as_str()),
    )?;

    get_profile(user_id, connection)
}

/// Record the URL path of the user's avatar image.
///
/// # Errors
/// Returns an error if the SQL query failed.
pub fn set_avatar_url(
    user_id: UserID,
    avatar_url: &str,
    connection: &Connection,
) -> Result<Profile, Error> {
    connection.execute(
        "INSERT INTO profile (user_id, base_currency, avatar_url) VALUES (?1, ?2, ?3)
         ON CONFLICT(user_id) DO UPDATE SET avatar_url = excluded.avatar_url",
        (
            user_id.as_i64(),
            CurrencyCode::default_base().as_str(),
            avatar_url,
        ),
    )?;

    get_profile(user_id, connection)
}
