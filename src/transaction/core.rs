//! The transaction data model and its persistence functions.

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Error, auth::UserID, currency::CurrencyCode};

/// The spending categories a transaction can be filed under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    /// Groceries and eating out.
    Food,
    /// Public transport, fuel and ride hailing.
    Transport,
    /// Non-essential purchases.
    Shopping,
    /// Rent, utilities and subscriptions.
    Bills,
    /// Wages and other regular income.
    Salary,
    /// Anything that does not fit the other categories.
    Other,
}

impl Category {
    fn as_str(self) -> &'static str {
        match self {
            Category::Food => "Food",
            Category::Transport => "Transport",
            Category::Shopping => "Shopping",
            Category::Bills => "Bills",
            Category::Salary => "Salary",
            Category::Other => "Other",
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "Food" => Some(Category::Food),
            "Transport" => Some(Category::Transport),
            "Shopping" => Some(Category::Shopping),
            "Bills" => Some(Category::Bills),
            "Salary" => Some(Category::Salary),
            "Other" => Some(Category::Other),
            _ => None,
        }
    }
}

/// Whether a transaction adds to or subtracts from the user's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming in.
    Income,
    /// Money going out.
    Expense,
}

impl TransactionKind {
    fn as_str(self) -> &'static str {
        match self {
            TransactionKind::Income => "income",
            TransactionKind::Expense => "expense",
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "income" => Some(TransactionKind::Income),
            "expense" => Some(TransactionKind::Expense),
            _ => None,
        }
    }
}

/// A single income or expense entry.
///
/// Amounts are stored twice: `amount_original` in the currency the money
/// actually moved in, and `amount_base` converted into the user's base
/// currency with `fx_rate`. `amount` mirrors `amount_base` for older
/// clients that predate multi-currency support.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// The transaction's database ID.
    pub id: i64,
    /// The ID of the user the transaction belongs to.
    pub user_id: UserID,
    /// A short label describing the transaction.
    pub title: String,
    /// The spending category, if one was assigned.
    pub category: Option<Category>,
    /// Whether this is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Free-form notes.
    pub notes: Option<String>,
    /// When the money moved.
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    /// The currency the money moved in.
    pub currency_code: CurrencyCode,
    /// The amount in `currency_code`. Never negative.
    pub amount_original: f64,
    /// The conversion rate from `currency_code` into the user's base
    /// currency at the time the transaction was recorded.
    pub fx_rate: f64,
    /// `amount_original` converted into the user's base currency.
    pub amount_base: f64,
    /// Mirrors `amount_base`. Kept for older clients.
    pub amount: f64,
}

/// The values needed to insert or update a transaction row.
///
/// The caller resolves the conversion rate and base amount before building
/// this, so persistence never talks to rate providers.
#[derive(Debug, Clone)]
pub struct TransactionValues {
    /// The owning user.
    pub user_id: UserID,
    /// A short label describing the transaction.
    pub title: String,
    /// The spending category, if one was assigned.
    pub category: Option<Category>,
    /// Whether this is income or an expense.
    pub kind: TransactionKind,
    /// Free-form notes.
    pub notes: Option<String>,
    /// When the money moved.
    pub date: OffsetDateTime,
    /// The currency the money moved in.
    pub currency_code: CurrencyCode,
    /// The amount in `currency_code`.
    pub amount_original: f64,
    /// The resolved conversion rate into the user's base currency.
    pub fx_rate: f64,
    /// `amount_original * fx_rate`.
    pub amount_base: f64,
}

impl TransactionValues {
    fn validate(&self) -> Result<(), Error> {
        if self.amount_original < 0.0 {
            return Err(Error::NegativeAmount(self.amount_original));
        }

        Ok(())
    }
}

/// Create the table for storing transactions in the database.
///
/// # Errors
///
/// Returns an error if the table cannot be created, e.g. invalid SQL.
pub fn create_transaction_table(connection: &Connection) -> Result<(), rusqlite::Error> {
    connection.execute(
        "CREATE TABLE IF NOT EXISTS \"transaction\" (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL REFERENCES user(id) ON DELETE CASCADE,
            title TEXT NOT NULL,
            category TEXT,
            kind TEXT NOT NULL,
            notes TEXT,
            date TEXT NOT NULL,
            currency_code TEXT NOT NULL,
            amount_original REAL NOT NULL,
            fx_rate REAL NOT NULL,
            amount_base REAL NOT NULL,
            amount REAL NOT NULL
        )",
        (),
    )?;

    Ok(())
}

const TRANSACTION_COLUMNS: &str =
    "id, user_id, title, category, kind, notes, date, currency_code, \
     amount_original, fx_rate, amount_base, amount";

fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    let category = row
        .get::<usize, Option<String>>(3)?
        .as_deref()
        .and_then(Category::from_str);

    let raw_kind: String = row.get(4)?;
    let kind = TransactionKind::from_str(&raw_kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown transaction kind \"{raw_kind}\"").into(),
        )
    })?;

    let raw_currency: String = row.get(7)?;
    let currency_code = CurrencyCode::new(&raw_currency).map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            7,
            rusqlite::types::Type::Text,
            format!("invalid currency code \"{raw_currency}\"").into(),
        )
    })?;

    Ok(Transaction {
        id: row.get(0)?,
        user_id: UserID::new(row.get(1)?),
        title: row.get(2)?,
        category,
        kind,
        notes: row.get(5)?,
        date: row.get(6)?,
        currency_code,
        amount_original: row.get(8)?,
        fx_rate: row.get(9)?,
        amount_base: row.get(10)?,
        amount: row.get(11)?,
    })
}

/// Insert a new transaction into the database and return the stored row.
///
/// # Errors
///
/// Returns [`Error::NegativeAmount`] if the original amount is negative, or
/// an SQL error if the insert fails.
pub fn create_transaction(
    values: TransactionValues,
    connection: &Connection,
) -> Result<Transaction, Error> {
    values.validate()?;

    let transaction = connection.query_row(
        &format!(
            "INSERT INTO \"transaction\" \
             (user_id, title, category, kind, notes, date, currency_code, \
              amount_original, fx_rate, amount_base, amount) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10) \
             RETURNING {TRANSACTION_COLUMNS}"
        ),
        (
            values.user_id.as_i64(),
            &values.title,
            values.category.map(Category::as_str),
            values.kind.as_str(),
            &values.notes,
            values.date,
            values.currency_code.as_str(),
            values.amount_original,
            values.fx_rate,
            values.amount_base,
        ),
        map_transaction_row,
    )?;

    Ok(transaction)
}

/// Get a single transaction owned by `user_id`.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if there is no such transaction for the user.
pub fn get_transaction(
    transaction_id: i64,
    user_id: UserID,
    connection: &Connection,
) -> Result<Transaction, Error> {
    let transaction = connection.query_row(
        &format!("SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" WHERE id = ?1 AND user_id = ?2"),
        (transaction_id, user_id.as_i64()),
        map_transaction_row,
    )?;

    Ok(transaction)
}

/// Get all of a user's transactions, newest first.
///
/// # Errors
///
/// Returns an error if the query fails or a row cannot be mapped.
pub fn get_transactions_for_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    let mut statement = connection.prepare(&format!(
        "SELECT {TRANSACTION_COLUMNS} FROM \"transaction\" \
         WHERE user_id = ?1 ORDER BY date DESC, id DESC"
    ))?;

    let transactions = statement
        .query_map([user_id.as_i64()], map_transaction_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(transactions)
}

/// Overwrite the transaction `transaction_id` with `values` and return the
/// stored row.
///
/// # Errors
///
/// Returns [`Error::UpdateMissingTransaction`] if the transaction does not
/// exist or belongs to another user, or [`Error::NegativeAmount`] if the
/// original amount is negative.
pub fn update_transaction(
    transaction_id: i64,
    values: TransactionValues,
    connection: &Connection,
) -> Result<Transaction, Error> {
    values.validate()?;

    connection
        .query_row(
            &format!(
                "UPDATE \"transaction\" SET \
                 title = ?1, category = ?2, kind = ?3, notes = ?4, date = ?5, \
                 currency_code = ?6, amount_original = ?7, fx_rate = ?8, \
                 amount_base = ?9, amount = ?9 \
                 WHERE id = ?10 AND user_id = ?11 \
                 RETURNING {TRANSACTION_COLUMNS}"
            ),
            (
                &values.title,
                values.category.map(Category::as_str),
                values.kind.as_str(),
                &values.notes,
                values.date,
                values.currency_code.as_str(),
                values.amount_original,
                values.fx_rate,
                values.amount_base,
                transaction_id,
                values.user_id.as_i64(),
            ),
            map_transaction_row,
        )
        .map_err(|error| match error {
            rusqlite::Error::QueryReturnedNoRows => Error::UpdateMissingTransaction,
            error => error.into(),
        })
}

/// Delete the transaction `transaction_id` owned by `user_id`.
///
/// # Errors
///
/// Returns [`Error::DeleteMissingTransaction`] if the transaction does not
/// exist or belongs to another user.
pub fn delete_transaction(
    transaction_id: i64,
    user_id: UserID,
    connection: &Connection,
) -> Result<(), Error> {
    let rows_affected = connection.execute(
        "DELETE FROM \"transaction\" WHERE id = ?1 AND user_id = ?2",
        (transaction_id, user_id.as_i64()),
    )?;

    if rows_affected == 0 {
        return Err(Error::DeleteMissingTransaction);
    }

    Ok(())
}

#[cfg(test)]
mod transaction_tests {
    use rusqlite::Connection;
    use time::{Duration, OffsetDateTime, macros::datetime};

    use crate::{
        Error,
        auth::{PasswordHash, UserID, create_user, create_user_table},
        currency::CurrencyCode,
    };

    use super::{
        Category, Transaction, TransactionKind, TransactionValues, create_transaction,
        create_transaction_table, delete_transaction, get_transaction, get_transactions_for_user,
        update_transaction,
    };

    fn get_test_db_connection() -> (Connection, UserID) {
        let connection = Connection::open_in_memory().unwrap();
        create_user_table(&connection).unwrap();
        create_transaction_table(&connection).unwrap();

        let user = create_user(
            "test@example.com",
            None,
            PasswordHash::new_unchecked("hash"),
            &connection,
        )
        .unwrap();

        (connection, user.id)
    }

    fn sample_values(user_id: UserID, date: OffsetDateTime) -> TransactionValues {
        TransactionValues {
            user_id,
            title: "Lunch".to_owned(),
            category: Some(Category::Food),
            kind: TransactionKind::Expense,
            notes: Some("team lunch".to_owned()),
            date,
            currency_code: CurrencyCode::new("USD").unwrap(),
            amount_original: 12.5,
            fx_rate: 300.0,
            amount_base: 3750.0,
        }
    }

    #[test]
    fn create_returns_stored_transaction_with_amount_mirroring_base() {
        let (connection, user_id) = get_test_db_connection();
        let date = datetime!(2024-01-15 12:00 UTC);

        let transaction = create_transaction(sample_values(user_id, date), &connection).unwrap();

        assert!(transaction.id > 0);
        assert_eq!(transaction.user_id, user_id);
        assert_eq!(transaction.title, "Lunch");
        assert_eq!(transaction.category, Some(Category::Food));
        assert_eq!(transaction.kind, TransactionKind::Expense);
        assert_eq!(transaction.date, date);
        assert_eq!(transaction.currency_code.as_str(), "USD");
        assert_eq!(transaction.amount_original, 12.5);
        assert_eq!(transaction.fx_rate, 300.0);
        assert_eq!(transaction.amount_base, 3750.0);
        assert_eq!(transaction.amount, transaction.amount_base);
    }

    #[test]
    fn create_rejects_negative_amount() {
        let (connection, user_id) = get_test_db_connection();
        let mut values = sample_values(user_id, OffsetDateTime::now_utc());
        values.amount_original = -1.0;

        let result = create_transaction(values, &connection);

        assert_eq!(result, Err(Error::NegativeAmount(-1.0)));
    }

    #[test]
    fn transactions_are_listed_newest_first() {
        let (connection, user_id) = get_test_db_connection();
        let now = datetime!(2024-03-10 08:00 UTC);

        let mut created: Vec<Transaction> = Vec::new();
        for days_ago in [2, 0, 5] {
            let mut values = sample_values(user_id, now - Duration::days(days_ago));
            values.title = format!("{days_ago} days ago");
            created.push(create_transaction(values, &connection).unwrap());
        }

        let listed = get_transactions_for_user(user_id, &connection).unwrap();

        let titles: Vec<&str> = listed.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["0 days ago", "2 days ago", "5 days ago"]);
    }

    #[test]
    fn listing_excludes_other_users_transactions() {
        let (connection, user_id) = get_test_db_connection();
        let other_user = create_user(
            "other@example.com",
            None,
            PasswordHash::new_unchecked("hash"),
            &connection,
        )
        .unwrap();

        create_transaction(
            sample_values(user_id, OffsetDateTime::now_utc()),
            &connection,
        )
        .unwrap();
        create_transaction(
            sample_values(other_user.id, OffsetDateTime::now_utc()),
            &connection,
        )
        .unwrap();

        let listed = get_transactions_for_user(user_id, &connection).unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].user_id, user_id);
    }

    #[test]
    fn update_overwrites_stored_values() {
        let (connection, user_id) = get_test_db_connection();
        let transaction = create_transaction(
            sample_values(user_id, OffsetDateTime::now_utc()),
            &connection,
        )
        .unwrap();

        let mut values = sample_values(user_id, transaction.date);
        values.title = "Dinner".to_owned();
        values.amount_original = 20.0;
        values.amount_base = 6000.0;

        let updated = update_transaction(transaction.id, values, &connection).unwrap();

        assert_eq!(updated.id, transaction.id);
        assert_eq!(updated.title, "Dinner");
        assert_eq!(updated.amount_base, 6000.0);
        assert_eq!(updated.amount, 6000.0);

        let stored = get_transaction(transaction.id, user_id, &connection).unwrap();
        assert_eq!(stored, updated);
    }

    #[test]
    fn update_missing_transaction_fails() {
        let (connection, user_id) = get_test_db_connection();

        let result = update_transaction(
            999,
            sample_values(user_id, OffsetDateTime::now_utc()),
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
    }

    #[test]
    fn cannot_update_another_users_transaction() {
        let (connection, user_id) = get_test_db_connection();
        let other_user = create_user(
            "other@example.com",
            None,
            PasswordHash::new_unchecked("hash"),
            &connection,
        )
        .unwrap();
        let transaction = create_transaction(
            sample_values(other_user.id, OffsetDateTime::now_utc()),
            &connection,
        )
        .unwrap();

        let result = update_transaction(
            transaction.id,
            sample_values(user_id, OffsetDateTime::now_utc()),
            &connection,
        );

        assert_eq!(result, Err(Error::UpdateMissingTransaction));
    }

    #[test]
    fn delete_removes_transaction() {
        let (connection, user_id) = get_test_db_connection();
        let transaction = create_transaction(
            sample_values(user_id, OffsetDateTime::now_utc()),
            &connection,
        )
        .unwrap();

        delete_transaction(transaction.id, user_id, &connection).unwrap();

        let result = get_transaction(transaction.id, user_id, &connection);
        assert_eq!(result, Err(Error::NotFound));
    }

    #[test]
    fn delete_missing_transaction_fails() {
        let (connection, user_id) = get_test_db_connection();

        let result = delete_transaction(999, user_id, &connection);

        assert_eq!(result, Err(Error::DeleteMissingTransaction));
    }
}
