//! Route handlers for creating, listing, editing and deleting transactions.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::json;
use time::OffsetDateTime;

use crate::{
    Error,
    app_state::AppState,
    auth::UserID,
    changes::{ChangeFeed, ChangeKind, TransactionChange},
    currency::CurrencyCode,
    fx::RateResolver,
    profile::get_base_currency,
};

use super::{
    aggregation::{
        TransactionFilter, cashflow_by_month, filter_transactions, group_by_month, summarize,
    },
    core::{
        Category, Transaction, TransactionKind, TransactionValues, create_transaction,
        delete_transaction, get_transactions_for_user, update_transaction,
    },
};

/// The state needed by the transaction route handlers.
#[derive(Clone)]
pub struct TransactionState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The provider chain for resolving conversion rates at write time.
    pub rate_resolver: Arc<RateResolver>,
    /// The feed that notifies long-polling clients of changes.
    pub change_feed: ChangeFeed,
}

impl FromRef<AppState> for TransactionState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            rate_resolver: state.rate_resolver.clone(),
            change_feed: state.change_feed.clone(),
        }
    }
}

impl TransactionState {
    fn list_transactions(&self, user_id: UserID) -> Result<Vec<Transaction>, Error> {
        let connection = self
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        get_transactions_for_user(user_id, &connection)
    }

    fn base_currency(&self, user_id: UserID) -> Result<CurrencyCode, Error> {
        let connection = self
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        get_base_currency(user_id, &connection)
    }
}

/// A route handler that lists the user's transactions, newest first.
///
/// All filter parameters are optional query parameters and combine with AND.
///
/// # Errors
///
/// Returns an error response if the transactions cannot be loaded.
pub async fn get_transactions(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Response, Error> {
    let transactions = filter_transactions(state.list_transactions(user_id)?, &filter);

    Ok(Json(transactions).into_response())
}

/// A route handler that lists the user's transactions bucketed by calendar
/// month, newest month first, alongside the overall totals.
///
/// Takes the same filter parameters as the flat listing; the summary covers
/// the filtered set, not the whole ledger.
///
/// # Errors
///
/// Returns an error response if the transactions cannot be loaded.
pub async fn get_grouped_transactions(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(filter): Query<TransactionFilter>,
) -> Result<Response, Error> {
    let transactions = filter_transactions(state.list_transactions(user_id)?, &filter);

    let response = json!({
        "summary": summarize(&transactions),
        "groups": group_by_month(&transactions),
    });

    Ok(Json(response).into_response())
}

#[derive(Debug, Deserialize)]
pub struct CashflowQuery {
    year: Option<i32>,
}

/// A route handler that reports income and expense totals per calendar
/// month of a year, twelve buckets, for charting.
///
/// Defaults to the current year when no year is given.
///
/// # Errors
///
/// Returns an error response if the transactions cannot be loaded.
pub async fn get_cashflow(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<CashflowQuery>,
) -> Result<Response, Error> {
    let year = query.year.unwrap_or_else(|| OffsetDateTime::now_utc().year());
    let transactions = state.list_transactions(user_id)?;

    Ok(Json(cashflow_by_month(&transactions, year)).into_response())
}

/// The request body for creating or replacing a transaction.
#[derive(Debug, Serialize, Deserialize)]
pub struct TransactionForm {
    /// A short label describing the transaction.
    pub title: String,
    /// The spending category, if one applies.
    #[serde(default)]
    pub category: Option<Category>,
    /// Whether this is income or an expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
    /// When the money moved. Defaults to now.
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub date: Option<OffsetDateTime>,
    /// The currency the money moved in. Defaults to the user's base
    /// currency.
    #[serde(default)]
    pub currency_code: Option<CurrencyCode>,
    /// The amount in `currency_code`. Must be non-negative.
    pub amount: f64,
}

/// Resolve the conversion rate for `form` and turn it into the values to
/// store. Past-dated transactions are converted with the historical rate
/// for their own date, not today's.
async fn resolve_values(
    state: &TransactionState,
    user_id: UserID,
    form: TransactionForm,
) -> Result<TransactionValues, Error> {
    if form.amount < 0.0 {
        return Err(Error::NegativeAmount(form.amount));
    }

    let base_currency = state.base_currency(user_id)?;
    let currency_code = form.currency_code.unwrap_or_else(|| base_currency.clone());
    let date = form.date.unwrap_or_else(OffsetDateTime::now_utc);

    let as_of = if date.date() < OffsetDateTime::now_utc().date() {
        Some(date.date())
    } else {
        None
    };

    let fx_rate = state
        .rate_resolver
        .resolve(&currency_code, &base_currency, as_of)
        .await;

    Ok(TransactionValues {
        user_id,
        title: form.title,
        category: form.category,
        kind: form.kind,
        notes: form.notes,
        date,
        currency_code,
        amount_original: form.amount,
        fx_rate,
        amount_base: form.amount * fx_rate,
    })
}

/// A route handler that records a new transaction.
///
/// The conversion rate and base amount are resolved on the server from the
/// transaction's currency, date and the user's base currency.
///
/// # Errors
///
/// Returns an error response if the amount is negative or the insert fails.
pub async fn create_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<TransactionForm>,
) -> Result<Response, Error> {
    let values = resolve_values(&state, user_id, form).await?;

    let transaction = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        create_transaction(values, &connection)?
    };

    state.change_feed.publish(TransactionChange {
        user_id,
        transaction_id: transaction.id,
        kind: ChangeKind::Created,
    });

    Ok((StatusCode::CREATED, Json(transaction)).into_response())
}

/// A route handler that replaces an existing transaction.
///
/// The conversion rate is re-resolved from the submitted currency and date,
/// so moving a transaction to another day or currency recomputes its base
/// amount.
///
/// # Errors
///
/// Returns an error response if the transaction does not exist, belongs to
/// another user, or the amount is negative.
pub async fn update_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<i64>,
    Json(form): Json<TransactionForm>,
) -> Result<Response, Error> {
    let values = resolve_values(&state, user_id, form).await?;

    let transaction = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        update_transaction(transaction_id, values, &connection)?
    };

    state.change_feed.publish(TransactionChange {
        user_id,
        transaction_id: transaction.id,
        kind: ChangeKind::Updated,
    });

    Ok(Json(transaction).into_response())
}

/// A route handler that deletes a transaction.
///
/// # Errors
///
/// Returns an error response if the transaction does not exist or belongs
/// to another user.
pub async fn delete_transaction_endpoint(
    State(state): State<TransactionState>,
    Extension(user_id): Extension<UserID>,
    Path(transaction_id): Path<i64>,
) -> Result<Response, Error> {
    {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        delete_transaction(transaction_id, user_id, &connection)?;
    }

    state.change_feed.publish(TransactionChange {
        user_id,
        transaction_id,
        kind: ChangeKind::Deleted,
    });

    Ok(StatusCode::NO_CONTENT.into_response())
}
