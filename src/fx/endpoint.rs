//! The conversion rate lookup route.

use std::sync::{Arc, Mutex};

use axum::{
    extract::{FromRef, Query, State},
    response::{IntoResponse, Json, Response},
    Extension,
};
use rusqlite::Connection;
use serde::Deserialize;
use serde_json::json;
use time::{macros::format_description, Date};

use crate::{
    app_state::AppState, auth::UserID, currency::CurrencyCode, profile::get_base_currency, Error,
};

use super::resolver::RateResolver;

/// The state needed to serve rate lookups.
#[derive(Clone)]
pub struct FxState {
    /// The database connection, used to look up the user's base currency.
    pub db_connection: Arc<Mutex<Connection>>,
    /// The provider chain.
    pub rate_resolver: Arc<RateResolver>,
}

impl FromRef<AppState> for FxState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
            rate_resolver: state.rate_resolver.clone(),
        }
    }
}

/// The query parameters for a rate lookup.
///
/// Omitted currencies default to the user's base currency, and an omitted
/// date means the latest rate.
#[derive(Debug, Deserialize)]
pub struct RateQuery {
    from: Option<CurrencyCode>,
    to: Option<CurrencyCode>,
    date: Option<String>,
}

/// A route handler that reports the conversion rate between two currencies.
///
/// # Errors
///
/// Returns an error response if the date is malformed or the user's profile
/// cannot be read. Provider failures are not errors, the rate falls back to 1.
pub async fn get_rate(
    State(state): State<FxState>,
    Extension(user_id): Extension<UserID>,
    Query(query): Query<RateQuery>,
) -> Result<Response, Error> {
    let as_of = match query.date {
        Some(ref raw) => Some(
            Date::parse(raw, format_description!("[year]-[month]-[day]"))
                .map_err(|error| Error::InvalidDate(error.to_string()))?,
        ),
        None => None,
    };

    let base_currency = {
        let connection = state
            .db_connection
            .lock()
            .map_err(|_| Error::DatabaseLockError)?;

        get_base_currency(user_id, &connection)?
    };

    let from = query.from.unwrap_or_else(|| base_currency.clone());
    let to = query.to.unwrap_or(base_currency);

    let rate = state.rate_resolver.resolve(&from, &to, as_of).await;

    Ok(Json(json!({ "rate": rate })).into_response())
}
