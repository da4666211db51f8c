//! Route handlers for reading and updating profile settings.

use std::sync::{Arc, Mutex};

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{Error, app_state::AppState, auth::UserID, currency::CurrencyCode};

use super::core::{get_profile, set_base_currency};

/// The state needed by the profile route handlers.
#[derive(Clone)]
pub struct ProfileState {
    /// The database connection.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for ProfileState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// A route handler that returns the user's profile settings.
///
/// # Errors
///
/// Returns an error response if the profile cannot be read.
pub async fn get_profile_endpoint(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    Ok(Json(get_profile(user_id, &connection)?).into_response())
}

/// The request body for updating profile settings.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    // Deserialization rejects anything that is not a three letter code.
    base_currency: CurrencyCode,
}

/// A route handler that sets the user's base currency.
///
/// Existing transactions keep their stored base amounts; the new currency
/// applies to future writes only.
///
/// # Errors
///
/// Returns an error response if the body does not carry a valid ISO 4217
/// code or the update fails.
pub async fn put_profile(
    State(state): State<ProfileState>,
    Extension(user_id): Extension<UserID>,
    Json(form): Json<ProfileForm>,
) -> Result<Response, Error> {
    let connection = state
        .db_connection
        .lock()
        .map_err(|_| Error::DatabaseLockError)?;

    let profile = set_base_currency(user_id, &form.base_currency, &connection)?;

    Ok(Json(profile).into_response())
}
