//! The endpoint for registering a new user account.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use rusqlite::Connection;
use serde::Deserialize;

use crate::{
    AppState, Error,
    auth::{PasswordHash, create_user},
    profile::create_profile,
};

/// The state needed to register a user.
#[derive(Clone)]
pub struct RegisterState {
    /// The database connection for creating users and their profiles.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegisterState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            db_connection: state.db_connection.clone(),
        }
    }
}

/// The sign-up data sent by the client.
#[derive(Debug, Deserialize)]
pub struct RegisterData {
    /// The email to register with. Must not belong to an existing user.
    pub email: String,
    /// The plain-text password; checked for strength before hashing.
    pub password: String,
    /// An optional display name.
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Handler for sign-up requests.
///
/// Creates the user and an empty profile row (base currency left at the
/// default until the user picks one). The new user is returned but no
/// session is created; the client signs in afterwards.
///
/// # Panics
/// Panics if the lock for the database connection is already held by the
/// same thread.
pub async fn register_user(
    State(state): State<RegisterState>,
    Json(data): Json<RegisterData>,
) -> Response {
    let password_hash =
        match PasswordHash::from_raw_password(&data.password, PasswordHash::DEFAULT_COST) {
            Ok(hash) => hash,
            Err(error) => return error.into_response(),
        };

    let connection = state
        .db_connection
        .lock()
        .expect("Could not acquire database lock");

    let user = match create_user(
        &data.email,
        data.display_name.as_deref(),
        password_hash,
        &connection,
    ) {
        Ok(user) => user,
        Err(error) => return error.into_response(),
    };

    if let Err(error) = create_profile(user.id, &connection) {
        return error.into_response();
    }

    (StatusCode::CREATED, Json(user)).into_response()
}
