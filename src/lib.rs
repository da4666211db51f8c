//! Cashflow is a personal finance tracker served as an HTTP JSON API.
//!
//! Users register and log in with a cookie session, record income and
//! expense transactions in any ISO 4217 currency, and read aggregated
//! cashflow summaries. Amounts are converted into the user's base currency
//! at write time using an external rate provider chain.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use axum_server::Handle;
use serde_json::json;
use tokio::signal;

mod app_state;
mod auth;
mod changes;
mod currency;
mod db;
mod endpoints;
mod fx;
mod profile;
mod routing;
mod transaction;

pub use app_state::AppState;
pub use auth::{PasswordHash, User, UserID, ValidatedPassword};
pub use changes::{ChangeFeed, ChangeKind, ChangeSubscription, TransactionChange};
pub use currency::{CurrencyCode, DEFAULT_BASE_CURRENCY};
pub use db::initialize as initialize_db;
pub use fx::{RateProvider, RateResolver, default_provider_chain};
pub use routing::build_router;

/// An async task that waits for either the ctrl+c or terminate signal,
/// whichever comes first, and then signals the server to shut down
/// gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::debug!("Received ctrl+c signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::debug!("Received terminate signal.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The user provided an email/password pair that does not match a
    /// registered user.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// Either the user ID or expiry cookie is missing from the cookie jar in
    /// the request.
    #[error("no auth cookies in the request")]
    CookieMissing,

    /// There was an error formatting or parsing the expiry cookie date-time.
    #[error("could not handle expiry cookie date-time: {0}")]
    CookieDateError(String),

    /// The user provided a password that is too easy to guess.
    #[error("password is too weak: {0}")]
    TooWeak(String),

    /// An unexpected error occurred in the underlying hashing library.
    ///
    /// The error string should only be logged on the server, never sent to
    /// the client.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The email used at registration already belongs to a user.
    #[error("the email address is already registered")]
    EmailTaken,

    /// A string that is not a valid ISO 4217 alpha-3 code was used where a
    /// currency code was expected.
    #[error("\"{0}\" is not a valid ISO 4217 currency code")]
    InvalidCurrency(String),

    /// A transaction was submitted with a negative original amount.
    #[error("transaction amounts must be non-negative, got {0}")]
    NegativeAmount(f64),

    /// A date string could not be parsed as a calendar date.
    #[error("could not parse date: {0}")]
    InvalidDate(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// Tried to update a transaction that does not exist or belongs to
    /// another user.
    #[error("tried to update a transaction that is not in the database")]
    UpdateMissingTransaction,

    /// Tried to delete a transaction that does not exist or belongs to
    /// another user.
    #[error("tried to delete a transaction that is not in the database")]
    DeleteMissingTransaction,

    /// The multipart form could not be parsed.
    #[error("could not parse multipart form: {0}")]
    MultipartError(String),

    /// The uploaded file is not one of the accepted image types.
    #[error("avatar images must be PNG, JPEG or WebP")]
    NotAnImage,

    /// An error occurred while writing an uploaded file to disk.
    #[error("could not store the uploaded file: {0}")]
    FileStorageError(String),

    /// Could not acquire the database lock.
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("user.email") =>
            {
                Error::EmailTaken
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl Error {
    /// The HTTP status code this error maps to.
    fn status_code(&self) -> StatusCode {
        match self {
            Error::InvalidCredentials | Error::CookieMissing => StatusCode::UNAUTHORIZED,
            Error::TooWeak(_)
            | Error::InvalidCurrency(_)
            | Error::NegativeAmount(_)
            | Error::InvalidDate(_)
            | Error::MultipartError(_) => StatusCode::BAD_REQUEST,
            Error::EmailTaken => StatusCode::CONFLICT,
            Error::NotAnImage => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Error::NotFound
            | Error::UpdateMissingTransaction
            | Error::DeleteMissingTransaction => StatusCode::NOT_FOUND,
            Error::CookieDateError(_)
            | Error::HashingError(_)
            | Error::FileStorageError(_)
            | Error::DatabaseLockError
            | Error::SqlError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // The hashing error string may describe the hashing setup, so it is
        // logged and replaced with a generic message.
        let message = match &self {
            Error::HashingError(detail) => {
                tracing::error!("hashing error: {detail}");
                "an internal error occurred".to_owned()
            }
            error => {
                if status == StatusCode::INTERNAL_SERVER_ERROR {
                    tracing::error!("an unexpected error occurred: {error}");
                }
                error.to_string()
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod error_tests {
    use axum::{http::StatusCode, response::IntoResponse};

    use crate::Error;

    #[test]
    fn maps_unique_email_constraint_to_email_taken() {
        let sql_error = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ffi::ErrorCode::ConstraintViolation,
                extended_code: 2067,
            },
            Some("UNIQUE constraint failed: user.email".to_owned()),
        );

        assert_eq!(Error::from(sql_error), Error::EmailTaken);
    }

    #[test]
    fn maps_no_rows_to_not_found() {
        assert_eq!(
            Error::from(rusqlite::Error::QueryReturnedNoRows),
            Error::NotFound
        );
    }

    #[test]
    fn missing_transaction_errors_are_not_found() {
        for error in [
            Error::UpdateMissingTransaction,
            Error::DeleteMissingTransaction,
        ] {
            let response = error.into_response();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
        }
    }

    #[test]
    fn credential_errors_are_unauthorized() {
        let response = Error::InvalidCredentials.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
