//! The endpoint handling log-in requests.

use std::sync::{Arc, Mutex};

use axum::{
    Json,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use rusqlite::Connection;
use serde::Deserialize;
use time::Duration;

use crate::{
    AppState, Error,
    auth::{User, cookie::set_auth_cookie, get_user_by_email},
};

/// The state needed to perform a log-in.
#[derive(Clone)]
pub struct LogInState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which cookies used for authentication are valid.
    pub cookie_duration: Duration,
    /// The database connection for looking up users.
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LogInState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LogInState> for Key {
    fn from_ref(state: &LogInState) -> Self {
        state.cookie_key.clone()
    }
}

/// The credentials sent by the client when logging in.
#[derive(Debug, Deserialize)]
pub struct LogInData {
    /// The email the user registered with.
    pub email: String,
    /// The user's plain-text password.
    pub password: String,
}

/// Handler for log-in requests.
///
/// On success the auth cookie pair is set and the user record is returned.
/// A wrong email and a wrong password both produce the same 401 response so
/// the endpoint does not reveal which emails are registered.
///
/// # Panics
/// Panics if the lock for the database connection is already held by the
/// same thread.
pub async fn post_log_in(
    State(state): State<LogInState>,
    jar: PrivateCookieJar,
    Json(credentials): Json<LogInData>,
) -> Response {
    let user: User = match get_user_by_email(
        &credentials.email,
        &state
            .db_connection
            .lock()
            .expect("Could not acquire database lock"),
    ) {
        Ok(user) => user,
        Err(Error::NotFound) => return Error::InvalidCredentials.into_response(),
        Err(error) => return error.into_response(),
    };

    match user.password_hash.verify(&credentials.password) {
        Ok(true) => {}
        Ok(false) => return Error::InvalidCredentials.into_response(),
        Err(error) => {
            tracing::error!("Unhandled error while verifying credentials: {error}");
            return Error::HashingError(error.to_string()).into_response();
        }
    }

    match set_auth_cookie(jar, user.id, state.cookie_duration) {
        Ok(jar) => (jar, Json(user)).into_response(),
        Err(error) => error.into_response(),
    }
}

#[cfg(test)]
mod log_in_tests {
    use std::sync::{Arc, Mutex};

    use axum::{Router, middleware, routing::{get, post}};
    use axum_extra::extract::cookie::Key;
    use axum_test::TestServer;
    use rusqlite::Connection;
    use serde_json::json;
    use sha2::Digest;
    use time::Duration;

    use crate::{
        auth::{AuthState, PasswordHash, auth_guard, create_user, post_log_in},
        db::initialize,
    };

    use super::LogInState;

    const TEST_COST: u32 = 4;

    fn get_test_server() -> TestServer {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();
        let hash = PasswordHash::from_raw_password("correcthorsebatterystaple", TEST_COST)
            .expect("Could not hash password");
        create_user("jane@example.com", Some("Jane"), hash, &conn)
            .expect("Could not create user");

        let key = Key::from(&sha2::Sha512::digest("log in tests"));
        let state = LogInState {
            cookie_key: key.clone(),
            cookie_duration: Duration::minutes(5),
            db_connection: Arc::new(Mutex::new(conn)),
        };
        let auth_state = AuthState {
            cookie_key: key,
            cookie_duration: Duration::minutes(5),
        };

        let app = Router::new()
            .route(
                "/protected",
                get(|| async { "OK" })
                    .route_layer(middleware::from_fn_with_state(auth_state, auth_guard)),
            )
            .route("/api/log_in", post(post_log_in))
            .with_state(state);

        TestServer::new(app).expect("Could not create test server.")
    }

    #[tokio::test]
    async fn log_in_with_valid_credentials_sets_session() {
        let server = get_test_server();

        let response = server
            .post("/api/log_in")
            .json(&json!({"email": "jane@example.com", "password": "correcthorsebatterystaple"}))
            .await;

        response.assert_status_ok();
        let body: serde_json::Value = response.json();
        assert_eq!(body["email"], "jane@example.com");
        assert!(body.get("password_hash").is_none());

        server
            .get("/protected")
            .add_cookies(response.cookies())
            .await
            .assert_status_ok();
    }

    #[tokio::test]
    async fn log_in_with_wrong_password_is_unauthorized() {
        let server = get_test_server();

        let response = server
            .post("/api/log_in")
            .json(&json!({"email": "jane@example.com", "password": "tr0ub4dor&3"}))
            .await;

        response.assert_status_unauthorized();
    }

    #[tokio::test]
    async fn log_in_with_unknown_email_is_unauthorized() {
        let server = get_test_server();

        let response = server
            .post("/api/log_in")
            .json(&json!({"email": "nobody@example.com", "password": "whatever123"}))
            .await;

        response.assert_status_unauthorized();
    }
}
