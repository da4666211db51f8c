//! The endpoint clearing the session cookies.

use axum::{http::StatusCode, response::IntoResponse};
use axum_extra::extract::PrivateCookieJar;

use crate::auth::cookie::invalidate_auth_cookie;

/// Handler for log-out requests. Always succeeds, even when no session
/// cookies are present.
pub async fn get_log_out(jar: PrivateCookieJar) -> impl IntoResponse {
    (invalidate_auth_cookie(jar), StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod log_out_tests {
    use axum::{Router, http::StatusCode, routing::get};
    use axum_extra::extract::cookie::Key;
    use axum_test::TestServer;
    use sha2::Digest;
    use time::OffsetDateTime;

    use crate::auth::COOKIE_USER_ID;

    use super::get_log_out;

    #[derive(Clone)]
    struct KeyState(Key);

    impl axum::extract::FromRef<KeyState> for Key {
        fn from_ref(state: &KeyState) -> Self {
            state.0.clone()
        }
    }

    #[tokio::test]
    async fn log_out_expires_cookies() {
        let key = Key::from(&sha2::Sha512::digest("log out tests"));
        let app = Router::new()
            .route("/api/log_out", get(get_log_out))
            .with_state(KeyState(key));
        let server = TestServer::new(app).expect("Could not create test server.");

        let response = server.get("/api/log_out").await;

        response.assert_status(StatusCode::NO_CONTENT);
        // The cookie value itself is encrypted, so only the expiry metadata
        // can be checked from outside the private jar.
        let cookie = response.cookie(COOKIE_USER_ID);
        assert_eq!(cookie.expires_datetime(), Some(OffsetDateTime::UNIX_EPOCH));
    }
}
