//! The long-poll route for transaction change notifications.

use std::time::Duration;

use axum::{
    Extension, Json,
    extract::{FromRef, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::{app_state::AppState, auth::UserID, changes::ChangeFeed};

/// How long a poll waits for a change before returning empty-handed.
const LONG_POLL_TIMEOUT: Duration = Duration::from_secs(25);

/// The state needed to serve change notifications.
#[derive(Clone)]
pub struct EventsState {
    /// The feed the transaction handlers publish to.
    pub change_feed: ChangeFeed,
}

impl FromRef<AppState> for EventsState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            change_feed: state.change_feed.clone(),
        }
    }
}

/// A route handler that long-polls for the next change to the user's
/// transactions.
///
/// Responds with the change as JSON as soon as one happens, or 204 No
/// Content if nothing changes within the poll window. The subscription
/// only covers the lifetime of the request, so clients should re-poll
/// promptly and refetch the listing after any non-empty response.
pub async fn poll_transaction_events(
    State(state): State<EventsState>,
    Extension(user_id): Extension<UserID>,
) -> Response {
    let mut subscription = state.change_feed.subscribe(user_id);

    match tokio::time::timeout(LONG_POLL_TIMEOUT, subscription.recv()).await {
        Ok(Some(change)) => Json(change).into_response(),
        // Either the window elapsed or the feed shut down.
        _ => StatusCode::NO_CONTENT.into_response(),
    }
}

#[cfg(test)]
mod events_tests {
    use axum::{Extension, Router, routing::get};
    use axum_test::TestServer;

    use crate::{
        auth::UserID,
        changes::{ChangeFeed, ChangeKind, TransactionChange},
    };

    use super::{EventsState, poll_transaction_events};

    fn new_test_server(change_feed: ChangeFeed, user_id: UserID) -> TestServer {
        let router = Router::new()
            .route("/events", get(poll_transaction_events))
            .layer(Extension(user_id))
            .with_state(EventsState { change_feed });

        TestServer::new(router).unwrap()
    }

    #[tokio::test]
    async fn poll_returns_published_change() {
        let change_feed = ChangeFeed::new();
        let user_id = UserID::new(1);
        let server = new_test_server(change_feed.clone(), user_id);

        let poll = tokio::spawn(async move { server.get("/events").await });
        // Give the poll a moment to subscribe before publishing.
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        change_feed.publish(TransactionChange {
            user_id,
            transaction_id: 7,
            kind: ChangeKind::Created,
        });

        let response = poll.await.unwrap();
        response.assert_status_ok();
        let change: TransactionChange = response.json();
        assert_eq!(change.transaction_id, 7);
    }

    #[tokio::test]
    async fn other_users_changes_do_not_end_the_poll() {
        let change_feed = ChangeFeed::new();
        let server = new_test_server(change_feed.clone(), UserID::new(1));

        let poll = tokio::spawn(async move { server.get("/events").await });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        change_feed.publish(TransactionChange {
            user_id: UserID::new(2),
            transaction_id: 7,
            kind: ChangeKind::Deleted,
        });
        // The user's own change arrives afterwards and is the one returned.
        change_feed.publish(TransactionChange {
            user_id: UserID::new(1),
            transaction_id: 8,
            kind: ChangeKind::Updated,
        });

        let response = poll.await.unwrap();
        response.assert_status_ok();
        let change: TransactionChange = response.json();
        assert_eq!(change.transaction_id, 8);
    }
}
