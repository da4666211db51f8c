//! The transaction change feed.
//!
//! Every committed insert, update, or delete publishes a
//! [TransactionChange]. Views subscribe for a single user's changes and
//! re-fetch the full transaction list whenever one arrives; there is no
//! incremental patching. A subscription lives exactly as long as the value
//! returned by [ChangeFeed::subscribe] — dropping it tears the
//! subscription down.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::auth::UserID;

/// The kind of mutation that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    /// A transaction was inserted.
    Created,
    /// A transaction was updated in place.
    Updated,
    /// A transaction was deleted.
    Deleted,
}

/// A notification that one of a user's transactions changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionChange {
    /// The user whose transaction changed.
    pub user_id: UserID,
    /// The ID of the affected transaction.
    pub transaction_id: i64,
    /// What happened to it.
    pub kind: ChangeKind,
}

/// How many unconsumed changes a slow subscriber may fall behind before the
/// oldest are dropped. A lagging subscriber still learns that *something*
/// changed, which is all a full-refetch client needs.
const CHANGE_BUFFER: usize = 64;

/// Fan-out point for transaction change notifications.
#[derive(Debug, Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<TransactionChange>,
}

impl ChangeFeed {
    /// Create a feed with no subscribers.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANGE_BUFFER);
        Self { sender }
    }

    /// Publish a change to all current subscribers.
    ///
    /// Publishing with no subscribers is not an error; the change is simply
    /// dropped.
    pub fn publish(&self, change: TransactionChange) {
        let _ = self.sender.send(change);
    }

    /// Subscribe to changes affecting `user_id`'s transactions.
    ///
    /// Changes published for other users are filtered out. Drop the returned
    /// subscription to release it.
    pub fn subscribe(&self, user_id: UserID) -> ChangeSubscription {
        ChangeSubscription {
            user_id,
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// A live subscription to one user's transaction changes.
pub struct ChangeSubscription {
    user_id: UserID,
    receiver: broadcast::Receiver<TransactionChange>,
}

impl ChangeSubscription {
    /// Wait for the next change affecting the subscribed user.
    ///
    /// Returns `None` when the feed has been dropped. If the subscriber
    /// lagged behind the buffer, intervening changes are skipped and the
    /// next available one is returned.
    pub async fn recv(&mut self) -> Option<TransactionChange> {
        loop {
            match self.receiver.recv().await {
                Ok(change) if change.user_id == self.user_id => return Some(change),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(
                        "change feed subscriber for user {} lagged by {skipped} changes",
                        self.user_id
                    );
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
