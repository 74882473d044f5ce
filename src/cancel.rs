//! Query cancellation
//!
//! A [`CancelHandle`] is kept by whoever started a query; the matching
//! [`CancelToken`]s travel with the query and are raced against every
//! outgoing request.

use tokio::sync::watch;

/// Triggers cancellation of every token created from it
#[derive(Debug)]
pub struct CancelHandle {
    sender: watch::Sender<bool>,
}

/// Observes a [`CancelHandle`]
#[derive(Debug, Clone)]
pub struct CancelToken {
    receiver: watch::Receiver<bool>,
}

impl CancelHandle {
    /// Create a handle and its token
    pub fn new() -> (Self, CancelToken) {
        let (sender, receiver) = watch::channel(false);
        (Self { sender }, CancelToken { receiver })
    }

    /// Another token for this handle
    pub fn token(&self) -> CancelToken {
        CancelToken {
            receiver: self.sender.subscribe(),
        }
    }

    /// Cancel all tokens
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }
}

impl CancelToken {
    /// A token that is never cancelled
    pub fn never() -> Self {
        let (sender, receiver) = watch::channel(false);
        // Dropping the sender freezes the value at `false`.
        drop(sender);
        Self { receiver }
    }

    /// Check whether cancellation was requested
    pub fn is_cancelled(&self) -> bool {
        *self.receiver.borrow()
    }

    /// Resolve once cancellation is requested; pends forever otherwise
    pub async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        if receiver.wait_for(|cancelled| *cancelled).await.is_err() {
            futures::future::pending::<()>().await;
        }
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::never()
    }
}
