//! Document store client interface
//!
//! Defines the contract between the application and a document store,
//! including live query subscriptions.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::model::{Collection, Document, Fields, Query};
use crate::Result;

/// Store interface for documents in the `tasks` and `comments` collections
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document and return its store-assigned id
    async fn create(&self, collection: Collection, fields: Fields) -> Result<String>;

    /// Get a document by ID
    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>>;

    /// Run a point-in-time query
    async fn query(&self, collection: Collection, query: &Query) -> Result<Vec<Document>>;

    /// Delete a document by ID, returning whether it existed
    async fn delete(&self, collection: Collection, id: &str) -> Result<bool>;

    /// Register a live query.
    ///
    /// The subscription yields the current result set first and then the full
    /// result set again after every change to a matching document.
    async fn subscribe(&self, collection: Collection, query: Query) -> Result<Subscription>;

    /// Number of documents in a collection
    async fn count(&self, collection: Collection) -> Result<usize>;
}

type CancelAction = Box<dyn FnOnce() + Send>;

/// Shared, idempotent cancellation of a live listener
#[derive(Clone)]
pub struct CancelToken {
    action: Arc<Mutex<Option<CancelAction>>>,
}

impl CancelToken {
    pub fn new(action: impl FnOnce() + Send + 'static) -> Self {
        Self {
            action: Arc::new(Mutex::new(Some(Box::new(action)))),
        }
    }

    /// Run the cancellation. Returns `true` only for the call that released
    /// the listener; later calls have no effect.
    pub fn cancel(&self) -> bool {
        let action = self
            .action
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match action {
            Some(action) => {
                action();
                true
            }
            None => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.action
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_none()
    }
}

/// A registered live query.
///
/// Only the latest snapshot is retained: a slow consumer skips intermediate
/// result sets but never sees a partial one. Dropping the subscription
/// cancels it.
pub struct Subscription {
    receiver: watch::Receiver<Vec<Document>>,
    token: CancelToken,
}

impl Subscription {
    /// Build a subscription over a snapshot channel. The current value of
    /// the channel is delivered by the first call to [`Subscription::next`].
    pub fn new(mut receiver: watch::Receiver<Vec<Document>>, token: CancelToken) -> Self {
        receiver.mark_changed();
        Self { receiver, token }
    }

    /// Wait for the next snapshot. Returns `None` once cancelled.
    pub async fn next(&mut self) -> Option<Vec<Document>> {
        if self.token.is_cancelled() {
            return None;
        }
        self.receiver.changed().await.ok()?;
        Some(self.receiver.borrow_and_update().clone())
    }

    /// The most recent snapshot without waiting
    pub fn latest(&self) -> Vec<Document> {
        self.receiver.borrow().clone()
    }

    pub fn cancel(&self) -> bool {
        self.token.cancel()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Drive the subscription on a background task, handing every snapshot
    /// to `on_update`. The callback runs on the runtime and must not block.
    pub fn forward<F>(mut self, on_update: F) -> SubscriptionHandle
    where
        F: Fn(Vec<Document>) + Send + 'static,
    {
        let token = self.token.clone();
        let worker = tokio::spawn(async move {
            while let Some(documents) = self.next().await {
                on_update(documents);
            }
        });
        SubscriptionHandle { token, worker }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Handle to a forwarded subscription, owned by the consuming view.
///
/// Cancelling releases the store listener and stops the delivery task.
/// Dropping the handle cancels it.
pub struct SubscriptionHandle {
    token: CancelToken,
    worker: JoinHandle<()>,
}

impl SubscriptionHandle {
    /// Release the subscription. Idempotent: returns `true` only for the
    /// first call.
    pub fn cancel(&self) -> bool {
        let released = self.token.cancel();
        self.worker.abort();
        released
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
