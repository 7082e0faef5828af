use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::StoreError;
use crate::models::{Record, RecordDraft};

/// A change pushed down a standing subscription.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// Full current contents of the user's record collection.
    Snapshot(Vec<Record>),
    /// The listener's own error channel (e.g. permission revoked
    /// mid-session).
    Error(StoreError),
}

/// Cancel capability for a standing subscription.
///
/// Cloneable so the listener task and its owner can hold it independently;
/// cancelling more than once is a no-op.
#[derive(Clone)]
pub struct CancelHandle {
    cancel: Arc<Mutex<Option<Box<dyn FnOnce() + Send>>>>,
}

impl CancelHandle {
    #[must_use]
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Arc::new(Mutex::new(Some(Box::new(cancel)))),
        }
    }

    /// Tear down the listener. Safe to call repeatedly.
    pub fn cancel(&self) {
        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }
}

/// A standing listener on one user's record collection.
///
/// The store pushes the current contents once immediately, then a fresh
/// snapshot after every collection change. Dropping the subscription
/// cancels it.
pub struct Subscription {
    events: mpsc::UnboundedReceiver<StoreEvent>,
    handle: CancelHandle,
}

impl Subscription {
    #[must_use]
    pub fn new(events: mpsc::UnboundedReceiver<StoreEvent>, handle: CancelHandle) -> Self {
        Self { events, handle }
    }

    /// Next pushed event, or `None` once the store side has gone away.
    pub async fn next_event(&mut self) -> Option<StoreEvent> {
        self.events.recv().await
    }

    /// The cancel capability, usable independently of the event stream.
    #[must_use]
    pub fn cancel_handle(&self) -> CancelHandle {
        self.handle.clone()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.cancel();
    }
}

/// Adapter over the hosted store's create/update/delete/subscribe
/// primitives, scoped under a per-user namespace.
///
/// Implementations perform no caching: the subscription snapshot is the only
/// read path the synchronizer trusts.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Store a new record. The adapter assigns the id and `createdAt` and
    /// returns the record as stored.
    async fn create(&self, user_id: &str, draft: &RecordDraft) -> Result<Record, StoreError>;

    /// Merge the draft's fields plus a refreshed `updatedAt` into the record
    /// at `id`. A missing id is not an error: the merge materializes a
    /// partial record at that path, as the hosted store does.
    async fn update(
        &self,
        user_id: &str,
        id: &str,
        draft: &RecordDraft,
    ) -> Result<Record, StoreError>;

    /// Remove the record at `id`. Removing a missing id is a no-op.
    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError>;

    /// Fetch a single record, or `None` if absent.
    async fn fetch(&self, user_id: &str, id: &str) -> Result<Option<Record>, StoreError>;

    /// Open a standing listener on the user's collection.
    async fn subscribe(&self, user_id: &str) -> Result<Subscription, StoreError>;
}
