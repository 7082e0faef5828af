use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, Weak};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{Record, RecordDraft};
use crate::store::{CancelHandle, RecordStore, StoreEvent, Subscription};

/// In-process [`RecordStore`] with the reference semantics of the hosted
/// store: per-user collections, and a full-collection snapshot pushed to
/// every live listener after each change.
///
/// Backs the test suites the way an in-memory database backs a service
/// layer; cloning shares the same underlying collections.
#[derive(Default, Clone)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, BTreeMap<String, Record>>,
    subscribers: HashMap<String, Vec<Subscriber>>,
    next_subscriber: u64,
}

struct Subscriber {
    id: u64,
    events: mpsc::UnboundedSender<StoreEvent>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push an error down every live listener for `user_id`, simulating the
    /// store revoking the subscription mid-session.
    pub fn emit_error(&self, user_id: &str, error: &StoreError) {
        let mut inner = lock(&self.inner);
        if let Some(subscribers) = inner.subscribers.get_mut(user_id) {
            subscribers.retain(|s| s.events.send(StoreEvent::Error(error.clone())).is_ok());
        }
    }

    /// Number of records currently stored for `user_id`.
    #[must_use]
    pub fn record_count(&self, user_id: &str) -> usize {
        lock(&self.inner)
            .collections
            .get(user_id)
            .map_or(0, BTreeMap::len)
    }

    fn snapshot(inner: &Inner, user_id: &str) -> Vec<Record> {
        inner
            .collections
            .get(user_id)
            .map(|collection| collection.values().cloned().collect())
            .unwrap_or_default()
    }

    fn notify(inner: &mut Inner, user_id: &str) {
        let snapshot = Self::snapshot(inner, user_id);
        if let Some(subscribers) = inner.subscribers.get_mut(user_id) {
            subscribers.retain(|s| {
                s.events
                    .send(StoreEvent::Snapshot(snapshot.clone()))
                    .is_ok()
            });
        }
    }
}

fn lock(inner: &Arc<Mutex<Inner>>) -> std::sync::MutexGuard<'_, Inner> {
    inner
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn create(&self, user_id: &str, draft: &RecordDraft) -> Result<Record, StoreError> {
        let record = draft.clone().into_record(
            Uuid::new_v4().to_string(),
            user_id.to_string(),
            Utc::now().to_rfc3339(),
        );

        let mut inner = lock(&self.inner);
        inner
            .collections
            .entry(user_id.to_string())
            .or_default()
            .insert(record.id.clone(), record.clone());
        Self::notify(&mut inner, user_id);
        Ok(record)
    }

    async fn update(
        &self,
        user_id: &str,
        id: &str,
        draft: &RecordDraft,
    ) -> Result<Record, StoreError> {
        let now = Utc::now().to_rfc3339();
        let mut inner = lock(&self.inner);
        let collection = inner.collections.entry(user_id.to_string()).or_default();

        let record = if let Some(existing) = collection.get_mut(id) {
            existing.date = draft.date.clone();
            existing.before_breakfast = draft.before_breakfast.clone();
            existing.after_breakfast = draft.after_breakfast.clone();
            existing.after_lunch = draft.after_lunch.clone();
            existing.after_dinner = draft.after_dinner.clone();
            existing.breakfast_meal = draft.breakfast_meal.clone();
            existing.lunch_meal = draft.lunch_meal.clone();
            existing.dinner_meal = draft.dinner_meal.clone();
            existing.updated_at = now;
            existing.clone()
        } else {
            // Merge into nothing: the path materializes with only the merged
            // fields, so the record carries no creation time.
            let mut record =
                draft
                    .clone()
                    .into_record(id.to_string(), user_id.to_string(), String::new());
            record.updated_at = now;
            collection.insert(id.to_string(), record.clone());
            record
        };

        Self::notify(&mut inner, user_id);
        Ok(record)
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let mut inner = lock(&self.inner);
        let removed = inner
            .collections
            .get_mut(user_id)
            .is_some_and(|collection| collection.remove(id).is_some());
        if removed {
            Self::notify(&mut inner, user_id);
        }
        Ok(())
    }

    async fn fetch(&self, user_id: &str, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(lock(&self.inner)
            .collections
            .get(user_id)
            .and_then(|collection| collection.get(id).cloned()))
    }

    async fn subscribe(&self, user_id: &str) -> Result<Subscription, StoreError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let subscriber_id = {
            let mut inner = lock(&self.inner);
            let subscriber_id = inner.next_subscriber;
            inner.next_subscriber += 1;

            // Listeners hear the current contents immediately.
            let _ = tx.send(StoreEvent::Snapshot(Self::snapshot(&inner, user_id)));
            inner
                .subscribers
                .entry(user_id.to_string())
                .or_default()
                .push(Subscriber {
                    id: subscriber_id,
                    events: tx,
                });
            subscriber_id
        };

        let store: Weak<Mutex<Inner>> = Arc::downgrade(&self.inner);
        let user_id = user_id.to_string();
        let handle = CancelHandle::new(move || {
            if let Some(inner) = store.upgrade() {
                let mut inner = lock(&inner);
                if let Some(subscribers) = inner.subscribers.get_mut(&user_id) {
                    subscribers.retain(|s| s.id != subscriber_id);
                }
            }
        });

        Ok(Subscription::new(rx, handle))
    }
}
