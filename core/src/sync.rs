use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::error::{Error, StoreError};
use crate::models::{EXPORT_VERSION, ExportData, Record, RecordDraft};
use crate::stats::{self, Stats};
use crate::store::{CancelHandle, RecordStore, StoreEvent};

/// Observable session state: the synchronized record collection plus
/// readiness and the last subscription failure.
#[derive(Debug, Clone, Default)]
pub struct RecordsView {
    /// Current records, sorted by date descending.
    pub records: Vec<Record>,
    /// True once the first snapshot has arrived.
    pub loaded: bool,
    /// Set when the subscription itself failed; the collection is cleared
    /// rather than left stale.
    pub error: Option<StoreError>,
}

/// One signed-in user's live view of their diary.
///
/// Holds the session's only standing subscription. Local state is a cache of
/// the store, rebuilt from every snapshot push; mutations go through the
/// adapter and wait for the subscription round-trip — there is no optimistic
/// local update. `end` consumes the session, so re-login always builds a
/// fresh subscription rather than stacking listeners.
pub struct Session {
    user_id: String,
    store: Arc<dyn RecordStore>,
    view: watch::Sender<RecordsView>,
    subscription: CancelHandle,
    drain: JoinHandle<()>,
}

impl Session {
    /// Attach to `user_id`'s collection and start draining snapshots into
    /// the observable view.
    pub async fn start(
        store: Arc<dyn RecordStore>,
        user_id: impl Into<String>,
    ) -> Result<Self, StoreError> {
        let user_id = user_id.into();
        let mut subscription = store.subscribe(&user_id).await?;
        let cancel = subscription.cancel_handle();

        let (view, _) = watch::channel(RecordsView::default());
        let tx = view.clone();
        let drain = tokio::spawn(async move {
            while let Some(event) = subscription.next_event().await {
                match event {
                    StoreEvent::Snapshot(mut records) => {
                        // Validated dates are ISO, so the string order is the
                        // chronological order; ties keep store order.
                        records.sort_by(|a, b| b.date.cmp(&a.date));
                        tx.send_modify(|view| {
                            view.records = records;
                            view.loaded = true;
                            view.error = None;
                        });
                    }
                    StoreEvent::Error(error) => {
                        tracing::error!(%error, "subscription failed, clearing records");
                        tx.send_modify(|view| {
                            view.records.clear();
                            view.loaded = true;
                            view.error = Some(error);
                        });
                    }
                }
            }
        });

        tracing::info!(user = %user_id, "session started");
        Ok(Self {
            user_id,
            store,
            view,
            subscription: cancel,
            drain,
        })
    }

    /// Identifier of the session's user.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Watch half of the live view; `changed()` wakes on every snapshot.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<RecordsView> {
        self.view.subscribe()
    }

    /// Current view of the synchronized collection.
    #[must_use]
    pub fn view(&self) -> RecordsView {
        self.view.borrow().clone()
    }

    /// Derived statistics over the current collection, `None` when there is
    /// nothing to summarize.
    #[must_use]
    pub fn stats(&self) -> Option<Stats> {
        stats::summarize(&self.view.borrow().records)
    }

    /// Validate and store a new entry. The local collection is untouched
    /// until the subscription echoes the change back.
    pub async fn add_record(&self, draft: &RecordDraft) -> Result<Record, Error> {
        let draft = draft.cleaned();
        draft.validate()?;
        Ok(self.store.create(&self.user_id, &draft).await?)
    }

    /// Validate and merge new field values into the record at `id`.
    pub async fn update_record(&self, id: &str, draft: &RecordDraft) -> Result<Record, Error> {
        let draft = draft.cleaned();
        draft.validate()?;
        Ok(self.store.update(&self.user_id, id, &draft).await?)
    }

    /// Delete the record at `id`. Deleting an already-removed id succeeds.
    pub async fn remove_record(&self, id: &str) -> Result<(), Error> {
        Ok(self.store.delete(&self.user_id, id).await?)
    }

    /// Snapshot the current collection into a versioned export envelope.
    #[must_use]
    pub fn export_all(&self) -> ExportData {
        ExportData {
            version: EXPORT_VERSION,
            exported_at: Utc::now().to_rfc3339(),
            user_id: self.user_id.clone(),
            records: self.view.borrow().records.clone(),
        }
    }

    /// Tear the session down: stop the drain task first so a late snapshot
    /// cannot touch state, then cancel the store listener and reset the
    /// view.
    pub fn end(self) {
        self.drain.abort();
        self.subscription.cancel();
        self.view.send_modify(|view| {
            view.records.clear();
            view.loaded = false;
            view.error = None;
        });
        tracing::info!(user = %self.user_id, "session ended");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.drain.abort();
        self.subscription.cancel();
    }
}
