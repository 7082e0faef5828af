use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use futures::StreamExt;
use reqwest::{StatusCode, header};
use serde::Serialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use glucolog_core::error::StoreError;
use glucolog_core::models::{Record, RecordDraft};
use glucolog_core::store::{CancelHandle, RecordStore, StoreEvent, Subscription};

use crate::sse::SseParser;

/// Per-request deadline for plain CRUD calls. The subscription stream is
/// long-lived and carries no deadline, only a connect timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// [`RecordStore`] over a hosted realtime database's REST interface.
///
/// Records live at `users/{userId}/records/{recordId}.json` under the
/// database root; the standing subscription is a streaming request on the
/// collection path whose `put`/`patch` events signal a change. The adapter
/// keeps no cache: every signal triggers a fresh fetch of the full
/// collection.
#[derive(Clone)]
pub struct RtdbStore {
    base_url: String,
    auth: Option<String>,
    client: reqwest::Client,
}

impl RtdbStore {
    /// `base_url` is the database root (scheme and host, no trailing
    /// slash); `auth` is the session's database token, if the deployment
    /// requires one.
    #[must_use]
    pub fn new(base_url: impl Into<String>, auth: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(format!("glucolog/{} (glucose diary)", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("Failed to build HTTP client");
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth,
            client,
        }
    }

    fn collection_url(&self, user_id: &str) -> String {
        format!("{}/users/{user_id}/records.json", self.base_url)
    }

    fn record_url(&self, user_id: &str, id: &str) -> String {
        format!("{}/users/{user_id}/records/{id}.json", self.base_url)
    }

    fn with_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(token) => request.query(&[("auth", token.as_str())]),
            None => request,
        }
    }

    fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
        match response.status() {
            status if status.is_success() => Ok(response),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(StoreError::PermissionDenied),
            status => Err(StoreError::Unknown(format!("unexpected status {status}"))),
        }
    }

    /// Read the user's full collection. An entry that does not decode is
    /// skipped rather than failing the whole snapshot.
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<Record>, StoreError> {
        let response = self
            .with_auth(self.client.get(self.collection_url(user_id)))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(net_err)?;
        let body: Option<HashMap<String, serde_json::Value>> =
            Self::check(response)?.json().await.map_err(net_err)?;

        Ok(body
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, value)| match serde_json::from_value(value) {
                Ok(record) => Some(record),
                Err(err) => {
                    tracing::warn!(%key, %err, "skipping undecodable record");
                    None
                }
            })
            .collect())
    }
}

fn net_err(err: reqwest::Error) -> StoreError {
    StoreError::Network(err.to_string())
}

/// Fields sent on update: the draft plus a refreshed `updatedAt`, merged
/// server-side so identity and creation time survive.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RecordPatch<'a> {
    date: &'a str,
    before_breakfast: &'a str,
    after_breakfast: &'a str,
    after_lunch: &'a str,
    after_dinner: &'a str,
    breakfast_meal: &'a str,
    lunch_meal: &'a str,
    dinner_meal: &'a str,
    updated_at: &'a str,
}

impl<'a> RecordPatch<'a> {
    fn new(draft: &'a RecordDraft, updated_at: &'a str) -> Self {
        Self {
            date: &draft.date,
            before_breakfast: &draft.before_breakfast,
            after_breakfast: &draft.after_breakfast,
            after_lunch: &draft.after_lunch,
            after_dinner: &draft.after_dinner,
            breakfast_meal: &draft.breakfast_meal,
            lunch_meal: &draft.lunch_meal,
            dinner_meal: &draft.dinner_meal,
            updated_at,
        }
    }
}

#[async_trait]
impl RecordStore for RtdbStore {
    async fn create(&self, user_id: &str, draft: &RecordDraft) -> Result<Record, StoreError> {
        // Push keys are generated client-side, as the hosted SDKs do.
        let record = draft.clone().into_record(
            Uuid::new_v4().to_string(),
            user_id.to_string(),
            Utc::now().to_rfc3339(),
        );

        let response = self
            .with_auth(self.client.put(self.record_url(user_id, &record.id)))
            .timeout(REQUEST_TIMEOUT)
            .json(&record)
            .send()
            .await
            .map_err(net_err)?;
        Self::check(response)?;
        Ok(record)
    }

    async fn update(
        &self,
        user_id: &str,
        id: &str,
        draft: &RecordDraft,
    ) -> Result<Record, StoreError> {
        let now = Utc::now().to_rfc3339();
        let response = self
            .with_auth(self.client.patch(self.record_url(user_id, id)))
            .timeout(REQUEST_TIMEOUT)
            .json(&RecordPatch::new(draft, &now))
            .send()
            .await
            .map_err(net_err)?;
        Self::check(response)?;

        // The merge is confirmed at this point; the read-back only enriches
        // the returned value. A partial object at this id (merge into
        // nothing) does not decode, so fall back to echoing the merged
        // fields — the snapshot push remains the authoritative view.
        let mut merged =
            draft
                .clone()
                .into_record(id.to_string(), user_id.to_string(), String::new());
        merged.updated_at = now;
        Ok(self
            .fetch(user_id, id)
            .await
            .ok()
            .flatten()
            .unwrap_or(merged))
    }

    async fn delete(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let response = self
            .with_auth(self.client.delete(self.record_url(user_id, id)))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(net_err)?;
        Self::check(response)?;
        Ok(())
    }

    async fn fetch(&self, user_id: &str, id: &str) -> Result<Option<Record>, StoreError> {
        let response = self
            .with_auth(self.client.get(self.record_url(user_id, id)))
            .timeout(REQUEST_TIMEOUT)
            .send()
            .await
            .map_err(net_err)?;
        let value: serde_json::Value = Self::check(response)?.json().await.map_err(net_err)?;
        if value.is_null() {
            return Ok(None);
        }
        serde_json::from_value(value)
            .map(Some)
            .map_err(|err| StoreError::Unknown(format!("undecodable record {id}: {err}")))
    }

    async fn subscribe(&self, user_id: &str) -> Result<Subscription, StoreError> {
        let response = self
            .with_auth(self.client.get(self.collection_url(user_id)))
            .header(header::ACCEPT, "text/event-stream")
            .send()
            .await
            .map_err(net_err)?;
        let response = Self::check(response)?;

        let (tx, rx) = mpsc::unbounded_channel();
        let store = self.clone();
        let user = user_id.to_string();

        let task = tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut parser = SseParser::new();

            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(err) => {
                        let _ = tx.send(StoreEvent::Error(net_err(err)));
                        return;
                    }
                };
                for event in parser.push(&String::from_utf8_lossy(&chunk)) {
                    match event.event.as_str() {
                        // The stream's own payload only names what changed;
                        // refetching keeps this layer cache-free.
                        "put" | "patch" => match store.fetch_all(&user).await {
                            Ok(records) => {
                                let _ = tx.send(StoreEvent::Snapshot(records));
                            }
                            Err(err) => {
                                let _ = tx.send(StoreEvent::Error(err));
                            }
                        },
                        "auth_revoked" | "cancel" => {
                            tracing::warn!(user = %user, kind = %event.event, "listener revoked");
                            let _ = tx.send(StoreEvent::Error(StoreError::PermissionDenied));
                            return;
                        }
                        _ => {} // keep-alive
                    }
                }
            }
            let _ = tx.send(StoreEvent::Error(StoreError::Network(
                "event stream closed".to_string(),
            )));
        });

        let abort = task.abort_handle();
        Ok(Subscription::new(rx, CancelHandle::new(move || abort.abort())))
    }
}
