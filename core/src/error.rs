use std::collections::BTreeMap;

use thiserror::Error;

/// Failures raised by a [`RecordStore`](crate::store::RecordStore)
/// implementation. `Clone` so a subscription failure can be parked in the
/// session's observable view.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The store rejected the caller's credentials for this path.
    #[error("permission denied")]
    PermissionDenied,

    /// The store could not be reached or the connection was lost.
    #[error("network failure: {0}")]
    Network(String),

    /// Anything else the store reported.
    #[error("store error: {0}")]
    Unknown(String),
}

/// Per-field validation failures for a record draft.
///
/// Keys are the wire names of the offending fields (`date`,
/// `beforeBreakfast`, …) plus the synthetic `readings` key raised when no
/// reading is provided at all. A draft that fails validation never reaches
/// the store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid record: {}", join_fields(.fields))]
pub struct ValidationError {
    fields: BTreeMap<&'static str, String>,
}

impl ValidationError {
    pub(crate) fn new() -> Self {
        Self {
            fields: BTreeMap::new(),
        }
    }

    pub(crate) fn push(&mut self, field: &'static str, message: &str) {
        self.fields.insert(field, message.to_string());
    }

    /// Message for one field, if it failed.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Every failed field with its message, in field-name order.
    pub fn fields(&self) -> impl Iterator<Item = (&'static str, &str)> {
        self.fields.iter().map(|(k, v)| (*k, v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

fn join_fields(fields: &BTreeMap<&'static str, String>) -> String {
    fields
        .iter()
        .map(|(field, message)| format!("{field}: {message}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error type for session operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
