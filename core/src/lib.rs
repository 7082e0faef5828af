//! Core library for the glucolog blood-glucose diary.
//!
//! The hosted database and authentication service stay behind the
//! [`store::RecordStore`] trait; [`sync::Session`] keeps one user's local
//! collection consistent with the remote store through a standing
//! subscription, and [`stats::summarize`] derives the summary numbers the
//! diary displays. `glucolog-remote` implements the store trait over the
//! hosted service's REST interface.

pub mod error;
pub mod memory;
pub mod models;
pub mod stats;
pub mod store;
pub mod sync;

pub use error::{Error, StoreError, ValidationError};
pub use memory::MemoryStore;
pub use models::{ExportData, Record, RecordDraft, ReadingLevel, User};
pub use stats::{Stats, summarize};
pub use store::{CancelHandle, RecordStore, StoreEvent, Subscription};
pub use sync::{RecordsView, Session};
