//! Hosted realtime-database adapter for glucolog.
//!
//! [`RtdbStore`] implements `glucolog-core`'s `RecordStore` trait over the
//! hosted store's REST + event-stream interface, so a session synchronizes
//! against the real deployment the same way it does against the in-memory
//! reference store.

pub mod rtdb;
pub mod sse;

pub use rtdb::RtdbStore;
pub use sse::{SseEvent, SseParser};
