//! Durable match records for omok.
//!
//! The match server only promises to *attempt* one write per finished
//! match. This crate defines that record ([`MatchRecord`]), the write
//! contract ([`MatchStore`]), and two stores:
//!
//! - [`MemoryStore`]: keeps records in memory (tests, local play)
//! - [`JsonlStore`]: appends one JSON object per line to a file
//!
//! Schema management of a real database is somebody else's job; any
//! backend can be plugged in by implementing [`MatchStore`].

#![allow(async_fn_in_trait)]

mod error;
mod jsonl;
mod memory;
mod record;

pub use error::StoreError;
pub use jsonl::JsonlStore;
pub use memory::MemoryStore;
pub use record::MatchRecord;

/// The write contract for finished matches.
///
/// Called from a detached task, once per match, with no retry: a failed
/// write is logged by the caller and forgotten.
pub trait MatchStore: Send + Sync + 'static {
    /// Persists a finished match.
    ///
    /// # Errors
    /// Any [`StoreError`]; the caller never rolls back game state.
    fn save(
        &self,
        record: MatchRecord,
    ) -> impl std::future::Future<Output = Result<(), StoreError>> + Send;
}
