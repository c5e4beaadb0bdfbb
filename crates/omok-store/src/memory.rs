//! In-memory store.

use tokio::sync::Mutex;

use crate::{MatchRecord, MatchStore, StoreError};

/// Keeps every saved record in a `Vec`. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: Mutex<Vec<MatchRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything saved so far, in save order.
    pub async fn records(&self) -> Vec<MatchRecord> {
        self.records.lock().await.clone()
    }

    /// Number of saved records.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    /// Returns `true` if nothing has been saved.
    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }
}

impl MatchStore for MemoryStore {
    async fn save(&self, record: MatchRecord) -> Result<(), StoreError> {
        self.records.lock().await.push(record);
        Ok(())
    }
}
