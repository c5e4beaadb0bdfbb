//! Append-only JSON lines store.

use std::path::{Path, PathBuf};

use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use crate::{MatchRecord, MatchStore, StoreError};

/// Appends each record as one line of JSON.
///
/// Writes are serialized through a lock so concurrent saves from
/// different rooms never interleave within a line.
#[derive(Debug)]
pub struct JsonlStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlStore {
    /// Creates a store writing to `path`. The file is created on first
    /// save; parent directories must already exist.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The file this store appends to.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads every record back. A missing file reads as empty.
    ///
    /// # Errors
    /// [`StoreError::Io`] on read failure, [`StoreError::Serialization`]
    /// if a line is not a valid record.
    pub async fn load_all(&self) -> Result<Vec<MatchRecord>, StoreError> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| serde_json::from_str(line).map_err(StoreError::from))
            .collect()
    }
}

impl MatchStore for JsonlStore {
    async fn save(&self, record: MatchRecord) -> Result<(), StoreError> {
        let mut line = serde_json::to_vec(&record)?;
        line.push(b'\n');

        let _guard = self.write_lock.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;

        tracing::debug!(
            room_id = %record.room_id,
            path = %self.path.display(),
            "match record appended"
        );
        Ok(())
    }
}
