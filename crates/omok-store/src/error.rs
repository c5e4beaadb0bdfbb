//! Error types for match persistence.

/// Errors a [`MatchStore`](crate::MatchStore) can report.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The record could not be (de)serialized.
    #[error("record serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The backend refused the write.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
