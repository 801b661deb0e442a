//! Error types for the store layer.

use thiserror::Error;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur in the store layer.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A concurrent writer advanced a client watermark first. The
    /// losing writer must re-read the watermark and retry.
    #[error("watermark conflict: expected last mutation id {expected}, found {actual}")]
    WatermarkConflict {
        /// Watermark the writer expected to still hold.
        expected: u64,
        /// Watermark actually stored.
        actual: u64,
    },

    /// A client id is already attached to a different client group.
    #[error("client {client} belongs to group {group}, not the requested group")]
    ClientGroupMismatch {
        /// Offending client id.
        client: String,
        /// Group the client is actually attached to.
        group: String,
    },

    /// A client group is owned by a different principal.
    #[error("client group {group} is owned by another principal")]
    ForeignClientGroup {
        /// Offending group id.
        group: String,
    },

    /// The backing store could not be reached. Retryable.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Snapshot decode failure.
    #[error("snapshot is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// Returns true if the caller may retry the whole operation.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::WatermarkConflict { .. }
        )
    }
}
