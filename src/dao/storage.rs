use std::path::PathBuf;

use thiserror::Error;

/// Result alias for snapshot storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised while reading or writing the snapshot file.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The filesystem refused an operation (permissions, disk full, ...).
    #[error("snapshot I/O failed for `{path}`")]
    Io {
        /// File or directory the operation targeted.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// The in-memory state could not be encoded.
    #[error("failed to encode snapshot")]
    Serialize(#[source] serde_json::Error),
    /// The stored snapshot cannot be used and must be discarded.
    #[error("snapshot `{path}` is corrupt: {reason}")]
    Corrupt {
        /// Snapshot file that was read.
        path: PathBuf,
        /// Why decoding failed.
        reason: String,
    },
    /// The persistence worker is no longer running.
    #[error("persistence worker stopped")]
    WorkerStopped,
}

impl StorageError {
    /// Wrap an I/O failure with the path it concerns.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}
