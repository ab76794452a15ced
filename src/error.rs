//! Error types for storage backends and the bridge.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by a [`StorageBackend`](crate::platform::StorageBackend).
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store could not be reached (no window, storage disabled, ...).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Writing the value would exceed the store's capacity.
    #[error("storage quota exceeded writing {key} ({needed} bytes)")]
    QuotaExceeded { key: String, needed: usize },

    /// The key cannot be represented by this backend.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),

    /// Failed to read or write a file.
    #[error("io error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The browser storage API threw.
    #[error("storage call failed: {0}")]
    Js(String),
}

impl StorageError {
    /// Create an IO error with the given path.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Errors surfaced by the persistence bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The slot holds text that is not valid JSON.
    #[error("corrupt snapshot in slot {key}: {source}")]
    CorruptSnapshot {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    /// A snapshot (or typed state) could not be converted to or from JSON.
    #[error("snapshot encoding error: {0}")]
    Encode(#[from] serde_json::Error),

    /// The host application refused to start.
    #[error("application init failed: {0}")]
    Init(String),

    /// No element matches the configured mount point.
    #[error("mount point not found: #{0}")]
    MountNotFound(String),
}

/// Result type for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
