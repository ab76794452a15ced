//! Platform abstraction layer
//!
//! Key-value text storage behind one small trait, so the bridge never touches
//! a process-wide handle directly:
//! - `MemoryStorage`: in-process map (tests, headless hosts)
//! - `FileStorage`: one file per key in a directory (native)
//! - `LocalStorage`: browser `window.localStorage` (wasm32)

mod memory;
pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
mod file;
#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

#[cfg(target_arch = "wasm32")]
mod local_storage;
#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorage;

use crate::error::StorageError;

/// A key-value store holding text values.
///
/// Methods take `&self`; implementations provide their own interior
/// mutability so a cloned handle can be moved into a save handler.
pub trait StorageBackend {
    /// Read the value under `key`, `None` if nothing is stored there.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the value under `key`.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
