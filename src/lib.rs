//! Shuffle Bridge - keeps a web app's save state across page loads
//!
//! Core modules:
//! - `persistence`: The bridge (load on start, save on every port message)
//! - `platform`: Storage backends (LocalStorage on web, files on native)
//! - `snapshot`: Opaque JSON save state
//! - `app`: What the bridge needs from the app it boots
//! - `settings`: Storage key, mount point, corrupt-save policy
//! - `web`: Browser entry point for Elm-style app modules

pub mod app;
pub mod error;
pub mod persistence;
pub mod platform;
pub mod settings;
pub mod snapshot;
#[cfg(target_arch = "wasm32")]
pub mod web;

pub use app::{AppInstance, Application, MountPoint};
pub use error::{BridgeError, StorageError};
pub use persistence::{BridgeState, PersistenceBridge, Port, Running, WriteStats};
pub use platform::StorageBackend;
pub use settings::{BridgeConfig, CorruptPolicy, STORAGE_KEY};
pub use snapshot::{InitialFlags, Snapshot};
