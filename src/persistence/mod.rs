//! Save/load persistence for the host app
//!
//! Features:
//! - Restore the last snapshot from the storage slot on boot
//! - Hand it to the app as init flags (`None` on first run)
//! - Write every snapshot the app publishes back to the slot (last write wins)
//! - Corrupt-save policy (fail or discard)
//!
//! Persistence is best-effort once the app is running: a failed write is
//! logged and counted, never propagated into the app.

mod port;
pub use port::Port;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::Receiver;

use crate::app::{AppInstance, Application};
use crate::error::{BridgeError, Result, StorageError};
use crate::platform::StorageBackend;
use crate::settings::{BridgeConfig, CorruptPolicy};
use crate::snapshot::{InitialFlags, Snapshot};

/// Lifecycle of a bridge. `Running` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeState {
    Uninitialized,
    Running,
}

/// Counters for save-path writes. Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct WriteStats {
    writes: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
}

impl WriteStats {
    /// Snapshots successfully written
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Write attempts the backend rejected
    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }
}

/// The storage slot plus its counters; shared by the bridge and its save handler.
#[derive(Debug, Clone)]
struct Slot<S> {
    storage: S,
    key: String,
    stats: WriteStats,
}

impl<S: StorageBackend> Slot<S> {
    fn write(&self, snapshot: &Snapshot) -> std::result::Result<(), StorageError> {
        let text = snapshot.to_text();
        match self.storage.set(&self.key, &text) {
            Ok(()) => {
                self.stats.writes.fetch_add(1, Ordering::Relaxed);
                log::debug!("Saved snapshot to {} ({} bytes)", self.key, text.len());
                Ok(())
            }
            Err(e) => {
                self.stats.failures.fetch_add(1, Ordering::Relaxed);
                log::error!("Failed to save snapshot to {}: {}", self.key, e);
                Err(e)
            }
        }
    }
}

/// Connects an app's save/load lifecycle to a storage backend.
#[derive(Debug)]
pub struct PersistenceBridge<S> {
    slot: Slot<S>,
    config: BridgeConfig,
}

impl<S: StorageBackend + Clone + 'static> PersistenceBridge<S> {
    pub fn new(storage: S, config: BridgeConfig) -> Self {
        Self {
            slot: Slot {
                storage,
                key: config.storage_key.clone(),
                stats: WriteStats::default(),
            },
            config,
        }
    }

    pub fn state(&self) -> BridgeState {
        BridgeState::Uninitialized
    }

    pub fn config(&self) -> &BridgeConfig {
        &self.config
    }

    pub fn stats(&self) -> &WriteStats {
        &self.slot.stats
    }

    /// Read the slot: `Ok(None)` if nothing (or an empty string) is stored,
    /// the snapshot if it parses.
    ///
    /// Unparseable text is an error under [`CorruptPolicy::Fail`] and reads as
    /// empty under [`CorruptPolicy::Discard`]. The slot itself is left alone
    /// either way.
    pub fn load(&self) -> Result<InitialFlags> {
        let key = &self.slot.key;
        let Some(text) = self.slot.storage.get(key)? else {
            log::info!("No saved state in {}, starting fresh", key);
            return Ok(None);
        };
        if text.is_empty() {
            log::info!("Saved state in {} is empty, starting fresh", key);
            return Ok(None);
        }

        match Snapshot::from_text(&text) {
            Ok(snapshot) => {
                log::info!("Loaded saved state from {} ({} bytes)", key, text.len());
                Ok(Some(snapshot))
            }
            Err(source) => match self.config.on_corrupt {
                CorruptPolicy::Fail => Err(BridgeError::CorruptSnapshot {
                    key: key.clone(),
                    source,
                }),
                CorruptPolicy::Discard => {
                    log::warn!("Ignoring corrupt saved state in {}: {}", key, source);
                    Ok(None)
                }
            },
        }
    }

    /// Write one snapshot to the slot, replacing whatever was there
    pub fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        self.slot.write(snapshot)?;
        Ok(())
    }

    /// Delete the saved snapshot
    pub fn clear(&self) -> Result<()> {
        self.slot.storage.remove(&self.slot.key)?;
        log::info!("Cleared saved state in {}", self.slot.key);
        Ok(())
    }

    /// Drain snapshots from a channel until every sender is gone.
    ///
    /// For hosts that publish saves from several threads: all writes happen
    /// here, one at a time, in arrival order. Returns how many were received.
    pub fn serve(&self, saves: Receiver<Snapshot>) -> u64 {
        let mut received = 0;
        for snapshot in saves {
            received += 1;
            // Failures are already logged and counted
            let _ = self.slot.write(&snapshot);
        }
        log::info!("Save channel closed after {} snapshots", received);
        received
    }

    /// Load the saved state, start the app with it, and persist every
    /// snapshot the app publishes from then on.
    ///
    /// The app is not started if loading fails.
    pub fn start<A: Application>(self, app: A) -> Result<Running<A::Instance, S>> {
        let flags = self.load()?;
        let mount = self.config.mount_point();

        let instance = app.init(&mount, flags)?;
        log::info!("App mounted on #{}", mount.id());

        let slot = self.slot.clone();
        instance.save_port().subscribe(move |snapshot| {
            let _ = slot.write(snapshot);
        });

        Ok(Running {
            instance,
            slot: self.slot,
        })
    }
}

/// A started app with its save subscription in place.
#[derive(Debug)]
pub struct Running<I, S> {
    instance: I,
    slot: Slot<S>,
}

impl<I: AppInstance, S: StorageBackend> Running<I, S> {
    pub fn state(&self) -> BridgeState {
        BridgeState::Running
    }

    pub fn instance(&self) -> &I {
        &self.instance
    }

    pub fn instance_mut(&mut self) -> &mut I {
        &mut self.instance
    }

    pub fn stats(&self) -> &WriteStats {
        &self.slot.stats
    }

    pub fn storage_key(&self) -> &str {
        &self.slot.key
    }

    pub fn storage(&self) -> &S {
        &self.slot.storage
    }
}
