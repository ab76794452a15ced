//! Host application boundary
//!
//! The bridge knows two things about the app it boots: how to start it, and
//! where it announces new save states. Everything else is the app's business.

use crate::error::Result;
use crate::persistence::Port;
use crate::snapshot::{InitialFlags, Snapshot};

/// Element id the app is mounted into by default
pub const DEFAULT_MOUNT_ID: &str = "main";

/// Where the running app attaches its output. Opaque to the bridge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountPoint {
    id: String,
}

impl MountPoint {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl Default for MountPoint {
    fn default() -> Self {
        Self::new(DEFAULT_MOUNT_ID)
    }
}

/// An application the bridge can start.
pub trait Application {
    type Instance: AppInstance;

    /// Start the app on `mount` with the restored snapshot (`None` on first run)
    fn init(self, mount: &MountPoint, flags: InitialFlags) -> Result<Self::Instance>;
}

/// A running application.
pub trait AppInstance {
    /// Port on which the app publishes every state it wants saved
    fn save_port(&self) -> &Port<Snapshot>;
}
