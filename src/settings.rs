//! Bridge configuration
//!
//! Which slot to use, where to mount, and what to do with unreadable saves.

use serde::{Deserialize, Serialize};

use crate::app::{DEFAULT_MOUNT_ID, MountPoint};

/// Storage key for saves. The `-v1` suffix is the schema version: bump it when
/// the app's snapshot shape changes incompatibly and old saves are orphaned.
pub const STORAGE_KEY: &str = "shuffle-save-v1";

/// What to do when the slot holds text that is not valid JSON
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CorruptPolicy {
    /// Refuse to start; the caller sees the parse error
    #[default]
    Fail,
    /// Log it and start as if nothing was saved
    Discard,
}

impl CorruptPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            CorruptPolicy::Fail => "fail",
            CorruptPolicy::Discard => "discard",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "fail" | "error" => Some(CorruptPolicy::Fail),
            "discard" | "ignore" => Some(CorruptPolicy::Discard),
            _ => None,
        }
    }
}

/// Bridge settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Key of the storage slot
    pub storage_key: String,
    /// Element id to mount the app into
    pub mount_id: String,
    pub on_corrupt: CorruptPolicy,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            storage_key: STORAGE_KEY.to_string(),
            mount_id: DEFAULT_MOUNT_ID.to_string(),
            on_corrupt: CorruptPolicy::default(),
        }
    }
}

impl BridgeConfig {
    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn with_mount_id(mut self, id: impl Into<String>) -> Self {
        self.mount_id = id.into();
        self
    }

    pub fn with_on_corrupt(mut self, policy: CorruptPolicy) -> Self {
        self.on_corrupt = policy;
        self
    }

    pub fn mount_point(&self) -> MountPoint {
        MountPoint::new(self.mount_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.storage_key, "shuffle-save-v1");
        assert_eq!(config.mount_point().id(), "main");
        assert_eq!(config.on_corrupt, CorruptPolicy::Fail);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(CorruptPolicy::from_str("FAIL"), Some(CorruptPolicy::Fail));
        assert_eq!(CorruptPolicy::from_str("ignore"), Some(CorruptPolicy::Discard));
        assert_eq!(CorruptPolicy::from_str("retry"), None);
        assert_eq!(
            CorruptPolicy::from_str(CorruptPolicy::Discard.as_str()),
            Some(CorruptPolicy::Discard)
        );
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: BridgeConfig = serde_json::from_str(r#"{"on_corrupt":"discard"}"#).unwrap();
        assert_eq!(config.on_corrupt, CorruptPolicy::Discard);
        assert_eq!(config.storage_key, STORAGE_KEY);
    }
}
