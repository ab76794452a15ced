use super::StorageBackend;
use crate::error::StorageError;
use crate::web::js_message;

/// Browser `window.localStorage`
#[derive(Debug, Clone)]
pub struct LocalStorage {
    storage: web_sys::Storage,
}

impl LocalStorage {
    /// Grab the window's LocalStorage, if the browser exposes one
    pub fn from_window() -> Result<Self, StorageError> {
        let window = web_sys::window()
            .ok_or_else(|| StorageError::Unavailable("no window".to_string()))?;
        let storage = window
            .local_storage()
            .map_err(|e| StorageError::Unavailable(js_message(&e)))?
            .ok_or_else(|| StorageError::Unavailable("localStorage disabled".to_string()))?;
        Ok(Self { storage })
    }
}

impl StorageBackend for LocalStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.storage
            .get_item(key)
            .map_err(|e| StorageError::Js(js_message(&e)))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.storage.set_item(key, value).map_err(|e| {
            let message = js_message(&e);
            if message.contains("QuotaExceeded") || message.contains("quota") {
                StorageError::QuotaExceeded {
                    key: key.to_string(),
                    needed: key.len() + value.len(),
                }
            } else {
                StorageError::Js(message)
            }
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.storage
            .remove_item(key)
            .map_err(|e| StorageError::Js(js_message(&e)))
    }
}
