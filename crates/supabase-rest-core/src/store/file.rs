use std::fs;
use std::path::{Path, PathBuf};

use super::{
    ContextId, EventScope, SessionStore, StorageBus, StorageEvent, StorageHandler, Subscription,
    TokenBundle, DEFAULT_STORAGE_KEY,
};
use crate::error::RestError;

/// Token bundle persisted to a JSON file.
///
/// Contexts in the same process share change notifications by sharing a
/// [`StorageBus`] (see [`with_bus`](Self::with_bus)).
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
    key: String,
    context: ContextId,
    bus: StorageBus,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_bus(path, StorageBus::new())
    }

    /// Open a context on `path` that publishes on an existing bus.
    pub fn with_bus(path: impl Into<PathBuf>, bus: StorageBus) -> Self {
        Self {
            path: path.into(),
            key: DEFAULT_STORAGE_KEY.to_string(),
            context: ContextId::next(),
            bus,
        }
    }

    pub fn key_name(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn bus(&self) -> &StorageBus {
        &self.bus
    }

    fn write(&self, raw: &str) -> Result<(), RestError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        // Write-then-rename keeps readers from seeing a torn file.
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn publish(&self, new_value: Option<String>, scope: EventScope) {
        self.bus.publish(&StorageEvent {
            key: self.key.clone(),
            new_value,
            origin: self.context,
            scope,
        });
    }
}

impl SessionStore for FileSessionStore {
    fn key(&self) -> &str {
        &self.key
    }

    fn save(&self, bundle: &TokenBundle) {
        let raw = match bundle.to_storage_string() {
            Ok(raw) => raw,
            Err(e) => {
                tracing::error!("Failed to serialize token bundle: {e}");
                return;
            }
        };
        if let Err(e) = self.write(&raw) {
            tracing::error!(path = %self.path.display(), "Failed to persist token bundle: {e}");
            return;
        }
        tracing::debug!(path = %self.path.display(), "Token bundle saved");
        self.publish(Some(raw), EventScope::Broadcast);
    }

    fn load(&self) -> Option<TokenBundle> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => TokenBundle::from_storage_str(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                tracing::warn!(path = %self.path.display(), "Failed to read token bundle: {e}");
                None
            }
        }
    }

    fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "Token bundle cleared");
                self.publish(None, EventScope::Broadcast);
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::error!(path = %self.path.display(), "Failed to remove token bundle: {e}")
            }
        }
    }

    fn subscribe(&self, handler: StorageHandler) -> Subscription {
        self.bus.subscribe(self.context, handler)
    }

    fn notify_local(&self, new_value: Option<String>) {
        self.publish(new_value, EventScope::Local);
    }
}
