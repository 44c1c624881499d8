use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use super::{
    ContextId, EventScope, SessionStore, StorageBus, StorageEvent, StorageHandler, Subscription,
    TokenBundle, DEFAULT_STORAGE_KEY,
};

/// In-process key/value storage shared by any number of contexts.
///
/// Plays the role a browser origin's local storage plays for its tabs:
/// every [`MemorySessionStore`] opened from the same `SharedStorage` sees
/// the same values and is notified of the others' writes.
#[derive(Debug, Clone, Default)]
pub struct SharedStorage {
    values: Arc<RwLock<HashMap<String, String>>>,
    bus: StorageBus,
}

impl SharedStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new context on this storage using the default key.
    pub fn context(&self) -> MemorySessionStore {
        self.context_with_key(DEFAULT_STORAGE_KEY)
    }

    /// Open a new context on this storage using a custom key.
    pub fn context_with_key(&self, key: impl Into<String>) -> MemorySessionStore {
        MemorySessionStore {
            storage: self.clone(),
            context: ContextId::next(),
            key: key.into(),
        }
    }

    pub fn bus(&self) -> &StorageBus {
        &self.bus
    }

    /// Raw access, e.g. to plant a value written by "another process".
    pub fn set_raw(&self, key: &str, value: &str) {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
    }

    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.values
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn remove_raw(&self, key: &str) -> Option<String> {
        self.values
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }
}

/// One context's handle on a [`SharedStorage`].
#[derive(Debug, Clone)]
pub struct MemorySessionStore {
    storage: SharedStorage,
    context: ContextId,
    key: String,
}

impl MemorySessionStore {
    /// A store backed by its own private storage.
    pub fn new() -> Self {
        SharedStorage::new().context()
    }

    pub fn context_id(&self) -> ContextId {
        self.context
    }

    pub fn storage(&self) -> &SharedStorage {
        &self.storage
    }

    fn publish(&self, new_value: Option<String>, scope: EventScope) {
        self.storage.bus.publish(&StorageEvent {
            key: self.key.clone(),
            new_value,
            origin: self.context,
            scope,
        });
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore for MemorySessionStore {
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
        self.storage.set_raw(&self.key, &raw);
        tracing::debug!(context = %self.context, "Token bundle saved");
        self.publish(Some(raw), EventScope::Broadcast);
    }

    fn load(&self) -> Option<TokenBundle> {
        self.storage
            .get_raw(&self.key)
            .and_then(|raw| TokenBundle::from_storage_str(&raw))
    }

    fn clear(&self) {
        if self.storage.remove_raw(&self.key).is_some() {
            tracing::debug!(context = %self.context, "Token bundle cleared");
            self.publish(None, EventScope::Broadcast);
        }
    }

    fn subscribe(&self, handler: StorageHandler) -> Subscription {
        self.storage.bus.subscribe(self.context, handler)
    }

    fn notify_local(&self, new_value: Option<String>) {
        self.publish(new_value, EventScope::Local);
    }
}
