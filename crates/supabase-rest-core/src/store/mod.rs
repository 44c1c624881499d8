//! Session storage: one persisted token bundle plus change notification
//! across execution contexts.
//!
//! A *context* is anything that would be a browser tab in a web app: an
//! independent holder of a store handle that shares the underlying storage
//! with its siblings. Writes broadcast a [`StorageEvent`] to every other
//! context over a [`StorageBus`]; the writer itself is not notified unless
//! it asks for it with [`SessionStore::notify_local`].

mod bus;
mod file;
mod memory;

pub use bus::{StorageBus, StorageHandler, Subscription};
pub use file::FileSessionStore;
pub use memory::{MemorySessionStore, SharedStorage};

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Storage key the token bundle lives under by default.
pub const DEFAULT_STORAGE_KEY: &str = "supabase.auth.token";

/// The persisted auth tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBundle {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: String,
    /// Expiry as unix seconds. `None` never expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
}

impl TokenBundle {
    pub fn new(
        access_token: impl Into<String>,
        refresh_token: impl Into<String>,
        expires_at: Option<i64>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_at,
        }
    }

    /// Whether the bundle expired strictly before `now` (unix seconds).
    pub fn is_expired_at(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(at) if at < now)
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(chrono::Utc::now().timestamp())
    }

    /// Serialized form written to storage.
    pub fn to_storage_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parse a stored value. Malformed data and empty access tokens are
    /// treated as "no bundle".
    ///
    /// Stores load on every request, so an unreadable value is reported at
    /// `warn` once and at `debug` on every later load of the same value.
    pub fn from_storage_str(raw: &str) -> Option<Self> {
        match serde_json::from_str::<TokenBundle>(raw) {
            Ok(bundle) if !bundle.access_token.is_empty() => Some(bundle),
            Ok(_) => {
                report_unreadable(raw, "empty access token");
                None
            }
            Err(e) => {
                report_unreadable(raw, &e.to_string());
                None
            }
        }
    }
}

fn report_unreadable(raw: &str, reason: &str) {
    const REMEMBERED: usize = 32;
    static REPORTED: Mutex<Vec<u64>> = Mutex::new(Vec::new());

    let mut hasher = DefaultHasher::new();
    raw.hash(&mut hasher);
    let fingerprint = hasher.finish();

    let first_sighting = match REPORTED.lock() {
        Ok(mut seen) if !seen.contains(&fingerprint) => {
            if seen.len() >= REMEMBERED {
                seen.remove(0);
            }
            seen.push(fingerprint);
            true
        }
        Ok(_) => false,
        Err(_) => true,
    };
    if first_sighting {
        tracing::warn!("Ignoring unreadable stored token bundle: {reason}");
    } else {
        tracing::debug!("Ignoring unreadable stored token bundle: {reason}");
    }
}

/// Identity of one execution context sharing a storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a fresh, process-unique context id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ctx-{}", self.0)
    }
}

/// Who an event is delivered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventScope {
    /// Every context except the origin.
    Broadcast,
    /// Only the origin context.
    Local,
}

/// A change to a storage key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: String,
    /// The new serialized value, `None` when the key was removed.
    pub new_value: Option<String>,
    pub origin: ContextId,
    pub scope: EventScope,
}

/// Persistence for the current token bundle.
///
/// Implementations never surface errors: storage is assumed available,
/// and unreadable data is reported as `None`.
pub trait SessionStore: Send + Sync + fmt::Debug {
    /// The key events are published under.
    fn key(&self) -> &str;

    /// Persist the bundle and broadcast the new value to other contexts.
    fn save(&self, bundle: &TokenBundle);

    /// Read the stored bundle, if any.
    fn load(&self) -> Option<TokenBundle>;

    /// Remove the bundle; broadcasts only if something was removed.
    fn clear(&self);

    /// Listen for changes made by other contexts.
    fn subscribe(&self, handler: StorageHandler) -> Subscription;

    /// Deliver a synthesized event to this context's own subscribers.
    fn notify_local(&self, new_value: Option<String>);
}
