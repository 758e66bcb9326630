//! In-memory storage backend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::broadcast;

use super::{EVENT_CHANNEL_CAPACITY, Storage, StorageError, StorageEvent, StorageOrigin};

/// Process-local storage backed by a shared map.
///
/// Cloning yields the same handle (same origin). Use [`MemoryStorage::handle`]
/// to simulate a second tab over the same data.
#[derive(Clone)]
pub struct MemoryStorage {
    shared: Arc<MemoryShared>,
    origin: StorageOrigin,
}

struct MemoryShared {
    entries: Mutex<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            shared: Arc::new(MemoryShared {
                entries: Mutex::new(HashMap::new()),
                events,
            }),
            origin: StorageOrigin::next(),
        }
    }

    /// Open another handle on the same data with its own origin.
    #[must_use]
    pub fn handle(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            origin: StorageOrigin::next(),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, String>> {
        self.shared
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, key: &str) {
        // No subscribers is fine
        let _ = self.shared.events.send(StorageEvent {
            key: key.to_owned(),
            origin: self.origin,
        });
    }
}

impl Default for MemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStorage")
            .field("origin", &self.origin)
            .field("keys", &self.entries().len())
            .finish()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_owned(), value.to_owned());
        self.notify(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let removed = self.entries().remove(key);
        if removed.is_some() {
            self.notify(key);
        }
        Ok(())
    }

    fn origin(&self) -> StorageOrigin {
        self.origin
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.shared.events.subscribe()
    }
}
