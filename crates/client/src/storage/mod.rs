//! Durable client-side key-value storage.
//!
//! Both the session credentials and the cart snapshot are mirrored into a
//! [`Storage`] backend under fixed keys (see [`keys`]). Backends broadcast a
//! [`StorageEvent`] after every write or removal so that other handles sharing
//! the same backing store ("tabs") can re-read the affected key.
//!
//! # Backends
//!
//! - [`MemoryStorage`] - process-local map, used for tests and embedding
//! - [`FileStorage`] - one file per key in a directory, used by the CLI

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::broadcast;

/// Capacity of the change notification channel.
pub(crate) const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Fixed storage keys.
pub mod keys {
    /// Key for the bearer access token.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Key for the refresh token.
    pub const REFRESH_TOKEN: &str = "refresh_token";

    /// Key for the serialized cart snapshot.
    pub const CART: &str = "cart";
}

/// Errors that can occur when reading or writing durable storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Key contains characters that cannot be stored.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// A persisted record exists but could not be decoded.
    #[error("corrupt persisted state under '{key}': {reason}")]
    CorruptPersistedState {
        /// Storage key of the corrupt record.
        key: String,
        /// Decoder error message.
        reason: String,
    },
}

/// Identity of one storage handle.
///
/// Handles created with `handle()` share data but get a fresh origin, which is
/// how a listener tells its own writes apart from another tab's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StorageOrigin(u64);

impl StorageOrigin {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Change notification emitted after a key is written or removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    /// Key that changed.
    pub key: String,
    /// Handle that performed the change.
    pub origin: StorageOrigin,
}

/// Durable per-origin key-value storage.
///
/// Operations are synchronous: cart mutations persist inside the call that
/// applied them.
pub trait Storage: Send + Sync + 'static {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Origin stamped on events produced by this handle.
    fn origin(&self) -> StorageOrigin;

    /// Subscribe to change notifications from every handle on the same store.
    fn subscribe(&self) -> broadcast::Receiver<StorageEvent>;
}

/// Validate that a key is safe to use as a file name.
pub(crate) fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(())
    } else {
        Err(StorageError::InvalidKey(key.to_owned()))
    }
}
