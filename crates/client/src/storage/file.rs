//! File-backed storage backend.
//!
//! Each key is stored in its own file inside the storage directory. Writes go
//! to a temporary file first and are renamed into place so a crash mid-write
//! never leaves a truncated record behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::broadcast;

use super::{
    EVENT_CHANNEL_CAPACITY, Storage, StorageError, StorageEvent, StorageOrigin, validate_key,
};

/// Extension used for stored values.
const VALUE_EXTENSION: &str = "value";

/// Extension used for in-progress writes.
const TEMP_EXTENSION: &str = "tmp";

/// Storage persisted as one file per key.
///
/// Change notifications reach handles opened from the same `FileStorage` via
/// [`FileStorage::handle`]; separate processes re-read on their next load.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: Arc<PathBuf>,
    events: broadcast::Sender<StorageEvent>,
    origin: StorageOrigin,
}

impl FileStorage {
    /// Open (creating if needed) a storage directory.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Io` if the directory cannot be created.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        tracing::debug!(dir = %dir.display(), "Opened file storage");

        Ok(Self {
            dir: Arc::new(dir),
            events,
            origin: StorageOrigin::next(),
        })
    }

    /// Open another handle on the same directory with its own origin.
    #[must_use]
    pub fn handle(&self) -> Self {
        Self {
            dir: Arc::clone(&self.dir),
            events: self.events.clone(),
            origin: StorageOrigin::next(),
        }
    }

    /// Directory holding the stored values.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str, extension: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{extension}")))
    }

    fn notify(&self, key: &str) {
        let _ = self.events.send(StorageEvent {
            key: key.to_owned(),
            origin: self.origin,
        });
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key, VALUE_EXTENSION)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => {
                Err(StorageError::CorruptPersistedState {
                    key: key.to_owned(),
                    reason: e.to_string(),
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key, VALUE_EXTENSION)?;
        let temp = self.path_for(key, TEMP_EXTENSION)?;
        fs::write(&temp, value)?;
        fs::rename(&temp, &path)?;
        self.notify(key);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key, VALUE_EXTENSION)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                self.notify(key);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn origin(&self) -> StorageOrigin {
        self.origin
    }

    fn subscribe(&self) -> broadcast::Receiver<StorageEvent> {
        self.events.subscribe()
    }
}
