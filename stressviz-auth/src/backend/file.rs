//! File-backed storage partition
//!
//! One file per key (`<root>/<key>.json`) holding the raw value text. Writes go
//! to a temporary file first and are renamed into place, so a reader never
//! sees a half-written value.
//!
//! Handles opened with [`FileStore::open_handle`] share a write lock, which
//! makes [`KeyValueStore::update`] atomic for them. Separate OS processes
//! pointing at the same directory are not serialized against each other.

use super::{publish, DEFAULT_EVENT_CAPACITY};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use stressviz_core::{
    storage_error, validation_error, KeyValueStore, StorageEvent, StorageEvents, StressvizError,
    StressvizResult,
};
use tokio::sync::broadcast;
use tracing::{debug, info};

struct Directory {
    root: PathBuf,
    write_lock: Mutex<()>,
    events: broadcast::Sender<StorageEvent>,
    next_handle: AtomicU64,
}

/// Handle onto a directory-backed key-value partition
pub struct FileStore {
    dir: Arc<Directory>,
    handle_id: u64,
}

impl FileStore {
    /// Open (creating if needed) the partition rooted at `root`
    pub fn open<P: AsRef<Path>>(root: P) -> StressvizResult<Self> {
        let root = root.as_ref().to_path_buf();

        std::fs::create_dir_all(&root).map_err(|e| StressvizError::Storage {
            message: format!("Failed to create storage directory {}", root.display()),
            source: Some(Box::new(e)),
            context: stressviz_core::ErrorContext::new("file_store")
                .with_operation("open")
                .with_metadata("path", &root.display().to_string())
                .with_suggestion("Check that the parent directory is writable"),
        })?;

        info!("File storage initialized at: {}", root.display());

        let (events, _) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Ok(Self {
            dir: Arc::new(Directory {
                root,
                write_lock: Mutex::new(()),
                events,
                next_handle: AtomicU64::new(1),
            }),
            handle_id: 0,
        })
    }

    /// Open another handle onto the same directory
    pub fn open_handle(&self) -> Self {
        Self {
            dir: Arc::clone(&self.dir),
            handle_id: self.dir.next_handle.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn handle_id(&self) -> u64 {
        self.handle_id
    }

    pub fn root(&self) -> &Path {
        &self.dir.root
    }

    fn path_for(&self, key: &str) -> StressvizResult<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));

        if !valid {
            return Err(validation_error!(
                format!("Invalid storage key: {:?}", key),
                "key",
                "file_store"
            ));
        }

        Ok(self.dir.root.join(format!("{}.json", key)))
    }

    fn lock(&self) -> StressvizResult<MutexGuard<'_, ()>> {
        self.dir
            .write_lock
            .lock()
            .map_err(|_| storage_error!("File store write lock poisoned", "file_store"))
    }

    fn read_value(path: &Path) -> StressvizResult<Option<String>> {
        match std::fs::read_to_string(path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error!(
                format!("Failed to read {}", path.display()),
                "file_store",
                e
            )),
        }
    }

    fn write_value(path: &Path, value: &str) -> StressvizResult<()> {
        let tmp = path.with_extension(format!("json.{}.tmp", std::process::id()));

        std::fs::write(&tmp, value).map_err(|e| {
            storage_error!(format!("Failed to write {}", tmp.display()), "file_store", e)
        })?;
        std::fs::rename(&tmp, path).map_err(|e| {
            storage_error!(
                format!("Failed to move {} into place", tmp.display()),
                "file_store",
                e
            )
        })?;

        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> StressvizResult<Option<String>> {
        let path = self.path_for(key)?;
        Self::read_value(&path)
    }

    fn set(&self, key: &str, value: &str) -> StressvizResult<()> {
        let path = self.path_for(key)?;
        let _guard = self.lock()?;

        Self::write_value(&path, value)?;
        publish(&self.dir.events, key, Some(value), self.handle_id);
        Ok(())
    }

    fn remove(&self, key: &str) -> StressvizResult<()> {
        let path = self.path_for(key)?;
        let _guard = self.lock()?;

        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!("Deleted {}", path.display());
                publish(&self.dir.events, key, None, self.handle_id);
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error!(
                format!("Failed to delete {}", path.display()),
                "file_store",
                e
            )),
        }
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> StressvizResult<bool> {
        let path = self.path_for(key)?;
        let _guard = self.lock()?;

        match apply(Self::read_value(&path)?) {
            Some(value) => {
                Self::write_value(&path, &value)?;
                publish(&self.dir.events, key, Some(&value), self.handle_id);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn subscribe(&self) -> StorageEvents {
        StorageEvents::new(self.dir.events.subscribe(), self.handle_id)
    }
}
