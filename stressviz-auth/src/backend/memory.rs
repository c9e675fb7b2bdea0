//! In-memory storage partition (for tests and ephemeral runs)

use super::{publish, DEFAULT_EVENT_CAPACITY};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use stressviz_core::{storage_error, KeyValueStore, StorageEvent, StorageEvents, StressvizResult};
use tokio::sync::broadcast;
use tracing::trace;

struct Partition {
    entries: RwLock<HashMap<String, String>>,
    events: broadcast::Sender<StorageEvent>,
    next_handle: AtomicU64,
}

/// Handle onto a process-local key-value partition
pub struct MemoryStore {
    partition: Arc<Partition>,
    handle_id: u64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create an empty partition and return its first handle
    pub fn new() -> Self {
        Self::with_event_capacity(DEFAULT_EVENT_CAPACITY)
    }

    pub fn with_event_capacity(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        let partition = Arc::new(Partition {
            entries: RwLock::new(HashMap::new()),
            events,
            next_handle: AtomicU64::new(1),
        });

        Self {
            partition,
            handle_id: 0,
        }
    }

    /// Open another handle onto the same partition
    pub fn open_handle(&self) -> Self {
        Self {
            partition: Arc::clone(&self.partition),
            handle_id: self.partition.next_handle.fetch_add(1, Ordering::Relaxed),
        }
    }

    pub fn handle_id(&self) -> u64 {
        self.handle_id
    }

    /// Number of keys currently stored
    pub fn len(&self) -> StressvizResult<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> StressvizResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> StressvizResult<RwLockReadGuard<'_, HashMap<String, String>>> {
        self.partition
            .entries
            .read()
            .map_err(|_| storage_error!("Memory partition lock poisoned", "memory_store"))
    }

    fn write(&self) -> StressvizResult<RwLockWriteGuard<'_, HashMap<String, String>>> {
        self.partition
            .entries
            .write()
            .map_err(|_| storage_error!("Memory partition lock poisoned", "memory_store"))
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> StressvizResult<Option<String>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> StressvizResult<()> {
        let mut entries = self.write()?;
        entries.insert(key.to_string(), value.to_string());
        publish(&self.partition.events, key, Some(value), self.handle_id);
        trace!(key, handle = self.handle_id, "Stored value");
        Ok(())
    }

    fn remove(&self, key: &str) -> StressvizResult<()> {
        let mut entries = self.write()?;
        if entries.remove(key).is_some() {
            publish(&self.partition.events, key, None, self.handle_id);
            trace!(key, handle = self.handle_id, "Removed value");
        }
        Ok(())
    }

    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> StressvizResult<bool> {
        let mut entries = self.write()?;
        match apply(entries.get(key).cloned()) {
            Some(value) => {
                publish(&self.partition.events, key, Some(&value), self.handle_id);
                entries.insert(key.to_string(), value);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn subscribe(&self) -> StorageEvents {
        StorageEvents::new(self.partition.events.subscribe(), self.handle_id)
    }
}
