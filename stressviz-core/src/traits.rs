//! Core trait definitions

use crate::error::StressvizResult;
use crate::types::StorageEvent;
use tokio::sync::broadcast;
use tracing::warn;

/// Durable string-keyed storage area (one "storage partition").
///
/// Reads and writes are synchronous and atomic from the caller's point of
/// view. Several handles may share one partition; each handle reports the
/// writes made through the *other* handles via [`KeyValueStore::subscribe`].
pub trait KeyValueStore: Send + Sync {
    /// Read the value stored under `key`
    fn get(&self, key: &str) -> StressvizResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&self, key: &str, value: &str) -> StressvizResult<()>;

    /// Remove `key`; removing an absent key is not an error
    fn remove(&self, key: &str) -> StressvizResult<()>;

    /// Atomic read-modify-write of a single key.
    ///
    /// `apply` receives the current value and returns the value to store, or
    /// `None` to leave the key untouched. No other write to the partition can
    /// interleave between the read and the write. Returns whether a write
    /// happened.
    fn update(
        &self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> StressvizResult<bool>;

    /// Change notifications for writes made through other handles
    fn subscribe(&self) -> StorageEvents;
}

/// Stream of [`StorageEvent`]s that skips the subscribing handle's own writes
pub struct StorageEvents {
    receiver: broadcast::Receiver<StorageEvent>,
    own_writer: u64,
}

impl StorageEvents {
    pub fn new(receiver: broadcast::Receiver<StorageEvent>, own_writer: u64) -> Self {
        Self {
            receiver,
            own_writer,
        }
    }

    /// Wait for the next foreign write or a report of missed writes.
    /// Returns `None` once the partition is gone.
    pub async fn next_notice(&mut self) -> Option<StorageNotice> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.writer == self.own_writer => continue,
                Ok(event) => return Some(StorageNotice::Write(event)),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Storage event subscriber lagged behind");
                    return Some(StorageNotice::Missed(skipped));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next foreign write, passing over missed ones.
    /// Returns `None` once the partition is gone.
    pub async fn recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.next_notice().await? {
                StorageNotice::Write(event) => return Some(event),
                StorageNotice::Missed(_) => continue,
            }
        }
    }

    /// Non-blocking variant of [`StorageEvents::recv`]
    pub fn try_recv(&mut self) -> Option<StorageEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) if event.writer == self.own_writer => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "Storage event subscriber lagged behind");
                    continue;
                }
                Err(_) => return None,
            }
        }
    }
}

/// What a [`StorageEvents`] subscriber sees next
#[derive(Debug, Clone, PartialEq)]
pub enum StorageNotice {
    /// A write made through another handle
    Write(StorageEvent),
    /// The subscriber fell behind and this many writes were dropped
    Missed(u64),
}
