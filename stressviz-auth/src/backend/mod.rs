//! Storage partitions
//!
//! Each backend implements [`stressviz_core::KeyValueStore`]. A backend value
//! is one handle; `open_handle` gives another handle onto the same partition,
//! which is how several independent consumers (browser tabs, in the web
//! original) share one set of accounts.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use stressviz_core::StorageEvent;
use tokio::sync::broadcast;

/// Capacity of a partition's change broadcast
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

fn publish(
    events: &broadcast::Sender<StorageEvent>,
    key: &str,
    new_value: Option<&str>,
    writer: u64,
) {
    // No receivers is the common case
    let _ = events.send(StorageEvent {
        key: key.to_string(),
        new_value: new_value.map(str::to_string),
        writer,
    });
}
