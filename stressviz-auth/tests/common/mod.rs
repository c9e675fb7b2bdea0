//! Shared setup for workflow tests

use std::sync::{Arc, Once};
use stressviz_auth::{AuthOptions, AuthService, FileStore};
use tempfile::TempDir;

static INIT: Once = Once::new();

/// Initialize logging for tests
pub fn init_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("stressviz_auth=debug,warn")
            .with_test_writer()
            .try_init();
    });
}

/// A file-backed partition living in a temporary directory
pub struct TestPartition {
    pub dir: TempDir,
    pub store: FileStore,
}

impl TestPartition {
    pub fn new() -> Self {
        init_logging();
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = FileStore::open(dir.path()).expect("Failed to open file store");
        Self { dir, store }
    }

    /// A fresh service over its own handle, like opening another tab
    pub fn open_tab(&self) -> Arc<AuthService> {
        Arc::new(AuthService::new(
            Arc::new(self.store.open_handle()),
            AuthOptions::instant(),
        ))
    }

    /// A service over a brand new store instance, like restarting the app
    pub fn reopen(&self) -> Arc<AuthService> {
        let store = FileStore::open(self.dir.path()).expect("Failed to reopen file store");
        Arc::new(AuthService::new(Arc::new(store), AuthOptions::instant()))
    }
}
