//! Counter storage
//!
//! Key → `i64` counters behind a [`CounterStore`] trait with two backends:
//!
//! - [`MemoryStore`]: concurrent map, lock-free accumulation, lost on restart
//! - [`FileStore`]: buffered writes merged into a JSON snapshot on a fixed tick
//!
//! A missing key always reads as `0`.

pub mod file;
pub mod memory;

use std::sync::Arc;
use tracing::info;

use crate::config::{StorageConfig, StorageEngine};
use crate::errors::AppResult;

pub use file::{FileStore, SetSemantics};
pub use memory::MemoryStore;

/// Interface shared by every counter backend
pub trait CounterStore: Send + Sync {
    /// Prepare the backend (load snapshot, start background work)
    fn init(&self) -> AppResult<()>;

    /// Read a counter, `0` when absent
    fn get(&self, key: &str) -> i64;

    /// Overwrite a counter
    fn set(&self, key: &str, value: i64);

    /// Add `delta` to a counter, creating it at `0` first if needed
    fn add(&self, key: &str, delta: i64);

    /// Remove a counter
    fn del(&self, key: &str);

    /// Persist anything pending and release resources
    fn close(&self) -> AppResult<()>;
}

/// Build and initialise the backend selected by configuration
pub fn open_store(config: &StorageConfig) -> AppResult<Arc<dyn CounterStore>> {
    let store: Arc<dyn CounterStore> = match config.engine {
        StorageEngine::Memory => Arc::new(MemoryStore::new()),
        StorageEngine::File => Arc::new(FileStore::new(
            config.resolved_path()?,
            config.flush_interval(),
            config.set_semantics,
        )),
    };

    store.init()?;
    info!(engine = ?config.engine, "Counter store initialised");
    Ok(store)
}
