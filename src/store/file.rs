//! File-backed counter store
//!
//! Writes land in an in-memory buffer and never touch the disk directly. A
//! background ticker merges the buffer into the on-disk JSON snapshot every
//! `flush_interval`, then reloads the snapshot into the read path. `get`
//! only sees flushed values.
//!
//! Lifecycle: `Uninitialized → Loaded → (Flushing → Loaded)* → Closed`.

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::CounterStore;
use crate::errors::{AppError, AppResult};

/// How a buffered `set` is applied when merged into the snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SetSemantics {
    /// Last `set` wins; later `add`s accumulate on top of it
    #[default]
    Assign,
    /// `set` is buffered like `add` and summed into the on-disk value
    Additive,
}

/// One buffered change for a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Delta(i64),
    Assign(i64),
    Remove,
}

impl Pending {
    /// Compose `self` followed by `next`
    fn then(self, next: Pending) -> Pending {
        match (self, next) {
            (_, Pending::Assign(value)) => Pending::Assign(value),
            (_, Pending::Remove) => Pending::Remove,
            (Pending::Delta(a), Pending::Delta(b)) => Pending::Delta(a.wrapping_add(b)),
            (Pending::Assign(a), Pending::Delta(b)) => Pending::Assign(a.wrapping_add(b)),
            (Pending::Remove, Pending::Delta(b)) => Pending::Assign(b),
        }
    }

    fn apply(self, existing: Option<i64>) -> Option<i64> {
        match self {
            Pending::Delta(delta) => Some(existing.unwrap_or(0).wrapping_add(delta)),
            Pending::Assign(value) => Some(value),
            Pending::Remove => None,
        }
    }
}

const STATE_UNINITIALIZED: u8 = 0;
const STATE_LOADED: u8 = 1;
const STATE_CLOSED: u8 = 2;

struct Inner {
    path: PathBuf,
    set_semantics: SetSemantics,
    snapshot: RwLock<HashMap<String, i64>>,
    pending: Mutex<HashMap<String, Pending>>,
    flush_lock: Mutex<()>,
    state: AtomicU8,
}

struct Ticker {
    stop: flume::Sender<()>,
    handle: JoinHandle<()>,
}

/// Counter store persisted to a single JSON file
pub struct FileStore {
    inner: Arc<Inner>,
    flush_interval: Duration,
    ticker: Mutex<Option<Ticker>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>, flush_interval: Duration, set_semantics: SetSemantics) -> Self {
        Self {
            inner: Arc::new(Inner {
                path: path.into(),
                set_semantics,
                snapshot: RwLock::new(HashMap::new()),
                pending: Mutex::new(HashMap::new()),
                flush_lock: Mutex::new(()),
                state: AtomicU8::new(STATE_UNINITIALIZED),
            }),
            flush_interval,
            ticker: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.inner.path
    }

    /// Merge buffered writes into the file now instead of waiting for the tick
    pub fn flush(&self) -> AppResult<()> {
        self.inner.flush()
    }

    /// Number of keys with buffered, unflushed changes
    pub fn pending_len(&self) -> usize {
        self.inner.pending.lock().len()
    }

    /// Queue a change; `false` when the store is already closed
    fn buffer(&self, key: &str, op: Pending) -> bool {
        // close() flips the state under this lock, so a write either lands
        // before the final flush drains the buffer or is rejected
        let mut pending = self.inner.pending.lock();
        if self.inner.state.load(Ordering::Acquire) == STATE_CLOSED {
            drop(pending);
            warn!(key, "Counter write after close ignored");
            return false;
        }

        let merged = match pending.remove(key) {
            Some(existing) => existing.then(op),
            None => op,
        };
        pending.insert(key.to_string(), merged);
        true
    }

    /// Mark closed under the buffer lock, returning the previous state
    fn mark_closed(&self) -> u8 {
        let _pending = self.inner.pending.lock();
        self.inner.state.swap(STATE_CLOSED, Ordering::AcqRel)
    }

    fn start_ticker(&self) -> AppResult<()> {
        let (stop, stop_rx) = flume::bounded::<()>(1);
        let inner = Arc::clone(&self.inner);
        let interval = self.flush_interval;

        let handle = std::thread::Builder::new()
            .name("counter-flush".to_string())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(flume::RecvTimeoutError::Timeout) => {
                        if let Err(e) = inner.flush() {
                            error!(
                                error = %e,
                                category = e.category(),
                                "Counter flush failed, buffered values kept for the next tick"
                            );
                        }
                    }
                    _ => break,
                }
            })
            .map_err(|e| AppError::storage_with_source(&self.inner.path, "spawn flush ticker", e))?;

        *self.ticker.lock() = Some(Ticker { stop, handle });
        Ok(())
    }

    fn stop_ticker(&self) -> AppResult<()> {
        if let Some(ticker) = self.ticker.lock().take() {
            let _ = ticker.stop.send(());
            ticker
                .handle
                .join()
                .map_err(|_| AppError::internal("counter flush ticker panicked"))?;
        }
        Ok(())
    }
}

impl Inner {
    fn flush(&self) -> AppResult<()> {
        let _guard = self.flush_lock.lock();

        let drained = std::mem::take(&mut *self.pending.lock());
        if drained.is_empty() {
            return Ok(());
        }

        match self.merge_and_persist(&drained) {
            Ok(reloaded) => {
                debug!(keys = drained.len(), path = %self.path.display(), "Flushed counters");
                *self.snapshot.write() = reloaded;
                Ok(())
            }
            Err(e) => {
                self.restore(drained);
                Err(e)
            }
        }
    }

    fn merge_and_persist(&self, drained: &HashMap<String, Pending>) -> AppResult<HashMap<String, i64>> {
        let mut on_disk = read_snapshot(&self.path)?;
        for (key, op) in drained {
            match op.apply(on_disk.get(key).copied()) {
                Some(value) => {
                    on_disk.insert(key.clone(), value);
                }
                None => {
                    on_disk.remove(key);
                }
            }
        }

        write_snapshot(&self.path, &on_disk)?;
        read_snapshot(&self.path).map(|reloaded| reloaded.into_iter().collect())
    }

    /// Put a failed flush's changes back in front of anything buffered since
    fn restore(&self, drained: HashMap<String, Pending>) {
        let mut pending = self.pending.lock();
        for (key, op) in drained {
            let merged = match pending.remove(&key) {
                Some(newer) => op.then(newer),
                None => op,
            };
            pending.insert(key, merged);
        }
    }
}

fn read_snapshot(path: &Path) -> AppResult<BTreeMap<String, i64>> {
    if !path.exists() {
        return Ok(BTreeMap::new());
    }

    let content = fs::read_to_string(path)
        .map_err(|e| AppError::storage_with_source(path, "read counter snapshot", e))?;
    if content.trim().is_empty() {
        return Ok(BTreeMap::new());
    }

    serde_json::from_str(&content)
        .map_err(|e| AppError::storage_with_source(path, "parse counter snapshot", e))
}

fn write_snapshot(path: &Path, counters: &BTreeMap<String, i64>) -> AppResult<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .map_err(|e| AppError::storage_with_source(dir, "create snapshot directory", e))?;

    let mut file = tempfile::NamedTempFile::new_in(dir)
        .map_err(|e| AppError::storage_with_source(dir, "create temporary snapshot", e))?;
    serde_json::to_writer_pretty(&mut file, counters)
        .map_err(|e| AppError::storage_with_source(path, "serialize counter snapshot", e))?;
    file.flush()
        .map_err(|e| AppError::storage_with_source(path, "write counter snapshot", e))?;
    file.persist(path)
        .map_err(|e| AppError::storage_with_source(path, "replace counter snapshot", e.error))?;
    Ok(())
}

impl CounterStore for FileStore {
    fn init(&self) -> AppResult<()> {
        match self.inner.state.load(Ordering::Acquire) {
            STATE_LOADED => return Ok(()),
            STATE_CLOSED => return Err(AppError::StoreClosed),
            _ => {}
        }

        let loaded = read_snapshot(&self.inner.path)?;
        info!(
            path = %self.inner.path.display(),
            keys = loaded.len(),
            "Loaded counter snapshot"
        );
        *self.inner.snapshot.write() = loaded.into_iter().collect();

        self.start_ticker()?;
        self.inner.state.store(STATE_LOADED, Ordering::Release);
        Ok(())
    }

    fn get(&self, key: &str) -> i64 {
        self.inner.snapshot.read().get(key).copied().unwrap_or(0)
    }

    fn set(&self, key: &str, value: i64) {
        let op = match self.inner.set_semantics {
            SetSemantics::Assign => Pending::Assign(value),
            SetSemantics::Additive => Pending::Delta(value),
        };
        self.buffer(key, op);
    }

    fn add(&self, key: &str, delta: i64) {
        self.buffer(key, Pending::Delta(delta));
    }

    fn del(&self, key: &str) {
        self.buffer(key, Pending::Remove);
    }

    /// Stop the ticker and flush whatever is buffered
    ///
    /// Calling it again after a failed final flush retries that flush; it
    /// only becomes a no-op once the buffer is empty.
    fn close(&self) -> AppResult<()> {
        let previous = self.mark_closed();

        self.stop_ticker()?;
        self.inner.flush()?;
        if previous != STATE_CLOSED {
            info!(path = %self.inner.path.display(), "Counter store closed");
        }
        Ok(())
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        let open = self.inner.state.load(Ordering::Acquire) != STATE_CLOSED;
        if open || self.pending_len() > 0 {
            if let Err(e) = self.close() {
                error!(
                    error = %e,
                    pending = self.pending_len(),
                    "Failed to close counter store on drop, buffered counters lost"
                );
            }
        }
    }
}
