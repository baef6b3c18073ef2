use dashmap::DashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use super::CounterStore;
use crate::errors::AppResult;

/// In-process counter store
///
/// Each key owns an `AtomicI64`; `add` is a compare-and-swap loop on that
/// cell so concurrent dispatch tasks never lose increments. Nothing survives
/// a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    counters: DashMap<String, Arc<AtomicI64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    fn cell(&self, key: &str) -> Arc<AtomicI64> {
        if let Some(cell) = self.counters.get(key) {
            return Arc::clone(cell.value());
        }
        // The shard lock is only held for the insert; the CAS below runs unlocked.
        Arc::clone(
            self.counters
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(AtomicI64::new(0)))
                .value(),
        )
    }
}

impl CounterStore for MemoryStore {
    fn init(&self) -> AppResult<()> {
        Ok(())
    }

    fn get(&self, key: &str) -> i64 {
        self.counters
            .get(key)
            .map(|cell| cell.load(Ordering::Acquire))
            .unwrap_or(0)
    }

    fn set(&self, key: &str, value: i64) {
        self.cell(key).store(value, Ordering::Release);
    }

    fn add(&self, key: &str, delta: i64) {
        let cell = self.cell(key);
        let mut current = cell.load(Ordering::Acquire);
        loop {
            let next = current.wrapping_add(delta);
            match cell.compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire) {
                Ok(_) => break,
                Err(observed) => current = observed,
            }
        }
    }

    fn del(&self, key: &str) {
        self.counters.remove(key);
    }

    fn close(&self) -> AppResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_add() {
        let store = MemoryStore::new();
        store.set("k", 5);
        assert_eq!(store.get("k"), 5);
        store.add("k", 3);
        assert_eq!(store.get("k"), 8);
    }

    #[test]
    fn test_missing_key_reads_zero() {
        let store = MemoryStore::new();
        assert_eq!(store.get("hipush-vivo-click"), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn test_del_removes_key() {
        let store = MemoryStore::new();
        store.add("k", 9);
        store.del("k");
        assert_eq!(store.get("k"), 0);
        assert_eq!(store.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_add_loses_nothing() {
        let store = Arc::new(MemoryStore::new());

        let mut handles = Vec::with_capacity(1000);
        for _ in 0..1000 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.add("fresh", 1);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get("fresh"), 1000);
    }

    #[test]
    fn test_concurrent_add_from_threads() {
        let store = Arc::new(MemoryStore::new());

        std::thread::scope(|scope| {
            for _ in 0..16 {
                let store = Arc::clone(&store);
                scope.spawn(move || {
                    for _ in 0..500 {
                        store.add("threads", 1);
                    }
                });
            }
        });

        assert_eq!(store.get("threads"), 8000);
    }
}
