use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// A table of per-key async mutexes.
///
/// Entries are reference counted: acquiring creates the entry on first use,
/// dropping the guard removes it once no task holds or waits on the key, so
/// the table grows with concurrently locked keys, not with every key ever
/// touched.
///
/// This only serializes tasks of one process. Cross-instance correctness
/// rests entirely on the document store's conditional writes.
#[derive(Default)]
pub struct KeyedLocks {
    entries: Arc<Mutex<HashMap<String, LockEntry>>>,
}

struct LockEntry {
    lock: Arc<AsyncMutex<()>>,
    // holders plus waiters; the entry is evicted when this reaches zero
    refs: usize,
}

/// Exclusive hold on one key. Dropping it releases the key and evicts the
/// table entry if nobody else is interested.
pub struct KeyedGuard {
    key: String,
    entries: Arc<Mutex<HashMap<String, LockEntry>>>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock `key`, waiting for the current holder if there is one.
    pub async fn acquire(&self, key: &str) -> KeyedGuard {
        let lock = {
            let mut entries = self.entries.lock().unwrap();
            let entry = entries.entry(key.to_string()).or_insert_with(|| LockEntry {
                lock: Arc::new(AsyncMutex::new(())),
                refs: 0,
            });
            entry.refs += 1;
            Arc::clone(&entry.lock)
        };

        // The guard is constructed before awaiting so the refcount is
        // released even if this future is dropped while waiting.
        let mut acquired = KeyedGuard {
            key: key.to_string(),
            entries: Arc::clone(&self.entries),
            guard: None,
        };
        acquired.guard = Some(lock.lock_owned().await);
        acquired
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.entries.lock().unwrap().len()
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        // Release the mutex before the bookkeeping so a waiter can proceed
        // as soon as the entry is touched.
        self.guard.take();

        let mut entries = self.entries.lock().unwrap();
        if let Some(entry) = entries.get_mut(&self.key) {
            entry.refs -= 1;
            if entry.refs == 0 {
                entries.remove(&self.key);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_mutual_exclusion_per_key() {
        let locks = Arc::new(KeyedLocks::new());
        let in_section = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let locks = Arc::clone(&locks);
            let in_section = Arc::clone(&in_section);
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire("a1").await;
                assert_eq!(in_section.fetch_add(1, Ordering::SeqCst), 0);
                tokio::time::sleep(Duration::from_millis(2)).await;
                in_section.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_independent_keys_do_not_contend() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire("a1").await;
        // would deadlock if keys shared a mutex
        let _b = locks.acquire("b2").await;
        assert_eq!(locks.entry_count(), 2);
    }

    #[tokio::test]
    async fn test_entries_are_evicted_after_release() {
        let locks = Arc::new(KeyedLocks::new());

        {
            let _guard = locks.acquire("a1").await;
            assert_eq!(locks.entry_count(), 1);
        }
        assert_eq!(locks.entry_count(), 0);

        // contended entries survive until the last interested task is done
        let guard = locks.acquire("a1").await;
        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire("a1").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(locks.entry_count(), 1);
        drop(guard);
        waiter.await.unwrap();
        assert_eq!(locks.entry_count(), 0);
    }

    #[tokio::test]
    async fn test_key_can_be_reacquired_after_eviction() {
        let locks = KeyedLocks::new();
        drop(locks.acquire("a1").await);
        let _guard = locks.acquire("a1").await;
        assert_eq!(locks.entry_count(), 1);
    }
}
