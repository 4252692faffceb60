use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Dead entries are only purged once the map grows past this size.
const CLEANUP_THRESHOLD: usize = 128;
/// Purge at most once every this many acquisitions.
const CLEANUP_INTERVAL: usize = 64;

/// Per-key async mutual exclusion.
///
/// Two holders of the same key never overlap; different keys never block each
/// other. Entries are weak, so a key with no live guard costs nothing beyond
/// its map slot until the next amortized cleanup.
pub struct KeyLocks<K> {
    locks: Mutex<HashMap<K, Weak<AsyncMutex<()>>>>,
    acquire_counter: AtomicUsize,
}

/// Holds a key until dropped. Dropping the owning future releases it too.
pub struct KeyGuard {
    _guard: OwnedMutexGuard<()>,
}

impl<K> KeyLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            acquire_counter: AtomicUsize::new(0),
        }
    }

    pub async fn acquire(&self, key: &K) -> KeyGuard {
        let mutex = {
            let mut map = self.locks.lock().unwrap_or_else(PoisonError::into_inner);

            let mutex = map.get(key).and_then(Weak::upgrade).unwrap_or_else(|| {
                let fresh = Arc::new(AsyncMutex::new(()));
                map.insert(key.clone(), Arc::downgrade(&fresh));
                fresh
            });

            let tick = self.acquire_counter.fetch_add(1, Ordering::Relaxed);
            if map.len() > CLEANUP_THRESHOLD && tick % CLEANUP_INTERVAL == 0 {
                map.retain(|_, weak| weak.strong_count() > 0);
            }

            mutex
        };

        KeyGuard {
            _guard: mutex.lock_owned().await,
        }
    }

    /// Run `f` while holding the lock for `key`.
    pub async fn with_key_lock<F, Fut, T>(&self, key: &K, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.acquire(key).await;
        f().await
    }

    /// Number of map slots, live or not yet purged.
    pub fn tracked_keys(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<K> Default for KeyLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
