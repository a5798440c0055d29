use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use futures::lock::Mutex;
use moka::sync::Cache;

/// One async lock per `(person_id, date)`, so check-in, check-out and admin
/// edits for the same day never interleave. Idle locks are evicted.
///
/// The cache does not know whether a lock is held. An entry that idles out
/// while its guard is still alive, or that is evicted or never admitted once
/// the cache is at capacity, is replaced by a fresh mutex, and the next
/// caller for that key is not serialized against the holder. Guards must
/// therefore be held for far less than the idle window, and capacity must
/// stay well above the number of keys touched within one window.
#[derive(Clone)]
pub struct KeyLocks {
    locks: Cache<(u64, NaiveDate), Arc<Mutex<()>>>,
}

impl KeyLocks {
    pub fn new(idle: Duration) -> Self {
        Self {
            locks: Cache::builder()
                .max_capacity(100_000) // tune based on roster size
                .time_to_idle(idle)
                .build(),
        }
    }

    /// Lock for the key; hold `lock().await` for the whole read-modify-write.
    pub fn get(&self, person_id: u64, date: NaiveDate) -> Arc<Mutex<()>> {
        self.locks
            .get_with((person_id, date), || Arc::new(Mutex::new(())))
    }
}

impl Default for KeyLocks {
    fn default() -> Self {
        Self::new(Duration::from_secs(600))
    }
}
