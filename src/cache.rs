//! Time source and TTL-guarded cache cells shared by the command and news services.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Used to exercise TTL expiry without sleeping.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Arc<Self> {
        Arc::new(ManualClock {
            now: Mutex::new(start),
        })
    }

    pub fn advance(&self, by: Duration) {
        let mut now = lock(&self.now);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *lock(&self.now)
    }
}

// A poisoned lock only means another request panicked mid-write; the cached value is still usable.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Debug, Clone)]
pub struct Stamped<T> {
    pub value: T,
    pub stored_at: DateTime<Utc>,
}

/// A single cached value that expires `ttl` after it was stored.
pub struct TtlSlot<T> {
    clock: Arc<dyn Clock>,
    ttl: Duration,
    entry: Mutex<Option<Stamped<T>>>,
}

impl<T: Clone> TtlSlot<T> {
    pub fn new(clock: Arc<dyn Clock>, ttl: Duration) -> Self {
        TtlSlot {
            clock,
            ttl,
            entry: Mutex::new(None),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The cached value if it is younger than the TTL.
    pub fn get_fresh(&self) -> Option<Stamped<T>> {
        let now = self.clock.now();
        lock(&self.entry)
            .as_ref()
            .filter(|entry| now - entry.stored_at < self.ttl)
            .cloned()
    }

    /// The cached value regardless of age.
    pub fn get_any(&self) -> Option<Stamped<T>> {
        lock(&self.entry).clone()
    }

    pub fn put(&self, value: T) {
        let stored_at = self.clock.now();
        *lock(&self.entry) = Some(Stamped { value, stored_at });
    }

    /// Return the fresh value, or compute, store and return a new one.
    pub fn get_or_insert_with(&self, compute: impl FnOnce() -> T) -> T {
        let now = self.clock.now();
        let mut entry = lock(&self.entry);
        match entry.as_ref() {
            Some(current) if now - current.stored_at < self.ttl => current.value.clone(),
            _ => {
                let value = compute();
                *entry = Some(Stamped {
                    value: value.clone(),
                    stored_at: now,
                });
                value
            }
        }
    }
}
