//! Single-slot TTL cache.
//!
//! Used for the project-template listing, which changes rarely but is
//! consulted by every settings form render. One shared slot, expired by
//! wall-clock age, no background eviction.

use std::sync::Mutex;
use std::time::{Duration, Instant};

struct Entry<T> {
    stored_at: Instant,
    value: T,
}

/// A one-value cache whose content expires `ttl` after it was stored.
pub struct TtlCache<T> {
    ttl: Duration,
    slot: Mutex<Option<Entry<T>>>,
}

impl<T: Clone> TtlCache<T> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(None),
        }
    }

    /// The cached value, if one was stored less than `ttl` ago.
    pub fn get(&self) -> Option<T> {
        self.get_at(Instant::now())
    }

    /// Store a value, replacing whatever was in the slot.
    pub fn put(&self, value: T) {
        self.put_at(value, Instant::now());
    }

    /// Clock-injected variant of [`get`](Self::get), also used by tests.
    pub fn get_at(&self, now: Instant) -> Option<T> {
        let guard = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.as_ref().and_then(|entry| {
            if now.duration_since(entry.stored_at) < self.ttl {
                Some(entry.value.clone())
            } else {
                None
            }
        })
    }

    /// Clock-injected variant of [`put`](Self::put), also used by tests.
    pub fn put_at(&self, value: T, now: Instant) {
        let mut guard = match self.slot.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *guard = Some(Entry {
            stored_at: now,
            value,
        });
    }
}
