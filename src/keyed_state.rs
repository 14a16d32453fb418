//! Expiring per-key state shared by the rate limiter and the bot sessions.

use std::{
    collections::HashMap,
    sync::{Mutex, PoisonError},
};

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub struct Entry<S> {
    pub state: S,
    pub expires_at: DateTime<Utc>,
}

pub trait StateStore<S>: Send + Sync {
    /// Current state for `key`, ignoring entries expired at `now`.
    fn get(&self, key: &str, now: DateTime<Utc>) -> Option<S>;

    /// Atomically replaces the entry for `key` with the closure's result.
    /// The closure sees `None` for absent or expired entries; returning
    /// `None` removes the key.
    fn modify(
        &self,
        key: &str,
        now: DateTime<Utc>,
        f: &mut dyn FnMut(Option<&S>) -> Option<Entry<S>>,
    );

    fn remove(&self, key: &str);
}

const SWEEP_THRESHOLD: usize = 4096;

#[derive(Debug)]
pub struct MemoryStateStore<S> {
    entries: Mutex<HashMap<String, Entry<S>>>,
}

impl<S> Default for MemoryStateStore<S> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<S> MemoryStateStore<S> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<S: Clone + Send> StateStore<S> for MemoryStateStore<S> {
    fn get(&self, key: &str, now: DateTime<Utc>) -> Option<S> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| e.state.clone())
    }

    fn modify(
        &self,
        key: &str,
        now: DateTime<Utc>,
        f: &mut dyn FnMut(Option<&S>) -> Option<Entry<S>>,
    ) {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.len() >= SWEEP_THRESHOLD {
            entries.retain(|_, e| e.expires_at > now);
        }

        let current = entries
            .get(key)
            .filter(|e| e.expires_at > now)
            .map(|e| &e.state);
        match f(current) {
            Some(entry) => {
                entries.insert(key.to_string(), entry);
            }
            None => {
                entries.remove(key);
            }
        }
    }

    fn remove(&self, key: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn expired_entries_are_invisible() {
        let store: MemoryStateStore<u32> = MemoryStateStore::new();
        let t0 = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap();
        store.modify("k", t0, &mut |_| {
            Some(Entry {
                state: 1u32,
                expires_at: t0 + Duration::seconds(10),
            })
        });

        assert_eq!(store.get("k", t0 + Duration::seconds(9)), Some(1));
        assert_eq!(store.get("k", t0 + Duration::seconds(10)), None);

        let mut seen = Some(0);
        store.modify("k", t0 + Duration::seconds(11), &mut |cur| {
            seen = cur.copied();
            None
        });
        assert_eq!(seen, None);
        assert!(store.is_empty());
    }
}
