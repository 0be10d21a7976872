// src/client/inflight.rs

use std::{
    collections::HashSet,
    hash::Hash,
    sync::{Arc, Mutex, PoisonError},
};

/// Per-key "request in flight" flags, e.g. one per table row.
#[derive(Debug)]
pub struct InFlight<K: Eq + Hash> {
    busy: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash> Default for InFlight<K> {
    fn default() -> Self {
        Self {
            busy: Arc::new(Mutex::new(HashSet::new())),
        }
    }
}

impl<K: Eq + Hash> Clone for InFlight<K> {
    fn clone(&self) -> Self {
        Self {
            busy: self.busy.clone(),
        }
    }
}

impl<K: Eq + Hash + Clone> InFlight<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` busy. `None` if it already is.
    pub fn try_begin(&self, key: K) -> Option<InFlightToken<K>> {
        let mut busy = self.busy.lock().unwrap_or_else(PoisonError::into_inner);
        if !busy.insert(key.clone()) {
            return None;
        }
        Some(InFlightToken {
            key,
            busy: self.busy.clone(),
        })
    }

    pub fn is_busy(&self, key: &K) -> bool {
        self.busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

/// Clears the flag when dropped, whether the request succeeded or not.
#[derive(Debug)]
pub struct InFlightToken<K: Eq + Hash> {
    key: K,
    busy: Arc<Mutex<HashSet<K>>>,
}

impl<K: Eq + Hash> Drop for InFlightToken<K> {
    fn drop(&mut self) {
        self.busy
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_begin_is_refused_until_release() {
        let guard = InFlight::new();
        let token = guard.try_begin(1).unwrap();
        assert!(guard.try_begin(1).is_none());
        assert!(guard.try_begin(2).is_some());
        assert!(guard.is_busy(&1));

        drop(token);
        assert!(!guard.is_busy(&1));
        assert!(guard.try_begin(1).is_some());
    }

    #[test]
    fn token_releases_on_error_paths() {
        let guard = InFlight::new();
        let attempt = |fail: bool| -> Result<(), &'static str> {
            let _token = guard.try_begin("row").ok_or("busy")?;
            if fail { Err("boom") } else { Ok(()) }
        };
        assert_eq!(attempt(true), Err("boom"));
        assert_eq!(attempt(false), Ok(()));
    }
}
