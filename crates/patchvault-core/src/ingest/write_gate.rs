//! Keyed write serialization
//!
//! At most one writer holds a given `variant/fingerprint` key. A writer
//! acquires all of its keys at once, so two batches with overlapping keys can
//! never hold one key each and wait on the other.

use parking_lot::{Condvar, Mutex};
use std::collections::{BTreeSet, HashSet};

#[derive(Debug, Default)]
pub struct WriteGate {
    held: Mutex<HashSet<String>>,
    released: Condvar,
}

impl WriteGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until every key in `keys` is free, then hold them all
    pub fn acquire<I>(&self, keys: I) -> WriteGuard<'_>
    where
        I: IntoIterator<Item = String>,
    {
        let keys: BTreeSet<String> = keys.into_iter().collect();
        let mut held = self.held.lock();
        while keys.iter().any(|k| held.contains(k)) {
            self.released.wait(&mut held);
        }
        held.extend(keys.iter().cloned());
        WriteGuard { gate: self, keys }
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.lock().contains(key)
    }
}

/// Keys held by one writer; released on drop
#[derive(Debug)]
pub struct WriteGuard<'a> {
    gate: &'a WriteGate,
    keys: BTreeSet<String>,
}

impl WriteGuard<'_> {
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }
}

impl Drop for WriteGuard<'_> {
    fn drop(&mut self) {
        let mut held = self.gate.held.lock();
        for key in &self.keys {
            held.remove(key);
        }
        self.gate.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_guard_releases_on_drop() {
        let gate = WriteGate::new();
        {
            let _guard = gate.acquire(["OB-6/aa".to_string()]);
            assert!(gate.is_held("OB-6/aa"));
        }
        assert!(!gate.is_held("OB-6/aa"));
    }

    #[test]
    fn test_overlapping_writer_waits() {
        let gate = Arc::new(WriteGate::new());
        let guard = gate.acquire(["k1".to_string(), "k2".to_string()]);
        let entered = Arc::new(AtomicBool::new(false));

        let handle = {
            let gate = Arc::clone(&gate);
            let entered = Arc::clone(&entered);
            std::thread::spawn(move || {
                let _g = gate.acquire(["k2".to_string(), "k3".to_string()]);
                entered.store(true, Ordering::SeqCst);
            })
        };

        std::thread::sleep(Duration::from_millis(50));
        assert!(!entered.load(Ordering::SeqCst));
        drop(guard);
        handle.join().unwrap();
        assert!(entered.load(Ordering::SeqCst));
    }

    #[test]
    fn test_disjoint_keys_do_not_block() {
        let gate = WriteGate::new();
        let _a = gate.acquire(["a".to_string()]);
        let b = gate.acquire(["b".to_string()]);
        assert_eq!(b.keys().collect::<Vec<_>>(), vec!["b"]);
    }
}
