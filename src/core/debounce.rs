//! Deadline based debouncer
//!
//! Each key owns at most one pending entry. Scheduling a key again replaces
//! its deadline and payload, so a burst of triggers fires once with the last
//! payload. Nothing runs by itself: the owner calls [`Debouncer::take_due`]
//! from its event loop and sleeps until [`Debouncer::next_deadline`].

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
struct Pending<T> {
    deadline: Instant,
    order: u64,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct Debouncer<K, T = ()> {
    pending: HashMap<K, Pending<T>>,
    next_order: u64,
}

impl<K, T> Default for Debouncer<K, T> {
    fn default() -> Self {
        Self {
            pending: HashMap::new(),
            next_order: 0,
        }
    }
}

impl<K: Eq + Hash + Clone, T> Debouncer<K, T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending entry for `key` and schedule a new one
    ///
    /// Returns `true` when a pending entry was replaced.
    pub fn reset_and_schedule(&mut self, key: K, delay: Duration, now: Instant, payload: T) -> bool {
        let order = self.next_order;
        self.next_order += 1;
        self.pending
            .insert(
                key,
                Pending {
                    deadline: now + delay,
                    order,
                    payload,
                },
            )
            .is_some()
    }

    /// Drop the pending entry for `key`; returns whether one existed
    pub fn cancel(&mut self, key: &K) -> bool {
        self.pending.remove(key).is_some()
    }

    pub fn cancel_all(&mut self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.values().map(|p| p.deadline).min()
    }

    /// Remove and return every entry due at `now`, earliest deadline first,
    /// ties broken by scheduling order
    pub fn take_due(&mut self, now: Instant) -> Vec<(K, T)> {
        let due_keys: Vec<K> = self
            .pending
            .iter()
            .filter(|(_, p)| p.deadline <= now)
            .map(|(k, _)| k.clone())
            .collect();

        let mut due: Vec<(K, Pending<T>)> = due_keys
            .into_iter()
            .filter_map(|k| self.pending.remove(&k).map(|p| (k, p)))
            .collect();
        due.sort_by_key(|(_, p)| (p.deadline, p.order));
        due.into_iter().map(|(k, p)| (k, p.payload)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn test_burst_fires_once_with_latest_payload() {
        let start = Instant::now();
        let mut debouncer: Debouncer<&str, u32> = Debouncer::new();

        for i in 0..5u32 {
            let replaced = debouncer.reset_and_schedule("highlight", 200 * MS, start + i * 10 * MS, i);
            assert_eq!(replaced, i > 0);
        }

        // deadline moved with the last trigger
        assert!(debouncer.take_due(start + 200 * MS).is_empty());
        assert_eq!(debouncer.next_deadline(), Some(start + 240 * MS));
        assert_eq!(debouncer.take_due(start + 240 * MS), vec![("highlight", 4)]);
        assert!(debouncer.is_empty());
    }

    #[test]
    fn test_keys_are_independent() {
        let start = Instant::now();
        let mut debouncer: Debouncer<&str> = Debouncer::new();
        debouncer.reset_and_schedule("resize", 250 * MS, start, ());
        debouncer.reset_and_schedule("columns", Duration::ZERO, start, ());
        debouncer.reset_and_schedule("focus", 300 * MS, start, ());

        let fired: Vec<&str> = debouncer.take_due(start + 260 * MS).into_iter().map(|(k, _)| k).collect();
        assert_eq!(fired, vec!["columns", "resize"]);
        assert!(debouncer.is_pending(&"focus"));
    }

    #[test]
    fn test_ties_fire_in_schedule_order() {
        let start = Instant::now();
        let mut debouncer: Debouncer<u8> = Debouncer::new();
        debouncer.reset_and_schedule(3, Duration::ZERO, start, ());
        debouncer.reset_and_schedule(1, Duration::ZERO, start, ());
        debouncer.reset_and_schedule(2, Duration::ZERO, start, ());

        let fired: Vec<u8> = debouncer.take_due(start).into_iter().map(|(k, _)| k).collect();
        assert_eq!(fired, vec![3, 1, 2]);
    }

    #[test]
    fn test_cancel() {
        let start = Instant::now();
        let mut debouncer: Debouncer<&str> = Debouncer::new();
        debouncer.reset_and_schedule("a", MS, start, ());
        debouncer.reset_and_schedule("b", MS, start, ());

        assert!(debouncer.cancel(&"a"));
        assert!(!debouncer.cancel(&"a"));
        assert_eq!(debouncer.len(), 1);

        debouncer.cancel_all();
        assert!(debouncer.take_due(start + MS).is_empty());
        assert_eq!(debouncer.next_deadline(), None);
    }
}
