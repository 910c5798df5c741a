/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at https://mozilla.org/MPL/2.0/. */

//! Deadline bookkeeping keyed by element identity.
//!
//! Timers are plain deadlines checked on `Tick`; nothing here sleeps. Arming
//! an already-armed key replaces its deadline, so at most one timer exists per
//! key.

use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct TimerRegistry<K> {
    deadlines: HashMap<K, Instant>,
}

impl<K> Default for TimerRegistry<K> {
    fn default() -> Self {
        Self {
            deadlines: HashMap::new(),
        }
    }
}

impl<K: Eq + Hash + Clone> TimerRegistry<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, key: K, deadline: Instant) {
        self.deadlines.insert(key, deadline);
    }

    pub fn cancel(&mut self, key: &K) -> bool {
        self.deadlines.remove(key).is_some()
    }

    pub fn cancel_where(&mut self, mut predicate: impl FnMut(&K) -> bool) {
        self.deadlines.retain(|key, _| !predicate(key));
    }

    pub fn is_armed(&self, key: &K) -> bool {
        self.deadlines.contains_key(key)
    }

    pub fn deadline(&self, key: &K) -> Option<Instant> {
        self.deadlines.get(key).copied()
    }

    /// Remove and return every key whose deadline is at or before `now`,
    /// earliest first.
    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        let mut due: Vec<(Instant, K)> = self
            .deadlines
            .iter()
            .filter(|(_, deadline)| **deadline <= now)
            .map(|(key, deadline)| (*deadline, key.clone()))
            .collect();
        due.sort_by_key(|(deadline, _)| *deadline);
        for (_, key) in &due {
            self.deadlines.remove(key);
        }
        due.into_iter().map(|(_, key)| key).collect()
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.deadlines.values().min().copied()
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.deadlines.keys()
    }

    pub fn clear(&mut self) {
        self.deadlines.clear();
    }

    pub fn len(&self) -> usize {
        self.deadlines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deadlines.is_empty()
    }
}

/// Trailing-edge debounce: every request pushes the key's deadline out by
/// `delay`, so a burst of requests yields one due key once input goes idle.
#[derive(Debug, Clone)]
pub struct Debouncer<K> {
    delay: Duration,
    timers: TimerRegistry<K>,
    coalesced: u64,
}

impl<K: Eq + Hash + Clone> Debouncer<K> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            timers: TimerRegistry::new(),
            coalesced: 0,
        }
    }

    pub fn request(&mut self, key: K, now: Instant) {
        if self.timers.is_armed(&key) {
            self.coalesced = self.coalesced.saturating_add(1);
        }
        self.timers.arm(key, now + self.delay);
    }

    pub fn take_due(&mut self, now: Instant) -> Vec<K> {
        self.timers.take_due(now)
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.timers.is_armed(key)
    }

    /// Requests absorbed into an already-pending recompute.
    pub fn coalesced_count(&self) -> u64 {
        self.coalesced
    }

    pub fn clear(&mut self) {
        self.timers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_due_returns_expired_keys_in_deadline_order() {
        let start = Instant::now();
        let mut timers = TimerRegistry::new();
        timers.arm("late", start + Duration::from_millis(30));
        timers.arm("early", start + Duration::from_millis(10));
        timers.arm("future", start + Duration::from_millis(100));

        assert!(timers.take_due(start).is_empty());
        assert_eq!(timers.take_due(start + Duration::from_millis(50)), vec!["early", "late"]);
        assert!(timers.is_armed(&"future"));
        assert_eq!(timers.len(), 1);
    }

    #[test]
    fn rearming_replaces_and_cancel_removes() {
        let start = Instant::now();
        let mut timers = TimerRegistry::new();
        timers.arm("k", start + Duration::from_millis(10));
        timers.arm("k", start + Duration::from_millis(40));

        assert!(timers.take_due(start + Duration::from_millis(20)).is_empty());
        assert!(timers.cancel(&"k"));
        assert!(!timers.cancel(&"k"));
        assert!(timers.is_empty());
    }

    #[test]
    fn debouncer_coalesces_bursts_into_one_recompute() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(16));
        for step in 0..5 {
            debouncer.request("panel", start + Duration::from_millis(step * 4));
        }

        assert!(debouncer.take_due(start + Duration::from_millis(20)).is_empty());
        assert_eq!(debouncer.take_due(start + Duration::from_millis(40)), vec!["panel"]);
        assert!(debouncer.take_due(start + Duration::from_millis(80)).is_empty());
        assert_eq!(debouncer.coalesced_count(), 4);
    }
}
