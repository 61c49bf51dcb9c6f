//! Bounded notification throttle
//!
//! Replaces the historical global map-and-timer with an explicit construct:
//! a bounded insertion-ordered map keyed by actor identity, consulting the
//! injected clock, so it can be unit-tested without real time passing. At
//! capacity the oldest key is evicted.

use crate::clock::Clock;
use chrono::{DateTime, Duration, Utc};
use indexmap::IndexMap;
use parking_lot::Mutex;
use std::sync::Arc;

/// Per-key minimum-interval throttle with a bounded memory
#[derive(Debug)]
pub struct NotifyThrottle {
    min_interval: Duration,
    capacity: usize,
    clock: Arc<dyn Clock>,
    recent: Mutex<IndexMap<String, DateTime<Utc>>>,
}

impl NotifyThrottle {
    /// Create a throttle
    ///
    /// `capacity` is clamped to at least 1.
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, min_interval: std::time::Duration, capacity: usize) -> Self {
        Self {
            min_interval: Duration::from_std(min_interval).unwrap_or(Duration::MAX),
            capacity: capacity.max(1),
            clock,
            recent: Mutex::new(IndexMap::new()),
        }
    }

    /// Whether an event for `key` may fire now; records the firing if so
    pub fn allow(&self, key: &str) -> bool {
        let now = self.clock.now();
        let mut recent = self.recent.lock();

        if let Some(last) = recent.get(key) {
            if now.signed_duration_since(*last) < self.min_interval {
                return false;
            }
        }

        // Re-insert at the back so eviction order tracks recency
        recent.shift_remove(key);
        while recent.len() >= self.capacity {
            recent.shift_remove_index(0);
        }
        recent.insert(key.to_string(), now);
        true
    }

    /// Number of tracked keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.recent.lock().len()
    }

    /// Whether no keys are tracked
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.recent.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;

    #[derive(Debug)]
    struct StepClock {
        now: RwLock<DateTime<Utc>>,
    }

    impl StepClock {
        fn new() -> Self {
            Self {
                now: RwLock::new(Utc::now()),
            }
        }

        fn advance(&self, d: Duration) {
            let mut now = self.now.write();
            *now += d;
        }
    }

    impl Clock for StepClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.read()
        }
    }

    #[test]
    fn throttles_within_interval() {
        let clock = Arc::new(StepClock::new());
        let throttle =
            NotifyThrottle::new(clock.clone(), std::time::Duration::from_secs(60), 16);

        assert!(throttle.allow("a"));
        assert!(!throttle.allow("a"));
        assert!(throttle.allow("b"));

        clock.advance(Duration::seconds(61));
        assert!(throttle.allow("a"));
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let clock = Arc::new(StepClock::new());
        let throttle = NotifyThrottle::new(clock.clone(), std::time::Duration::from_secs(60), 2);

        assert!(throttle.allow("a"));
        clock.advance(Duration::seconds(1));
        assert!(throttle.allow("b"));
        clock.advance(Duration::seconds(1));
        assert!(throttle.allow("c"));

        assert_eq!(throttle.len(), 2);
        // "a" was evicted, so it is allowed again despite the interval
        assert!(throttle.allow("a"));
    }
}
