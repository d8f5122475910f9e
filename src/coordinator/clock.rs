//! Lamport logical clock
//!
//! Every vote request is stamped with a logical timestamp. `tick` advances
//! the clock for a local event; `observe` merges a received timestamp as
//! `max(local, received) + 1`. Both go through one mutex so concurrent
//! callers never lose an update and the returned values are strictly
//! increasing.

use std::sync::{Mutex, PoisonError};

#[derive(Debug, Default)]
pub struct LamportClock {
    time: Mutex<u64>,
}

impl LamportClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment for a local event and return the new time.
    pub fn tick(&self) -> u64 {
        let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
        *time += 1;
        *time
    }

    /// Merge a received timestamp and return the new time.
    pub fn observe(&self, received: u64) -> u64 {
        let mut time = self.time.lock().unwrap_or_else(PoisonError::into_inner);
        *time = (*time).max(received) + 1;
        *time
    }

    /// Current value without advancing.
    pub fn now(&self) -> u64 {
        *self.time.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_tick_increments() {
        let clock = LamportClock::new();
        assert_eq!(clock.now(), 0);
        assert_eq!(clock.tick(), 1);
        assert_eq!(clock.tick(), 2);
    }

    #[test]
    fn test_observe_takes_max_plus_one() {
        let clock = LamportClock::new();
        clock.tick();
        assert_eq!(clock.observe(10), 11);
        // An older timestamp still advances the clock.
        assert_eq!(clock.observe(3), 12);
        assert_eq!(clock.tick(), 13);
    }

    #[test]
    fn test_monotonic_after_observe() {
        let clock = LamportClock::new();
        let mut last = 0;
        for received in [5, 1, 40, 40, 2, 100, 0] {
            let t = clock.observe(received);
            assert!(t > last);
            last = t;
            let t = clock.tick();
            assert!(t > last);
            last = t;
        }
    }

    #[test]
    fn test_concurrent_ticks_lose_no_updates() {
        let clock = Arc::new(LamportClock::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let clock = clock.clone();
                std::thread::spawn(move || {
                    let mut seen = Vec::with_capacity(1000);
                    for _ in 0..1000 {
                        seen.push(clock.tick());
                    }
                    seen
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 8000);
        assert_eq!(clock.now(), 8000);
    }
}
