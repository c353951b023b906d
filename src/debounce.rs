// src/debounce.rs
//
// Latest-wins debouncing driven by explicit time.
//
// Nothing here sleeps or spawns timers: the owner calls `poll(now)` from
// its tick loop and gets the pending value once the quiet period has
// passed. Time comes from a Clock so tests can step it by hand.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Source of the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to. Clones share the same time.
#[derive(Clone, Debug)]
pub struct ManualClock {
    base: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.offset.lock() += by;
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance(Duration::from_millis(ms));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + *self.offset.lock()
    }
}

/// Holds at most one pending value; each `call` replaces it and restarts
/// the quiet period.
#[derive(Debug)]
pub struct Debouncer<T> {
    delay: Duration,
    pending: Option<(T, Instant)>,
}

impl<T> Debouncer<T> {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: None,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Replace the pending value and restart the window at `now`.
    pub fn call(&mut self, value: T, now: Instant) {
        self.pending = Some((value, now));
    }

    /// The pending value, once `delay` has passed since the last call.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match &self.pending {
            Some((_, last)) if now.saturating_duration_since(*last) >= self.delay => {
                self.pending.take().map(|(value, _)| value)
            }
            _ => None,
        }
    }

    /// The pending value right away, ignoring the window.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take().map(|(value, _)| value)
    }

    /// Drop the pending value.
    pub fn cancel(&mut self) {
        self.pending = None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// When the pending value becomes due.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(_, last)| *last + self.delay)
    }

    pub fn peek(&self) -> Option<&T> {
        self.pending.as_ref().map(|(value, _)| value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DELAY: Duration = Duration::from_millis(300);

    #[test]
    fn fires_after_quiet_period() {
        let clock = ManualClock::new();
        let mut d = Debouncer::new(DELAY);
        d.call(1, clock.now());
        clock.advance_ms(299);
        assert_eq!(d.poll(clock.now()), None);
        clock.advance_ms(1);
        assert_eq!(d.poll(clock.now()), Some(1));
        assert!(!d.is_pending());
    }

    #[test]
    fn burst_collapses_to_last_value() {
        let clock = ManualClock::new();
        let mut d = Debouncer::new(DELAY);
        for v in 1..=3 {
            d.call(v, clock.now());
            clock.advance_ms(100);
            assert_eq!(d.poll(clock.now()), None);
        }
        clock.advance_ms(200);
        assert_eq!(d.poll(clock.now()), Some(3));
        assert_eq!(d.poll(clock.now()), None);
    }

    #[test]
    fn call_restarts_window() {
        let clock = ManualClock::new();
        let mut d = Debouncer::new(DELAY);
        d.call("a", clock.now());
        clock.advance_ms(250);
        d.call("b", clock.now());
        assert_eq!(d.deadline(), Some(clock.now() + DELAY));
        clock.advance_ms(250);
        assert_eq!(d.poll(clock.now()), None);
        clock.advance_ms(50);
        assert_eq!(d.poll(clock.now()), Some("b"));
    }

    #[test]
    fn cancel_and_take() {
        let clock = ManualClock::new();
        let mut d = Debouncer::new(DELAY);
        d.call(7, clock.now());
        d.cancel();
        clock.advance_ms(1000);
        assert_eq!(d.poll(clock.now()), None);

        d.call(8, clock.now());
        assert_eq!(d.peek(), Some(&8));
        assert_eq!(d.take(), Some(8));
        assert_eq!(d.take(), None);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let a = ManualClock::new();
        let b = a.clone();
        let start = a.now();
        b.advance_ms(5);
        assert_eq!(a.now() - start, Duration::from_millis(5));
    }
}
