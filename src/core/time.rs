//! Abstractions for providing the current time.

use std::fmt::Debug;
use std::sync::{
    Arc,
    Mutex,
};
use std::time::{
    Duration,
    Instant,
};

/// A source of the current time.
pub trait Clock: Clone + Debug + Send {
    /// Returns an instant corresponding to "now".
    fn now(&self) -> Instant;
}

/// A clock backed by the system time.
#[derive(Clone, Debug)]
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> SystemClock {
        SystemClock {}
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A manually advanced clock. Clones share the same underlying instant, so
/// a test can hold one handle and advance the time observed by a cache or
/// router holding another.
#[derive(Clone, Debug)]
pub struct MockClock {
    now: Arc<Mutex<Instant>>,
}

impl MockClock {
    pub fn new() -> MockClock {
        MockClock {
            now: Arc::new(Mutex::new(Instant::now())),
        }
    }

    /// Moves the shared instant forward.
    pub fn advance(&self, duration: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += duration;
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        *self.now.lock().unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_clones_share_time() {
        let clock = MockClock::new();
        let other = clock.clone();

        let before = other.now();
        clock.advance(Duration::from_secs(5));
        assert_eq!(other.now(), before + Duration::from_secs(5));
    }
}
