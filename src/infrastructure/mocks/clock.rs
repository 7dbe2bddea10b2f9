//! Mock clock for testing.

use crate::application::ports::Clock;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Mock clock for testing.
///
/// Allows tests to control time progression explicitly, enabling deterministic
/// testing of window expiry and pruning.
///
/// # Examples
///
/// ```ignore
/// use access_shield::infrastructure::mocks::MockClock;
/// use access_shield::application::ports::Clock;
/// use std::time::Duration;
///
/// let clock = MockClock::new(0);
///
/// // Advance time explicitly
/// clock.advance(Duration::from_secs(5));
/// assert_eq!(clock.now_millis(), 5_000);
///
/// // Or set to a specific instant
/// clock.set(86_400_001);
/// assert_eq!(clock.now_millis(), 86_400_001);
/// ```
///
/// # Thread Safety
///
/// `MockClock` is thread-safe and can be cloned to share across threads.
/// All clones share the same underlying time value, so advancing time in
/// one clone affects all clones.
#[derive(Debug, Clone)]
pub struct MockClock {
    current_millis: Arc<Mutex<u64>>,
}

impl MockClock {
    /// Create a mock clock starting at `start` epoch milliseconds.
    pub fn new(start: u64) -> Self {
        Self {
            current_millis: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a duration.
    pub fn advance(&self, duration: Duration) {
        let mut time = self
            .current_millis
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *time += duration.as_millis() as u64;
    }

    /// Set the clock to a specific epoch millisecond.
    pub fn set(&self, millis: u64) {
        let mut time = self
            .current_millis
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock");
        *time = millis;
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> u64 {
        *self
            .current_millis
            .lock()
            .expect("MockClock mutex poisoned - a test thread panicked while holding the lock")
    }
}
