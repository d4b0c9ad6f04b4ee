//! Fake platform implementation for testing.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::pal::abstractions::Platform;

/// Internal state for the fake platform that can be shared between clones.
#[derive(Debug)]
struct FakePlatformState {
    origin: Instant,
    elapsed: Duration,
}

/// Fake implementation of the platform abstraction for testing.
///
/// The fake clock only moves when a test tells it to. Multiple clones of the same
/// `FakePlatform` share the same underlying state, so a test can keep a clone and
/// advance time while a `ScopeStack` holds another clone.
#[derive(Clone, Debug)]
pub(crate) struct FakePlatform {
    state: Arc<Mutex<FakePlatformState>>,
}

impl FakePlatform {
    /// Creates a new fake platform frozen at an arbitrary origin instant.
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakePlatformState {
                origin: Instant::now(),
                elapsed: Duration::ZERO,
            })),
        }
    }

    /// Moves the clock forward by `delta`.
    pub(crate) fn advance(&self, delta: Duration) {
        let mut state = self
            .state
            .lock()
            .expect("FakePlatform state lock should not be poisoned");

        state.elapsed = state
            .elapsed
            .checked_add(delta)
            .expect("fake clock advanced beyond Duration range - this indicates a broken test");
    }
}

impl Platform for FakePlatform {
    fn now(&self) -> Instant {
        let state = self
            .state
            .lock()
            .expect("FakePlatform state lock should not be poisoned");

        state
            .origin
            .checked_add(state.elapsed)
            .expect("fake clock advanced beyond Instant range - this indicates a broken test")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn frozen_until_advanced() {
        let platform = FakePlatform::new();

        assert_eq!(platform.now(), platform.now());
    }

    #[test]
    fn advance_moves_now_forward() {
        let platform = FakePlatform::new();
        let before = platform.now();

        platform.advance(Duration::from_millis(150));

        assert_eq!(
            platform.now().duration_since(before),
            Duration::from_millis(150)
        );
    }

    #[test]
    fn shared_state_between_clones() {
        let platform1 = FakePlatform::new();
        let platform2 = platform1.clone();
        let before = platform2.now();

        // Advancing one clone affects the other.
        platform1.advance(Duration::from_secs(2));

        assert_eq!(platform2.now().duration_since(before), Duration::from_secs(2));
    }
}
