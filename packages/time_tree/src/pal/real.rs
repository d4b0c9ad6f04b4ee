//! Real platform implementation backed by the standard library monotonic clock.

use std::time::Instant;

use crate::pal::abstractions::Platform;

#[derive(Debug, Default)]
pub(crate) struct RealPlatform;

pub(crate) static REAL_PLATFORM: RealPlatform = RealPlatform;

impl Platform for RealPlatform {
    #[cfg_attr(test, mutants::skip)] // Real clock, nothing to mutate meaningfully.
    fn now(&self) -> Instant {
        Instant::now()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn now_does_not_go_backwards() {
        let first = REAL_PLATFORM.now();
        let second = REAL_PLATFORM.now();

        assert!(second >= first);
    }
}
