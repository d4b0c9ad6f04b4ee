//! Platform abstraction trait definitions.

use std::fmt::Debug;
use std::time::Instant;

/// Provides the monotonic time source used to timestamp scopes.
///
/// This trait abstracts the underlying clock, allowing for both the real
/// implementation and fake implementations (for testing).
pub(crate) trait Platform: Debug + Send + Sync + 'static {
    /// Gets the current instant.
    ///
    /// Successive calls must never go backwards.
    fn now(&self) -> Instant;
}
