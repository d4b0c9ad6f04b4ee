//! Timing scope handles.

use std::time::{Duration, Instant};

use tracing::warn;

use crate::pal::{Platform, PlatformFacade};
use crate::{Result, ScopeStack};

/// Identifies one entered scope within one [`ScopeStack`].
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct ScopeId {
    pub(crate) session: u64,
    pub(crate) sequence: u64,
}

/// One measured interval, open from [`ScopeStack::enter()`] until [`ScopeStack::exit()`].
///
/// The handle is a plain value: it does not close itself. Prefer [`ScopeStack::scope()`],
/// which returns a [`ScopeGuard`] that closes the scope on every path out of the
/// enclosing block.
///
/// # Examples
///
/// ```
/// use time_tree::ScopeStack;
///
/// let mut stack = ScopeStack::new();
///
/// let mut scope = stack.enter("main").unwrap();
/// assert!(scope.is_open());
///
/// stack.exit(&mut scope).unwrap();
/// assert!(!scope.is_open());
///
/// // Once closed, the elapsed time is frozen.
/// assert_eq!(scope.elapsed_time(), scope.elapsed_time());
/// ```
#[derive(Debug)]
#[must_use = "an entered scope must be passed to ScopeStack::exit()"]
pub struct TimingScope {
    id: ScopeId,
    name: String,
    start: Instant,
    end: Option<Instant>,
    parent: Option<ScopeId>,
    platform: PlatformFacade,
}

impl TimingScope {
    pub(crate) fn new(
        id: ScopeId,
        name: String,
        parent: Option<ScopeId>,
        platform: PlatformFacade,
    ) -> Self {
        let start = platform.now();

        Self {
            id,
            name,
            start,
            end: None,
            parent,
            platform,
        }
    }

    /// Identifies this scope.
    #[must_use]
    pub fn id(&self) -> ScopeId {
        self.id
    }

    /// The name the scope was entered with.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The scope that was innermost when this one was entered, `None` for the root scope.
    #[must_use]
    pub fn parent(&self) -> Option<ScopeId> {
        self.parent
    }

    /// When the scope was entered.
    #[must_use]
    pub fn start(&self) -> Instant {
        self.start
    }

    /// When the scope was exited, `None` while it is open.
    #[must_use]
    pub fn end(&self) -> Option<Instant> {
        self.end
    }

    /// Whether the scope has not been exited yet.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.end.is_none()
    }

    /// Time spent in the scope: up to now while open, frozen once exited.
    #[must_use]
    pub fn elapsed_time(&self) -> Duration {
        let end = self.end.unwrap_or_else(|| self.platform.now());
        end.saturating_duration_since(self.start)
    }

    /// Marks the scope closed at the current instant and returns its duration.
    pub(crate) fn close(&mut self) -> Duration {
        debug_assert!(self.end.is_none(), "a scope is closed exactly once");

        let end = self.platform.now();
        self.end = Some(end);
        end.saturating_duration_since(self.start)
    }
}

/// An open scope that exits when dropped.
///
/// Child scopes are opened through the guard itself, so the borrow checker guarantees
/// that every child closes before its parent.
///
/// # Examples
///
/// ```
/// use time_tree::ScopeStack;
///
/// let mut stack = ScopeStack::new();
/// {
///     let mut main = stack.scope("main").unwrap();
///     {
///         let _load = main.scope("load").unwrap();
///         // Work measured as "load".
///     } // "load" closes here.
/// } // "main" closes here, finishing the session.
///
/// assert!(stack.is_closed());
/// ```
#[derive(Debug)]
#[must_use = "the scope closes as soon as the guard is dropped"]
pub struct ScopeGuard<'a> {
    stack: &'a mut ScopeStack,

    // Always `Some` until `finish()` or drop takes it.
    scope: Option<TimingScope>,
}

impl<'a> ScopeGuard<'a> {
    pub(crate) fn new(stack: &'a mut ScopeStack, scope: TimingScope) -> Self {
        Self {
            stack,
            scope: Some(scope),
        }
    }

    fn scope_ref(&self) -> &TimingScope {
        self.scope
            .as_ref()
            .expect("guard holds its scope until finish() or drop")
    }

    /// The name the scope was entered with.
    #[must_use]
    pub fn name(&self) -> &str {
        self.scope_ref().name()
    }

    /// Time spent in the scope so far.
    #[must_use]
    pub fn elapsed_time(&self) -> Duration {
        self.scope_ref().elapsed_time()
    }

    /// Opens a child scope nested in this one.
    ///
    /// # Errors
    ///
    /// Never fails while this guard's scope is open; the `Result` matches
    /// [`ScopeStack::scope()`].
    pub fn scope(&mut self, name: impl Into<String>) -> Result<ScopeGuard<'_>> {
        self.stack.scope(name)
    }

    /// Runs `f` inside a child scope nested in this one and returns its result.
    ///
    /// # Errors
    ///
    /// Returns an error if the child scope cannot be entered or exited.
    pub fn measure<R>(
        &mut self,
        name: impl Into<String>,
        f: impl FnOnce(&mut ScopeGuard<'_>) -> R,
    ) -> Result<R> {
        self.stack.measure(name, f)
    }

    /// Exits the scope now and returns the closed handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StackDiscipline`](crate::Error::StackDiscipline) if a child scope
    /// opened after this one is still open, which is only possible when a child guard was
    /// leaked.
    pub fn finish(mut self) -> Result<TimingScope> {
        let mut scope = self
            .scope
            .take()
            .expect("guard holds its scope until finish() or drop");

        self.stack.exit(&mut scope)?;
        Ok(scope)
    }
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        if let Some(mut scope) = self.scope.take() {
            if let Err(e) = self.stack.exit(&mut scope) {
                warn!(
                    scope = scope.name(),
                    error = %e,
                    "scope guard dropped without closing its scope"
                );
            }
        }
    }
}
