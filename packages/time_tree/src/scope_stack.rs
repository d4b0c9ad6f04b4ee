use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use foldhash::{HashMap, HashMapExt};
use tracing::{debug, trace, warn};

use crate::pal::PlatformFacade;
use crate::record::total_of;
use crate::{Error, ReportNode, Result, ScopeGuard, ScopeId, TaskRecord, TimingScope};

// Tags scope handles so that a handle from one stack is never mistaken for the top of another.
static NEXT_SESSION: AtomicU64 = AtomicU64::new(0);

type RecordIndex = usize;

const ROOT_RECORD: RecordIndex = 0;

/// Durations of all scopes sharing a name under one parent record, while the session runs.
#[derive(Debug)]
struct RecordSlot {
    name: String,
    times: Vec<Duration>,

    // First-seen order.
    children: Vec<RecordIndex>,
    children_by_name: HashMap<String, RecordIndex>,
}

impl RecordSlot {
    fn new(name: String) -> Self {
        Self {
            name,
            times: Vec::new(),
            children: Vec::new(),
            children_by_name: HashMap::new(),
        }
    }
}

#[derive(Debug)]
struct OpenScope {
    id: ScopeId,
    record: RecordIndex,
}

/// A measurement session: the chain of currently open nested scopes and the records
/// their durations are folded into.
///
/// Scopes close in strict reverse order of opening. Scopes that share a name under the
/// same parent are aggregated into one [`TaskRecord`]. When the outermost (root) scope
/// closes, the session is finished and the record tree becomes available through
/// [`record()`](Self::record) and [`to_report()`](Self::to_report).
///
/// A stack is meant for one thread of control. To measure several threads, give each
/// its own stack.
///
/// # Examples
///
/// ```
/// use time_tree::ScopeStack;
///
/// let mut stack = ScopeStack::new();
///
/// stack
///     .measure("build", |build| {
///         build.measure("parse", |_| { /* ... */ }).unwrap();
///
///         for _ in 0..2 {
///             build.measure("emit", |_| { /* ... */ }).unwrap();
///         }
///     })
///     .unwrap();
///
/// let report = stack.to_report().unwrap();
/// assert_eq!(report.child("emit").unwrap().count(), 2);
///
/// report.print_to_stdout();
/// ```
#[derive(Debug)]
pub struct ScopeStack {
    session: u64,
    platform: PlatformFacade,

    // Arena of records; `ROOT_RECORD` is the root once the first scope is entered.
    // Cleared when the session finishes.
    records: Vec<RecordSlot>,

    // Innermost scope last.
    open: Vec<OpenScope>,

    next_sequence: u64,

    finished: Option<TaskRecord>,
}

impl ScopeStack {
    /// Creates a new session that measures time with the real monotonic clock.
    #[expect(
        clippy::new_without_default,
        reason = "a session is a measurement in progress, not a neutral default value"
    )]
    #[must_use]
    pub fn new() -> Self {
        Self::with_platform(PlatformFacade::real())
    }

    pub(crate) fn with_platform(platform: PlatformFacade) -> Self {
        Self {
            session: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            platform,
            records: Vec::new(),
            open: Vec::new(),
            next_sequence: 0,
            finished: None,
        }
    }

    /// Opens a scope nested in the innermost open scope, or the root scope if none is open.
    ///
    /// The same name may be entered any number of times, including inside itself; a scope
    /// nested in a same-named scope gets its own record one level deeper.
    ///
    /// Every entered scope must be passed to [`exit()`](Self::exit) on every path. Prefer
    /// [`scope()`](Self::scope) or [`measure()`](Self::measure), which guarantee that.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the root scope of this session already closed.
    pub fn enter(&mut self, name: impl Into<String>) -> Result<TimingScope> {
        let name = name.into();

        if self.finished.is_some() {
            warn!(scope = name.as_str(), "rejected scope entered after the session closed");
            return Err(Error::SessionClosed { scope: name });
        }

        let parent = self.open.last().map(|parent| (parent.id, parent.record));

        let record = match parent {
            Some((_, parent_record)) => self.child_record(parent_record, &name),
            None => {
                debug_assert!(self.records.is_empty(), "a session has exactly one root");
                self.records.push(RecordSlot::new(name.clone()));
                ROOT_RECORD
            }
        };

        let id = ScopeId {
            session: self.session,
            sequence: self.next_sequence,
        };

        self.next_sequence = self
            .next_sequence
            .checked_add(1)
            .expect("entering more than u64::MAX scopes is not a realistic scenario");

        self.open.push(OpenScope { id, record });

        trace!(scope = name.as_str(), depth = self.open.len(), "entered scope");

        Ok(TimingScope::new(
            id,
            name,
            parent.map(|(parent_id, _)| parent_id),
            self.platform.clone(),
        ))
    }

    /// Closes `scope` and folds its duration into the record for its name under its parent.
    ///
    /// Closing the root scope finishes the session.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StackDiscipline`] if `scope` is not the innermost open scope of this
    /// stack (including when it is already closed or belongs to another stack). The call is
    /// then rejected without touching any record.
    pub fn exit(&mut self, scope: &mut TimingScope) -> Result<()> {
        let record = match self.open.last() {
            Some(top) if top.id == scope.id() && scope.is_open() => top.record,
            _ => return Err(self.discipline_error(scope)),
        };

        self.open.pop();
        let duration = scope.close();
        self.slot_mut(record).times.push(duration);

        trace!(
            scope = scope.name(),
            depth = self.open.len(),
            ?duration,
            "exited scope"
        );

        if self.open.is_empty() {
            self.finish();
        }

        Ok(())
    }

    /// Opens a scope that exits when the returned guard is dropped.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the root scope of this session already closed.
    pub fn scope(&mut self, name: impl Into<String>) -> Result<ScopeGuard<'_>> {
        let scope = self.enter(name)?;
        Ok(ScopeGuard::new(self, scope))
    }

    /// Runs `f` inside a scope and returns its result.
    ///
    /// The scope exits even if `f` panics.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SessionClosed`] if the root scope of this session already closed, or
    /// [`Error::StackDiscipline`] if `f` leaked a child guard so that the scope could not exit.
    pub fn measure<R>(
        &mut self,
        name: impl Into<String>,
        f: impl FnOnce(&mut ScopeGuard<'_>) -> R,
    ) -> Result<R> {
        let mut guard = self.scope(name)?;
        let result = f(&mut guard);
        guard.finish()?;

        Ok(result)
    }

    /// Number of scopes currently open.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Whether the root scope has closed, finishing the session.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.finished.is_some()
    }

    /// The finished record tree, `None` until the root scope closes.
    #[must_use]
    pub fn record(&self) -> Option<&TaskRecord> {
        self.finished.as_ref()
    }

    /// Consumes the session, returning the finished record tree if the root scope closed.
    #[must_use]
    pub fn into_record(self) -> Option<TaskRecord> {
        self.finished
    }

    /// Builds the report tree of the finished session, with internal time shown for the root.
    ///
    /// Returns `None` until the root scope closes.
    #[must_use]
    pub fn to_report(&self) -> Option<ReportNode> {
        self.finished
            .as_ref()
            .map(|record| ReportNode::from_record(record).with_internal_time())
    }

    fn child_record(&mut self, parent: RecordIndex, name: &str) -> RecordIndex {
        if let Some(&existing) = self.slot(parent).children_by_name.get(name) {
            return existing;
        }

        let index = self.records.len();
        self.records.push(RecordSlot::new(name.to_string()));

        let parent_slot = self.slot_mut(parent);
        parent_slot.children.push(index);
        parent_slot.children_by_name.insert(name.to_string(), index);

        index
    }

    fn discipline_error(&self, scope: &TimingScope) -> Error {
        let top = self
            .open
            .last()
            .map(|top| self.slot(top.record).name.clone());

        warn!(
            scope = scope.name(),
            top = top.as_deref(),
            "rejected exit of a scope that is not the innermost open scope"
        );

        Error::StackDiscipline {
            scope: scope.name().to_string(),
            top,
        }
    }

    fn finish(&mut self) {
        let record = self.build_record(ROOT_RECORD, None);

        debug!(
            root = record.name(),
            records = self.records.len(),
            total = ?record.total_duration(),
            "session finished"
        );

        self.records.clear();
        self.finished = Some(record);
    }

    fn build_record(&self, index: RecordIndex, parent_total: Option<Duration>) -> TaskRecord {
        let slot = self.slot(index);
        let total = total_of(&slot.times);

        let ratio = parent_total.map_or(1.0, |parent_total| ratio_of(total, parent_total));

        let children = slot
            .children
            .iter()
            .filter(|&&child| !self.slot(child).times.is_empty())
            .map(|&child| self.build_record(child, Some(total)))
            .collect();

        TaskRecord::new(slot.name.clone(), slot.times.clone(), ratio, children)
    }

    fn slot(&self, index: RecordIndex) -> &RecordSlot {
        self.records
            .get(index)
            .expect("record indices only come from this session's arena")
    }

    fn slot_mut(&mut self, index: RecordIndex) -> &mut RecordSlot {
        self.records
            .get_mut(index)
            .expect("record indices only come from this session's arena")
    }
}

/// Share of `parent_total` taken by `total`. A zero-length parent is fully taken by its children.
fn ratio_of(total: Duration, parent_total: Duration) -> f64 {
    if parent_total.is_zero() {
        1.0
    } else {
        total.as_secs_f64() / parent_total.as_secs_f64()
    }
}
