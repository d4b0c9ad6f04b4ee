//! Aggregated timing reports rendered as an indented tree.

use std::fmt::{self, Display};
use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::format::{ROOT_UNIT_PADDING, duration_text, percentage_text, scale};
use crate::record::total_of;
use crate::{ReportFormat, Result, TaskRecord, TimeUnit};

const BRANCH: &str = "├── ";
const TERMINAL: &str = "└── ";
const BRANCH_GUIDE: &str = "│   ";
const TERMINAL_GUIDE: &str = "    ";

/// Column widths shared by the lines of one sibling group.
#[derive(Clone, Copy, Debug)]
struct Columns {
    unit: usize,
    avg_duration: usize,
}

impl Columns {
    const ROOT: Self = Self {
        unit: ROOT_UNIT_PADDING,
        avg_duration: 0,
    };
}

/// One node of a timing report, with the statistics derived from its [`TaskRecord`].
///
/// A report is built once from a finished record tree (live via
/// [`ScopeStack::to_report()`](crate::ScopeStack::to_report), or from a nested mapping via
/// [`from_mapping()`](Self::from_mapping)) and is then read-only apart from choosing which
/// nodes show their internal time.
///
/// For human-readable output, use the `Display` trait implementation or
/// [`lines()`](Self::lines).
///
/// # Examples
///
/// ```
/// use time_tree::{ReportFormat, ReportNode};
///
/// let report = ReportNode::from_json(
///     r#"{
///         "name": "main",
///         "times": [4.0],
///         "count": 1,
///         "ratio": 1.0,
///         "subtasks": {
///             "load": { "name": "load", "times": [1.0, 2.0], "count": 2, "ratio": 0.75 }
///         }
///     }"#,
/// )
/// .unwrap()
/// .with_internal_time();
///
/// let lines = report.lines(&ReportFormat::default());
/// assert_eq!(lines[0], "main | 4.00 seconds");
/// assert_eq!(lines[1], "└── 75.00% load | 3.00 seconds | 2 times | avg 1.50 seconds");
/// assert_eq!(lines[2], "└── 25.00% internal time: 1.00 seconds");
/// ```
#[derive(Clone, Debug)]
pub struct ReportNode {
    name: String,

    // Never empty.
    times: Vec<Duration>,

    ratio: f64,
    children: Vec<ReportNode>,

    show_internal_time: bool,

    // Width the name is padded to; 0 means unpadded.
    padding_name: usize,
}

impl ReportNode {
    /// Builds the report tree for a finished record tree.
    ///
    /// No node shows its internal time until asked to with
    /// [`with_internal_time()`](Self::with_internal_time) or
    /// [`set_show_internal_time()`](Self::set_show_internal_time).
    #[must_use]
    pub fn from_record(record: &TaskRecord) -> Self {
        Self::build(record, 0)
    }

    /// Reads a nested mapping (see [`TaskRecord::from_mapping()`]) and builds its report tree.
    ///
    /// # Errors
    ///
    /// Returns the validation errors of [`TaskRecord::from_mapping()`].
    pub fn from_mapping(mapping: &Value) -> Result<Self> {
        TaskRecord::from_mapping(mapping).map(|record| Self::from_record(&record))
    }

    /// Parses JSON text holding a nested mapping and builds its report tree.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`TaskRecord::from_json()`].
    pub fn from_json(json: &str) -> Result<Self> {
        TaskRecord::from_json(json).map(|record| Self::from_record(&record))
    }

    fn build(record: &TaskRecord, padding_name: usize) -> Self {
        // Each child is padded to the longest sibling name seen up to and including itself.
        let mut padding_children = 0;

        let children = record
            .children()
            .iter()
            .map(|child| {
                padding_children = padding_children.max(child.name().chars().count());
                Self::build(child, padding_children)
            })
            .collect();

        Self {
            name: record.name().to_string(),
            times: record.times().to_vec(),
            ratio: record.ratio(),
            children,
            show_internal_time: false,
            padding_name,
        }
    }

    /// The scope name of this node.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every recorded duration, in closing order.
    #[must_use]
    pub fn times(&self) -> &[Duration] {
        &self.times
    }

    /// Number of recorded durations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.times.len()
    }

    /// Share of the parent's total duration, `1.0` for the root.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Child nodes in first-seen order.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Finds the child node with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Finds the child node with the given name for modification.
    #[must_use]
    pub fn child_mut(&mut self, name: &str) -> Option<&mut Self> {
        self.children.iter_mut().find(|child| child.name == name)
    }

    /// Sum of all recorded durations.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        total_of(&self.times)
    }

    /// Mean of the recorded durations.
    #[must_use]
    pub fn avg_duration(&self) -> Duration {
        let total = self.total_duration();
        let count = self.count();

        match u32::try_from(count) {
            Ok(count) => total
                .checked_div(count)
                .expect("a report node always has at least one duration"),
            Err(_) => {
                #[expect(
                    clippy::cast_precision_loss,
                    reason = "more than u32::MAX durations; a rounded divisor is close enough"
                )]
                let count = count as f64;

                total.div_f64(count)
            }
        }
    }

    /// The total duration scaled to its display unit.
    #[must_use]
    pub fn formatted_duration(&self) -> (f64, TimeUnit) {
        scale(self.total_duration())
    }

    /// The mean duration as display text, e.g. `1.50 seconds`.
    #[must_use]
    pub fn formatted_avg_duration(&self, precision: usize) -> String {
        duration_text(self.avg_duration(), precision)
    }

    /// Time spent in this node outside of its children.
    ///
    /// If the children's totals exceed this node's total (only possible with inconsistent
    /// external data), the internal time is clamped to zero and a warning is logged. The
    /// overshoot is available from [`internal_time_excess()`](Self::internal_time_excess).
    #[must_use]
    pub fn internal_time(&self) -> Duration {
        let total = self.total_duration();
        let children_total = self.children_total();

        if children_total > total {
            warn!(
                node = self.name.as_str(),
                ?total,
                ?children_total,
                "children take longer than their parent; internal time clamped to zero"
            );
        }

        total.saturating_sub(children_total)
    }

    /// How far the children's totals exceed this node's total, zero for consistent data.
    #[must_use]
    pub fn internal_time_excess(&self) -> Duration {
        self.children_total().saturating_sub(self.total_duration())
    }

    /// Internal time as a share of this node's total duration, zero for a zero-length node.
    #[must_use]
    pub fn internal_time_ratio(&self) -> f64 {
        self.share_of_total(self.internal_time())
    }

    fn share_of_total(&self, duration: Duration) -> f64 {
        let total = self.total_duration();

        if total.is_zero() {
            0.0
        } else {
            duration.as_secs_f64() / total.as_secs_f64()
        }
    }

    /// Whether the rendered report includes an internal time line for this node.
    #[must_use]
    pub fn shows_internal_time(&self) -> bool {
        self.show_internal_time
    }

    /// Chooses whether the rendered report includes an internal time line for this node.
    ///
    /// The line follows the node's children. A leaf node shows it directly below its own line.
    pub fn set_show_internal_time(&mut self, show: bool) {
        self.show_internal_time = show;
    }

    /// Returns the node with its internal time line shown.
    #[must_use]
    pub fn with_internal_time(mut self) -> Self {
        self.show_internal_time = true;
        self
    }

    fn children_total(&self) -> Duration {
        self.children
            .iter()
            .map(Self::total_duration)
            .fold(Duration::ZERO, Duration::saturating_add)
    }

    /// Renders the node and its descendants as lines of an ASCII tree.
    ///
    /// Rendering does not change the node, so rendering twice yields the same lines.
    #[must_use]
    pub fn lines(&self, format: &ReportFormat) -> Vec<String> {
        let mut lines = Vec::new();
        self.write_lines(format, |line| lines.push(line));
        lines
    }

    /// Renders the node and its descendants, handing each finished line to `sink`.
    pub fn write_lines(&self, format: &ReportFormat, mut sink: impl FnMut(String)) {
        sink(self.line(format, Columns::ROOT));
        self.write_descendants(format, "", &mut sink);
    }

    /// Prints the report to stdout.
    #[cfg_attr(test, mutants::skip)] // Stdout output is checked manually.
    pub fn print_to_stdout(&self) {
        self.write_lines(&ReportFormat::default(), |line| println!("{line}"));
    }

    // `indent` is the indentation of this node's children.
    fn write_descendants<F>(&self, format: &ReportFormat, indent: &str, sink: &mut F)
    where
        F: FnMut(String),
    {
        let precision = format.precision();

        let columns = Columns {
            unit: self
                .children
                .iter()
                .map(|child| child.formatted_duration().1.label().len())
                .max()
                .unwrap_or(ROOT_UNIT_PADDING),
            avg_duration: self
                .children
                .iter()
                .map(|child| child.formatted_avg_duration(precision).chars().count())
                .max()
                .unwrap_or(0),
        };

        let last_index = self.children.len().saturating_sub(1);

        for (index, child) in self.children.iter().enumerate() {
            // A child with several children of its own also gets the terminal connector.
            let terminal = index == last_index || child.children.len() > 1;

            let (connector, guide) = if terminal {
                (TERMINAL, TERMINAL_GUIDE)
            } else {
                (BRANCH, BRANCH_GUIDE)
            };

            sink(format!("{indent}{connector}{}", child.line(format, columns)));

            if !child.children.is_empty() || child.show_internal_time {
                child.write_descendants(format, &format!("{indent}{guide}"), sink);
            }
        }

        if self.show_internal_time {
            let internal_time = self.internal_time();

            sink(format!(
                "{indent}{TERMINAL}{} internal time: {}",
                percentage_text(self.share_of_total(internal_time), precision),
                duration_text(internal_time, precision)
            ));
        }
    }

    fn line(&self, format: &ReportFormat, columns: Columns) -> String {
        let precision = format.precision();

        let ratio = if self.ratio < 1.0 {
            format!("{} ", percentage_text(self.ratio, precision))
        } else {
            String::new()
        };

        let (value, unit) = self.formatted_duration();
        let repeated = self.count() > 1;

        let fields = [
            format.prefix().to_string(),
            format!("{ratio}{:width$}", self.name, width = self.padding_name),
            format!("{value:.precision$} {unit:width$}", width = columns.unit),
            if repeated {
                format!("{} times", self.count())
            } else {
                String::new()
            },
            if repeated {
                format!(
                    "avg {:width$}",
                    self.formatted_avg_duration(precision),
                    width = columns.avg_duration
                )
            } else {
                String::new()
            },
        ];

        fields
            .into_iter()
            .filter(|field| !field.is_empty())
            .collect::<Vec<_>>()
            .join(format.separator())
    }
}

impl Display for ReportNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.lines(&ReportFormat::default()) {
            writeln!(f, "{line}")?;
        }

        Ok(())
    }
}
