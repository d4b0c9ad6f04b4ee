//! Text formatting of durations and ratios.

use std::fmt::{self, Display};
use std::time::Duration;

use serde::{Deserialize, Serialize};

const MICROS_PER_SECOND: f64 = 1_000_000.0;
const MILLIS_PER_SECOND: f64 = 1_000.0;

/// Width of the widest unit label a root line pads its unit column to.
pub(crate) const ROOT_UNIT_PADDING: usize = TimeUnit::Seconds.label().len();

/// The unit a duration is displayed in.
///
/// Durations are scaled to the largest unit in which the value is at least one:
/// 1 s and more display in seconds, 1 ms and more in milliseconds, anything
/// shorter (zero included) in microseconds.
///
/// # Examples
///
/// ```
/// use std::time::Duration;
///
/// use time_tree::TimeUnit;
///
/// assert_eq!(TimeUnit::for_duration(Duration::from_secs(5)), TimeUnit::Seconds);
/// assert_eq!(TimeUnit::for_duration(Duration::from_millis(500)), TimeUnit::Milliseconds);
/// assert_eq!(TimeUnit::for_duration(Duration::from_micros(500)), TimeUnit::Microseconds);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub enum TimeUnit {
    /// Whole seconds.
    Seconds,

    /// Thousandths of a second.
    Milliseconds,

    /// Millionths of a second.
    Microseconds,
}

impl TimeUnit {
    /// Selects the unit that `duration` is displayed in.
    #[must_use]
    pub fn for_duration(duration: Duration) -> Self {
        if duration >= Duration::from_secs(1) {
            Self::Seconds
        } else if duration >= Duration::from_millis(1) {
            Self::Milliseconds
        } else {
            Self::Microseconds
        }
    }

    /// The label printed after a value in this unit.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Seconds => "seconds",
            Self::Milliseconds => "milliseconds",
            Self::Microseconds => "microseconds",
        }
    }

    /// Expresses `duration` as a number of this unit.
    #[must_use]
    pub fn value_of(self, duration: Duration) -> f64 {
        let seconds = duration.as_secs_f64();

        match self {
            Self::Seconds => seconds,
            Self::Milliseconds => seconds * MILLIS_PER_SECOND,
            Self::Microseconds => seconds * MICROS_PER_SECOND,
        }
    }
}

impl Display for TimeUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // `pad` so that width specifiers in the caller's format string apply.
        f.pad(self.label())
    }
}

/// Scales `duration` to its display unit, returning the value in that unit.
#[must_use]
pub(crate) fn scale(duration: Duration) -> (f64, TimeUnit) {
    let unit = TimeUnit::for_duration(duration);
    (unit.value_of(duration), unit)
}

/// Formats `duration` as `<value> <unit>` in its display unit.
#[must_use]
pub(crate) fn duration_text(duration: Duration, precision: usize) -> String {
    let (value, unit) = scale(duration);
    format!("{value:.precision$} {unit}")
}

/// Formats a 0..=1 ratio as a percentage.
#[must_use]
pub(crate) fn percentage_text(ratio: f64, precision: usize) -> String {
    format!("{:.precision$}%", ratio * 100.0)
}

/// Text layout settings applied when rendering a report.
///
/// The defaults produce lines such as
/// `25.00% load | 1.50 seconds | 3 times | avg 500.00 milliseconds`.
/// The type can be deserialized from an application's own configuration; absent fields take
/// their default values.
///
/// # Examples
///
/// ```
/// use time_tree::ReportFormat;
///
/// let format = ReportFormat::default().with_separator(" ; ").with_precision(3);
///
/// assert_eq!(format.separator(), " ; ");
/// assert_eq!(format.precision(), 3);
/// assert_eq!(format.prefix(), "");
/// ```
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct ReportFormat {
    prefix: String,
    separator: String,
    precision: usize,
}

impl ReportFormat {
    /// Sets the text emitted as the first field of every node line. Empty means no field.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Sets the text placed between the fields of a node line.
    #[must_use]
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Sets the number of digits after the decimal point for durations and percentages.
    #[must_use]
    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    /// The text emitted as the first field of every node line.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The text placed between the fields of a node line.
    #[must_use]
    pub fn separator(&self) -> &str {
        &self.separator
    }

    /// Digits after the decimal point for durations and percentages.
    #[must_use]
    pub fn precision(&self) -> usize {
        self.precision
    }
}

impl Default for ReportFormat {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            separator: " | ".to_string(),
            precision: 2,
        }
    }
}
