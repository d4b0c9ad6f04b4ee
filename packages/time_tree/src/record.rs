//! Finished timing records and their nested mapping form.

use std::time::Duration;

use serde_json::{Map, Value};

use crate::{Error, Result};

const UNNAMED_ROOT_PATH: &str = "<root>";

/// Aggregated durations of every scope that shared one name under one parent.
///
/// A `TaskRecord` tree is produced by a [`ScopeStack`](crate::ScopeStack) when its
/// root scope closes, or read back from the nested mapping produced by
/// [`to_mapping()`](Self::to_mapping). It is immutable.
///
/// # Examples
///
/// ```
/// use time_tree::ScopeStack;
///
/// let mut stack = ScopeStack::new();
/// stack
///     .measure("main", |main| {
///         for _ in 0..3 {
///             main.measure("step", |_| {}).unwrap();
///         }
///     })
///     .unwrap();
///
/// let record = stack.record().unwrap();
/// assert_eq!(record.name(), "main");
/// assert_eq!(record.child("step").unwrap().count(), 3);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct TaskRecord {
    name: String,

    // Closing order. Never empty.
    times: Vec<Duration>,

    ratio: f64,

    // First-seen order.
    children: Vec<TaskRecord>,
}

impl TaskRecord {
    pub(crate) fn new(
        name: String,
        times: Vec<Duration>,
        ratio: f64,
        children: Vec<Self>,
    ) -> Self {
        debug_assert!(!times.is_empty(), "a record exists only once a duration is recorded");

        Self {
            name,
            times,
            ratio,
            children,
        }
    }

    /// The scope name shared by every duration in this record.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every recorded duration, in the order the scopes closed.
    #[must_use]
    pub fn times(&self) -> &[Duration] {
        &self.times
    }

    /// Number of recorded durations.
    #[must_use]
    pub fn count(&self) -> usize {
        self.times.len()
    }

    /// Share of the parent record's total duration spent in this record, `1.0` for the root.
    #[must_use]
    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    /// Sum of all recorded durations.
    #[must_use]
    pub fn total_duration(&self) -> Duration {
        total_of(&self.times)
    }

    /// Child records in the order their names were first seen.
    #[must_use]
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Finds the child record with the given name.
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.name == name)
    }

    /// Exports the record tree as a nested mapping.
    ///
    /// Every node becomes an object with `name`, `times` (seconds), `count`, `ratio` and
    /// `subtasks` (an object keyed by child name, in first-seen order).
    ///
    /// # Examples
    ///
    /// ```
    /// use time_tree::{ScopeStack, TaskRecord};
    ///
    /// let mut stack = ScopeStack::new();
    /// stack.measure("main", |_| {}).unwrap();
    ///
    /// let mapping = stack.record().unwrap().to_mapping();
    /// assert_eq!(mapping["name"], "main");
    /// assert_eq!(mapping["count"], 1);
    ///
    /// let restored = TaskRecord::from_mapping(&mapping).unwrap();
    /// assert_eq!(restored.name(), "main");
    /// ```
    #[must_use]
    pub fn to_mapping(&self) -> Value {
        let subtasks = self
            .children
            .iter()
            .map(|child| (child.name.clone(), child.to_mapping()))
            .collect::<Map<_, _>>();

        let mut node = Map::new();
        node.insert("name".to_string(), Value::from(self.name.as_str()));
        node.insert(
            "times".to_string(),
            self.times
                .iter()
                .map(Duration::as_secs_f64)
                .collect::<Vec<_>>()
                .into(),
        );
        node.insert("count".to_string(), Value::from(self.count()));
        node.insert("ratio".to_string(), Value::from(self.ratio));
        node.insert("subtasks".to_string(), Value::Object(subtasks));

        Value::Object(node)
    }

    /// Reads a record tree from its nested mapping form.
    ///
    /// Each node must carry `name`, `times`, `count` and `ratio`; `subtasks` is optional.
    /// `times` may be a list of seconds or a single number of seconds. `count` must match
    /// the number of durations.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingField`] or [`Error::InvalidField`] naming the first offending
    /// node. No partial tree is returned.
    pub fn from_mapping(mapping: &Value) -> Result<Self> {
        let path = mapping
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or(UNNAMED_ROOT_PATH)
            .to_string();

        if !mapping.is_object() {
            return Err(Error::NotARecord {
                found: mapping.to_string(),
            });
        }

        Self::from_node(mapping, &path)
    }

    /// Parses JSON text into a record tree. See [`from_mapping()`](Self::from_mapping).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the text is not JSON, otherwise the same errors as
    /// [`from_mapping()`](Self::from_mapping).
    pub fn from_json(json: &str) -> Result<Self> {
        let mapping: Value = serde_json::from_str(json)?;
        Self::from_mapping(&mapping)
    }

    fn from_node(node: &Value, path: &str) -> Result<Self> {
        let Some(fields) = node.as_object() else {
            return Err(invalid(
                "subtasks",
                path,
                format!("expected an object but found {node}"),
            ));
        };

        let name = required(fields, "name", path)?
            .as_str()
            .ok_or_else(|| invalid("name", path, "expected a string".to_string()))?
            .to_string();

        let times = parse_times(required(fields, "times", path)?, path)?;

        let count = required(fields, "count", path)?
            .as_u64()
            .ok_or_else(|| invalid("count", path, "expected a non-negative integer".to_string()))?;

        if u64::try_from(times.len()).ok() != Some(count) {
            return Err(invalid(
                "count",
                path,
                format!("count is {count} but {} durations are recorded", times.len()),
            ));
        }

        let ratio = required(fields, "ratio", path)?
            .as_f64()
            .filter(|ratio| ratio.is_finite() && *ratio >= 0.0)
            .ok_or_else(|| invalid("ratio", path, "expected a non-negative number".to_string()))?;

        let children = match fields.get("subtasks") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Object(subtasks)) => subtasks
                .iter()
                .map(|(key, child)| {
                    let child_name = child
                        .get("name")
                        .and_then(Value::as_str)
                        .unwrap_or(key.as_str());

                    Self::from_node(child, &format!("{path}/{child_name}"))
                })
                .collect::<Result<Vec<_>>>()?,
            Some(other) => {
                return Err(invalid(
                    "subtasks",
                    path,
                    format!("expected an object keyed by name but found {other}"),
                ));
            }
        };

        Ok(Self::new(name, times, ratio, children))
    }
}

fn required<'a>(
    fields: &'a Map<String, Value>,
    field: &'static str,
    path: &str,
) -> Result<&'a Value> {
    fields.get(field).ok_or_else(|| Error::MissingField {
        field,
        path: path.to_string(),
    })
}

fn invalid(field: &'static str, path: &str, problem: String) -> Error {
    Error::InvalidField {
        field,
        path: path.to_string(),
        problem,
    }
}

fn parse_times(value: &Value, path: &str) -> Result<Vec<Duration>> {
    let times = match value {
        Value::Array(items) => items
            .iter()
            .map(|item| parse_seconds(item, path))
            .collect::<Result<Vec<_>>>()?,
        scalar => vec![parse_seconds(scalar, path)?],
    };

    if times.is_empty() {
        return Err(invalid(
            "times",
            path,
            "at least one duration is required".to_string(),
        ));
    }

    if times
        .iter()
        .try_fold(Duration::ZERO, |total, time| total.checked_add(*time))
        .is_none()
    {
        return Err(invalid(
            "times",
            path,
            "the durations add up to more than the longest representable duration".to_string(),
        ));
    }

    Ok(times)
}

/// Sum of `times`, saturating at the longest representable duration.
///
/// Imported records are validated to never saturate; only sums across several records can.
pub(crate) fn total_of(times: &[Duration]) -> Duration {
    times
        .iter()
        .fold(Duration::ZERO, |total, time| total.saturating_add(*time))
}

fn parse_seconds(value: &Value, path: &str) -> Result<Duration> {
    let seconds = value
        .as_f64()
        .ok_or_else(|| invalid("times", path, format!("expected seconds but found {value}")))?;

    Duration::try_from_secs_f64(seconds).map_err(|e| {
        invalid(
            "times",
            path,
            format!("{seconds} is not a valid duration in seconds: {e}"),
        )
    })
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use serde_json::json;

    use super::*;

    fn sample_mapping() -> Value {
        json!({
            "name": "main",
            "times": [10.0],
            "count": 1,
            "ratio": 1.0,
            "subtasks": {
                "load": {
                    "name": "load",
                    "times": [2.0, 3.0],
                    "count": 2,
                    "ratio": 0.5,
                    "subtasks": {}
                },
                "save": {
                    "name": "save",
                    "times": 2.0,
                    "count": 1,
                    "ratio": 0.2
                }
            }
        })
    }

    #[test]
    fn reads_nested_mapping_in_order() {
        let record = TaskRecord::from_mapping(&sample_mapping()).unwrap();

        assert_eq!(record.name(), "main");
        assert_eq!(record.total_duration(), Duration::from_secs(10));

        let names: Vec<_> = record.children().iter().map(TaskRecord::name).collect();
        assert_eq!(names, ["load", "save"]);

        let load = record.child("load").unwrap();
        assert_eq!(load.times(), [Duration::from_secs(2), Duration::from_secs(3)]);
        assert_eq!(load.count(), 2);
    }

    #[test]
    fn scalar_times_become_single_duration() {
        let record = TaskRecord::from_mapping(&sample_mapping()).unwrap();
        let save = record.child("save").unwrap();

        assert_eq!(save.times(), [Duration::from_secs(2)]);
        assert!(save.children().is_empty());
    }

    #[test]
    fn missing_field_names_node_path() {
        let mut mapping = sample_mapping();
        mapping["subtasks"]["load"]
            .as_object_mut()
            .unwrap()
            .remove("ratio");

        let error = TaskRecord::from_mapping(&mapping).unwrap_err();

        match error {
            Error::MissingField { field, path } => {
                assert_eq!(field, "ratio");
                assert_eq!(path, "main/load");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_root_name_uses_placeholder_path() {
        let mapping = json!({ "times": [1.0], "count": 1, "ratio": 1.0 });

        let error = TaskRecord::from_mapping(&mapping).unwrap_err();

        assert!(matches!(
            error,
            Error::MissingField { field: "name", ref path } if path == "<root>"
        ));
    }

    #[test]
    fn count_must_match_times() {
        let mut mapping = sample_mapping();
        mapping["count"] = json!(4);

        let error = TaskRecord::from_mapping(&mapping).unwrap_err();

        assert!(matches!(error, Error::InvalidField { field: "count", .. }));
    }

    #[test]
    fn empty_times_rejected() {
        let mapping = json!({ "name": "main", "times": [], "count": 0, "ratio": 1.0 });

        let error = TaskRecord::from_mapping(&mapping).unwrap_err();

        assert!(matches!(error, Error::InvalidField { field: "times", .. }));
    }

    #[test]
    fn negative_time_rejected() {
        let mapping = json!({ "name": "main", "times": [-1.0], "count": 1, "ratio": 1.0 });

        let error = TaskRecord::from_mapping(&mapping).unwrap_err();

        assert!(matches!(error, Error::InvalidField { field: "times", .. }));
    }

    #[test]
    fn non_object_subtask_rejected() {
        let mapping = json!({
            "name": "main",
            "times": [1.0],
            "count": 1,
            "ratio": 1.0,
            "subtasks": { "load": 5 }
        });

        let error = TaskRecord::from_mapping(&mapping).unwrap_err();

        assert!(matches!(
            error,
            Error::InvalidField { field: "subtasks", ref path, .. } if path == "main/load"
        ));
    }

    #[test]
    fn overflowing_total_rejected() {
        let mapping = json!({
            "name": "main",
            "times": [1.8e19, 1.8e19],
            "count": 2,
            "ratio": 1.0
        });

        let error = TaskRecord::from_mapping(&mapping).unwrap_err();

        assert!(matches!(
            error,
            Error::InvalidField { field: "times", ref path, .. } if path == "main"
        ));
    }

    #[test]
    fn non_object_root_rejected() {
        let error = TaskRecord::from_mapping(&json!([1.0, 2.0])).unwrap_err();

        assert!(matches!(error, Error::NotARecord { ref found } if found == "[1.0,2.0]"));
    }

    #[test]
    fn invalid_json_is_reported() {
        let error = TaskRecord::from_json("{ not json").unwrap_err();

        assert!(matches!(error, Error::Json(_)));
    }

    #[test]
    fn mapping_survives_export() {
        let record = TaskRecord::from_mapping(&sample_mapping()).unwrap();

        let restored = TaskRecord::from_mapping(&record.to_mapping()).unwrap();

        assert_eq!(restored, record);
    }
}
