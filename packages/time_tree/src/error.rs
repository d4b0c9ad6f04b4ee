use thiserror::Error;

/// Errors that can occur when recording scopes or reading a timing record.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// A scope was exited while it was not the innermost open scope, or after the
    /// session had already closed.
    ///
    /// The session rejects the call and leaves every already-recorded duration intact.
    #[error("cannot exit scope '{scope}': {}", describe_top(.top.as_deref()))]
    StackDiscipline {
        /// Name of the scope the caller attempted to exit.
        scope: String,

        /// Name of the scope that is actually innermost, if any scope is open.
        top: Option<String>,
    },

    /// A scope was entered after the root scope of the session had closed.
    #[error("cannot enter scope '{scope}': the session closed when its root scope exited")]
    SessionClosed {
        /// Name of the scope the caller attempted to enter.
        scope: String,
    },

    /// A timing record mapping lacks a field that every node must carry.
    #[error("timing record at '{path}' is missing required field '{field}'")]
    MissingField {
        /// The missing field.
        field: &'static str,

        /// Slash-separated chain of node names leading to the offending node.
        path: String,
    },

    /// A timing record mapping carries a field with an unusable value.
    #[error("timing record at '{path}' has invalid field '{field}': {problem}")]
    InvalidField {
        /// The field with the unusable value.
        field: &'static str,

        /// Slash-separated chain of node names leading to the offending node.
        path: String,

        /// A human-readable description of the problem.
        problem: String,
    },

    /// The top level of a timing record mapping is not an object.
    #[error("a timing record must be an object but found {found}")]
    NotARecord {
        /// The value found instead, as JSON text.
        found: String,
    },

    /// The timing record text could not be parsed as JSON.
    #[error("timing record is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

fn describe_top(top: Option<&str>) -> String {
    top.map_or_else(
        || "no scope is open".to_string(),
        |top| format!("the innermost open scope is '{top}'"),
    )
}

/// A specialized `Result` type for `time_tree` operations, returning the crate's
/// [`Error`] type as the error value.
pub(crate) type Result<T> = std::result::Result<T, Error>;
