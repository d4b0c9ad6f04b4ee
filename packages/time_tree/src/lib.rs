//! Nested, named timing scopes aggregated into a human-readable tree report.
//!
//! This package measures where wall-clock time goes across a call hierarchy. Code regions
//! are wrapped in named scopes that may nest; scopes that share a name under the same parent
//! are aggregated, so a loop body entered a thousand times becomes one line of the report
//! with its count and average duration.
//!
//! The core functionality includes:
//! - [`ScopeStack`] - A measurement session: opens and closes nested scopes
//! - [`ScopeGuard`] - Closes its scope when dropped and opens child scopes
//! - [`TaskRecord`] - The finished aggregated record tree, exportable as a nested mapping
//! - [`ReportNode`] - Derived statistics and tree rendering
//! - [`ReportFormat`] - Separator, prefix and precision used when rendering
//!
//! # Simple Usage
//!
//! ```
//! use time_tree::ScopeStack;
//!
//! # fn main() {
//! let mut stack = ScopeStack::new();
//!
//! {
//!     let mut main = stack.scope("main").unwrap();
//!
//!     for _ in 0..3 {
//!         let _step = main.scope("step").unwrap();
//!         std::hint::black_box(42 * 2);
//!     }
//! } // The root scope closes here, finishing the session.
//!
//! let report = stack.to_report().unwrap();
//! report.print_to_stdout();
//! # }
//! ```
//!
//! The output looks like this:
//!
//! ```text
//! main | 1.20 milliseconds
//! └── 95.00% step | 1.14 milliseconds | 3 times | avg 380.00 microseconds
//! └── 5.00% internal time: 60.00 microseconds
//! ```
//!
//! # Reports from recorded data
//!
//! A finished record tree can be exported as a nested mapping and turned into a report
//! later, independently of the session that measured it:
//!
//! ```
//! use time_tree::{ReportFormat, ReportNode, ScopeStack};
//!
//! # fn main() {
//! let mut stack = ScopeStack::new();
//! stack.measure("main", |_| {}).unwrap();
//!
//! let mapping = stack.record().unwrap().to_mapping();
//! let json = mapping.to_string();
//!
//! let report = ReportNode::from_json(&json).unwrap();
//! for line in report.lines(&ReportFormat::default().with_separator(" ; ")) {
//!     println!("{line}");
//! }
//! # }
//! ```
//!
//! # Threading
//!
//! A [`ScopeStack`] tracks one thread of control. To measure several threads, give each
//! thread its own stack; reports from different stacks are not merged.
//!
//! # Logging
//!
//! The package emits `tracing` events: scope entry and exit at trace level, session
//! completion at debug level and rejected calls or inconsistent data at warn level.

mod error;
mod format;
mod pal;
mod record;
mod report;
mod scope;
mod scope_stack;

pub use error::Error;
pub(crate) use error::Result;
pub use format::{ReportFormat, TimeUnit};
pub use record::TaskRecord;
pub use report::ReportNode;
pub use scope::{ScopeGuard, ScopeId, TimingScope};
pub use scope_stack::ScopeStack;
