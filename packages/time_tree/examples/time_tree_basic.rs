//! Simplified example demonstrating key `time_tree` types working together.
//!
//! This example shows how to use the main types in the `time_tree` package:
//! - `ScopeStack`: Opens and closes nested scopes for one measurement session
//! - `ScopeGuard`: Closes its scope when dropped
//! - `ReportNode`: Renders the aggregated tree
//!
//! Run with: `cargo run --example time_tree_basic`.

use std::thread;
use std::time::Duration;

use time_tree::{ReportFormat, ReportNode, ScopeStack};

fn main() {
    let mut stack = ScopeStack::new();

    {
        let mut build = stack.scope("build").unwrap();

        {
            let _parse = build.scope("parse").unwrap();
            thread::sleep(Duration::from_millis(30));
        }

        for file in 0..3_u64 {
            let mut compile = build.scope("compile").unwrap();
            thread::sleep(Duration::from_millis(10_u64.saturating_mul(file.saturating_add(1))));

            {
                let _optimize = compile.scope("optimize").unwrap();
                thread::sleep(Duration::from_millis(5));
            }

            {
                let _emit = compile.scope("emit").unwrap();
                thread::sleep(Duration::from_millis(2));
            }
        }

        let _link = build.scope("link").unwrap();
        thread::sleep(Duration::from_micros(800));
    } // The root scope closes here.

    let mut report = stack.to_report().unwrap();
    if let Some(compile) = report.child_mut("compile") {
        compile.set_show_internal_time(true);
    }

    println!("=== Live session ===");
    report.print_to_stdout();
    println!();

    // The same data can be exported and turned into a report elsewhere.
    let json = stack.record().unwrap().to_mapping().to_string();
    let restored = ReportNode::from_json(&json).unwrap();

    println!("=== Restored from JSON, custom format ===");
    let format = ReportFormat::default()
        .with_prefix("*")
        .with_separator(" ; ")
        .with_precision(1);

    for line in restored.lines(&format) {
        println!("{line}");
    }
}
