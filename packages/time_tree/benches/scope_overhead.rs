//! Benchmarks to measure the compute overhead of `time_tree` logic itself.
//!
//! Scope benchmarks measure empty scopes - scopes that do not do any actual work but
//! still incur the bookkeeping overhead. Rendering benchmarks measure report output for
//! a fixed record tree.

#![allow(
    missing_docs,
    reason = "No need for API documentation in benchmark code"
)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use time_tree::{ReportFormat, ReportNode, ScopeStack};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("time_tree_overhead");

    group.bench_function("root_scope_empty", |b| {
        b.iter(|| {
            let mut stack = ScopeStack::new();
            stack.measure("root", |_| black_box(())).unwrap();
            black_box(stack);
        });
    });

    group.bench_function("nested_scopes_100_repeats", |b| {
        b.iter(|| {
            let mut stack = ScopeStack::new();
            stack
                .measure("root", |root| {
                    for _ in 0..100 {
                        root.measure("repeat", |repeat| {
                            repeat.measure("inner", |_| black_box(())).unwrap();
                        })
                        .unwrap();
                    }
                })
                .unwrap();
            black_box(stack);
        });
    });

    let report = ReportNode::from_mapping(&json!({
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
                "subtasks": {
                    "parse": { "name": "parse", "times": [4.0], "count": 1, "ratio": 0.8 },
                    "check": { "name": "check", "times": [0.5], "count": 1, "ratio": 0.1 }
                }
            },
            "save": { "name": "save", "times": [0.002], "count": 1, "ratio": 0.0002 }
        }
    }))
    .unwrap()
    .with_internal_time();

    let format = ReportFormat::default();

    group.bench_function("render_small_tree", |b| {
        b.iter(|| black_box(report.lines(&format)));
    });

    group.finish();
}
