// Copyright 2026 Layne Penney
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Benchmarks for metadata sanitization and record building.
//!
//! Run with: `cargo bench --bench sanitize`

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use tracekit::report::{NoopSink, Telemetry};
use tracekit::sanitize::{Redactor, Sanitizer};
use tracekit::Value;

fn flat_map(width: usize) -> Value {
    let map = Value::empty_map();
    for i in 0..width {
        map.insert(format!("field_{}", i), format!("value {}", i));
    }
    map.insert("password", "hunter2");
    map
}

fn nested(levels: usize) -> Value {
    let mut value = Value::map([("leaf", 1)]);
    for i in 0..levels {
        value = Value::map([("level", Value::from(i)), ("child", value)]);
    }
    value
}

fn cyclic_graph(nodes: usize) -> Value {
    let all: Vec<Value> = (0..nodes).map(|i| Value::map([("id", i)])).collect();
    for (i, node) in all.iter().enumerate() {
        node.insert("next", all[(i + 1) % nodes].clone());
    }
    Value::list(all)
}

fn bench_sanitize(c: &mut Criterion) {
    let mut group = c.benchmark_group("sanitize");
    let sanitizer = Sanitizer::default();

    for width in [8, 64, 512] {
        let value = flat_map(width);
        group.throughput(Throughput::Elements(width as u64));
        group.bench_with_input(BenchmarkId::new("flat_map", width), &value, |b, value| {
            b.iter(|| black_box(sanitizer.sanitize(value)));
        });
    }

    let deep = nested(100);
    group.bench_function("nested_truncated", |b| {
        b.iter(|| black_box(sanitizer.sanitize(&deep)));
    });

    let graph = cyclic_graph(64);
    group.bench_function("cyclic_graph", |b| {
        b.iter(|| black_box(sanitizer.sanitize(&graph)));
    });

    let patterns = Sanitizer::new(
        5,
        Redactor::new()
            .with_patterns(["^x-internal-", "_secret$"])
            .expect("valid patterns"),
    );
    let value = flat_map(64);
    group.bench_function("flat_map_with_patterns", |b| {
        b.iter(|| black_box(patterns.sanitize(&value)));
    });

    group.finish();
}

fn bench_reporter(c: &mut Criterion) {
    let mut group = c.benchmark_group("reporter");
    let telemetry = Telemetry::new(Arc::new(NoopSink));
    let meta = flat_map(16);

    group.bench_function("report_info_with_metadata", |b| {
        b.iter(|| telemetry.report_info(black_box("tick"), Some("bench"), Some(&meta)));
    });

    group.bench_function("span_push_pop", |b| {
        b.iter(|| {
            telemetry.start_span(black_box("op"));
            telemetry.end_span();
        });
    });

    group.bench_function("timer_start_end", |b| {
        b.iter(|| {
            telemetry.start_timer(black_box("op"));
            telemetry.end_timer("op", None, None);
        });
    });

    group.finish();
}

criterion_group!(benches, bench_sanitize, bench_reporter);
criterion_main!(benches);
