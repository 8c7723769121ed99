//! Criterion benchmarks for the accumulators.
//!
//! The schema fixture and the order values are built outside the benchmark
//! loop to measure only the tree walks.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use serde_json::{json, Value};
use std::fs;
use std::path::Path;

use faram_core::{
    accumulate_differential_errors, accumulate_errors, accumulate_values, compile_schema,
    AccumulateOptions, Schema,
};

/// Load and compile a schema fixture from the integration test fixtures directory.
fn load_schema(name: &str) -> Schema {
    let fixtures_dir = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures");
    let path = Path::new(fixtures_dir).join(name);
    let content = fs::read_to_string(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e));
    let document: Value = serde_json::from_str(&content)
        .unwrap_or_else(|e| panic!("Failed to parse fixture {}: {}", path.display(), e));
    compile_schema(&document)
        .unwrap_or_else(|e| panic!("Failed to compile fixture {}: {}", path.display(), e))
}

/// An order with `lines` product lines, every tenth one invalid.
fn order(lines: usize) -> Value {
    let lines: Vec<Value> = (0..lines)
        .map(|i| {
            json!({
                "sku": format!("SKU-{i}"),
                "kind": "product",
                "quantity": if i % 10 == 0 { json!(0) } else { json!(i) },
                "price": 9.5
            })
        })
        .collect();
    json!({
        "customer": { "name": "Ada Lovelace", "email": "ada@example.com" },
        "placedOn": "2024-05-01",
        "lines": lines
    })
}

fn bench_accumulate_errors(c: &mut Criterion) {
    let schema = load_schema("order.json");
    let value = order(1_000);

    c.bench_function("errors/full_1000_lines", |b| {
        b.iter(|| accumulate_errors(black_box(&value), black_box(&schema)))
    });
}

fn bench_differential_single_edit(c: &mut Criterion) {
    let schema = load_schema("order.json");
    let old = order(1_000);
    let old_error = accumulate_errors(&old, &schema);
    let mut new = old.clone();
    new["lines"][500]["quantity"] = json!(3);

    c.bench_function("errors/differential_one_edit_1000_lines", |b| {
        b.iter(|| {
            accumulate_differential_errors(
                black_box(&old),
                black_box(&new),
                black_box(old_error.as_ref()),
                black_box(&schema),
            )
        })
    });
}

fn bench_accumulate_values(c: &mut Criterion) {
    let schema = load_schema("order.json");
    let value = order(1_000);
    let options = AccumulateOptions::keep_falsy();

    c.bench_function("values/keep_falsy_1000_lines", |b| {
        b.iter(|| accumulate_values(black_box(Some(&value)), black_box(&schema), &options))
    });
}

criterion_group!(
    benches,
    bench_accumulate_errors,
    bench_differential_single_edit,
    bench_accumulate_values,
);
criterion_main!(benches);
