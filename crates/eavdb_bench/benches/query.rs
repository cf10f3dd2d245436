//! Query benchmarks.
//!
//! Filters are chosen to show the cost of each narrowing shape: exact
//! narrowing (equality), presence-only narrowing (integer ranges) and a
//! disjunction mixing both.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use eavdb_bench::{memory_store, populate, sqlite_store, BENCH_KIND};
use eavdb_core::{EntityStore, Filter, FilterItem, IntegerOp, TextOp};

fn filters() -> Vec<(&'static str, Filter)> {
    let filter = |root: FilterItem| Filter::new(BENCH_KIND, root).unwrap();
    vec![
        ("kind_only", Filter::all(BENCH_KIND).unwrap()),
        ("integer_eq", filter(FilterItem::integer("n", IntegerOp::Eq, 42))),
        ("integer_gt", filter(FilterItem::integer("score", IntegerOp::Gt, 900))),
        ("text_contains", filter(FilterItem::text("name", TextOp::Contains, "ab"))),
        (
            "and_group",
            filter(FilterItem::and(
                FilterItem::boolean("active", true),
                FilterItem::integer("score", IntegerOp::Lt, -900),
            )),
        ),
        (
            "or_mixed",
            filter(FilterItem::or(
                FilterItem::integer("n", IntegerOp::Eq, 1),
                FilterItem::integer("score", IntegerOp::Gt, 990),
            )),
        ),
    ]
}

fn bench_backend(c: &mut Criterion, label: &str, open: fn() -> EntityStore) {
    let mut group = c.benchmark_group(format!("query_ids/{label}"));

    for entity_count in [100, 1_000, 10_000] {
        let store = open();
        populate(&store, entity_count);
        group.throughput(Throughput::Elements(entity_count as u64));

        for (name, filter) in filters() {
            group.bench_with_input(
                BenchmarkId::new(name, entity_count),
                &filter,
                |b, filter| {
                    b.iter(|| black_box(store.query_ids(black_box(filter)).unwrap()));
                },
            );
        }
    }
    group.finish();
}

fn bench_memory(c: &mut Criterion) {
    bench_backend(c, "memory", memory_store);
}

fn bench_sqlite(c: &mut Criterion) {
    bench_backend(c, "sqlite", sqlite_store);
}

/// Benchmark first-match lookups, which stop after one hit.
fn bench_query_first(c: &mut Criterion) {
    let store = sqlite_store();
    populate(&store, 10_000);
    let filter = Filter::all(BENCH_KIND).unwrap();

    c.bench_function("query_first/sqlite", |b| {
        b.iter(|| black_box(store.query_first(black_box(&filter)).unwrap()));
    });
}

/// Benchmark filter compilation.
fn bench_compile(c: &mut Criterion) {
    c.bench_function("filter_compile", |b| {
        b.iter(|| {
            let root = FilterItem::and(
                FilterItem::or(
                    FilterItem::text("name", TextOp::Contains, "x"),
                    FilterItem::boolean("active", false),
                ),
                FilterItem::integer("n", IntegerOp::Gt, 5),
            );
            black_box(Filter::new(BENCH_KIND, black_box(root)).unwrap())
        });
    });
}

criterion_group!(
    benches,
    bench_memory,
    bench_sqlite,
    bench_query_first,
    bench_compile
);
criterion_main!(benches);
