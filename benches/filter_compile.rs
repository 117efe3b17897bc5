//! Benchmarks for filter parsing, compilation and in-memory evaluation.

use bson::{Document, doc};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use trailstore::mongodb::memory::run_pipeline;
use trailstore::mongodb::pipeline::build_pipeline;
use trailstore::mongodb::{compile_any, compile_filter};
use trailstore::query::{AnyFilter, ConcatenationFilter, Filter, FilterSet, Pagination};
use trailstore::Projection;

const FILTER_SET_JSON: &str = r#"{
    "filterSet": [
        { "key": "tags", "operation": "CONTAINS", "negate": false, "value": "photo" },
        {
            "booleanOperation": "OR",
            "filters": [
                { "key": "size", "operation": "GTE", "value": 2 },
                { "key": "public", "operation": "IS", "value": true }
            ]
        },
        {
            "key": "content.location",
            "operation": "RADIUS",
            "negate": true,
            "value": { "center": [13.418964, 52.530173], "radius": 10 }
        }
    ]
}"#;

fn berlin_polygon() -> Vec<[f64; 2]> {
    vec![
        [13.0, 52.3],
        [13.8, 52.3],
        [13.8, 52.7],
        [13.0, 52.7],
        [13.0, 52.3],
    ]
}

/// A filter set of `count` alternating leaves and concatenations.
fn create_filter_set(count: usize) -> FilterSet {
    (0..count)
        .map(|i| -> AnyFilter {
            if i % 2 == 0 {
                Filter::gte(format!("content.data.field_{}", i), i as i64).into()
            } else {
                ConcatenationFilter::or([
                    Filter::contains("tags", format!("tag_{}", i)),
                    Filter::is("public", true).negated(),
                ])
                .into()
            }
        })
        .collect()
}

fn create_documents(count: usize) -> Vec<Document> {
    (0..count)
        .map(|i| {
            let lon = 13.0 + (i % 100) as f64 * 0.01;
            doc! {
                "title": format!("record {}", i),
                "size": (i % 7) as i64,
                "public": i % 3 == 0,
                "tags": ["pic", if i % 2 == 0 { "photo" } else { "video" }],
                "content": {
                    "data": { "km": i as f64 * 0.5 },
                    "location": { "type": "Point", "coordinates": [lon, 52.5] },
                },
            }
        })
        .collect()
}

/// Benchmark parsing filter sets from JSON.
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_parse");

    group.bench_function("mixed_filter_set", |b| {
        b.iter(|| black_box(FilterSet::from_json_str(black_box(FILTER_SET_JSON))))
    });

    group.bench_function("invalid_operation", |b| {
        let input = r#"{ "filterSet": [ { "key": "size", "operation": "BETWEEN", "value": 1 } ] }"#;
        b.iter(|| black_box(FilterSet::from_json_str(black_box(input)).is_err()))
    });

    group.finish();
}

/// Benchmark compiling leaves and filter sets.
fn bench_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_compile");

    let contains = Filter::contains("tags", "photo").negated();
    group.bench_function("contains_negated", |b| {
        b.iter(|| black_box(compile_filter(black_box(&contains))))
    });

    let radius = Filter::radius("content.location", [13.418964, 52.530173], 10.0);
    group.bench_function("radius", |b| {
        b.iter(|| black_box(compile_filter(black_box(&radius))))
    });

    let area = Filter::area("content.location", berlin_polygon());
    group.bench_function("area", |b| {
        b.iter(|| black_box(compile_filter(black_box(&area))))
    });

    let concatenation: AnyFilter = ConcatenationFilter::and([
        Filter::contains("tags", "photo"),
        Filter::contains("tags", "test").negated(),
        Filter::lt("size", 10),
    ])
    .into();
    group.bench_function("concatenation_3", |b| {
        b.iter(|| black_box(compile_any(black_box(&concatenation))))
    });

    for size in [1, 10, 50].iter() {
        let filter_set = create_filter_set(*size);
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("pipeline", size), &filter_set, |b, fs| {
            b.iter(|| {
                black_box(build_pipeline(
                    fs,
                    &Pagination::default(),
                    Projection::MetadataOnly,
                ))
            })
        });
    }

    group.finish();
}

/// Benchmark running compiled pipelines over the in-memory collection.
fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_evaluate");

    let filter_set = FilterSet::from_json_str(FILTER_SET_JSON).expect("valid filter set");
    let pipeline = build_pipeline(&filter_set, &Pagination::default(), Projection::Full)
        .expect("compiles");
    let area_pipeline = build_pipeline(
        &FilterSet::new().push(Filter::area("content.location", berlin_polygon())),
        &Pagination::default(),
        Projection::Full,
    )
    .expect("compiles");

    for size in [100, 1_000].iter() {
        let documents = create_documents(*size);
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("mixed", size), &documents, |b, docs| {
            b.iter(|| black_box(run_pipeline(docs.clone(), &pipeline)))
        });

        group.bench_with_input(BenchmarkId::new("area", size), &documents, |b, docs| {
            b.iter(|| black_box(run_pipeline(docs.clone(), &area_pipeline)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_parse, bench_compile, bench_evaluate);
criterion_main!(benches);
