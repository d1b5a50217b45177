//! Design/response benchmarks
//!
//! Benchmarks for the three pipeline stages:
//! - Segmentation (predecessor walking, gap breaking)
//! - Assembly (finite differences over the feature dimension)
//! - End-to-end calculation from a raw metadata batch
//!
//! Toyota Way: Measure before optimizing (Genchi Genbutsu)

use arrow::array::{ArrayRef, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use trueno_design::assembly::assemble;
use trueno_design::segmentation::segment;
use trueno_design::{
    calculate_design_and_response, DesignResponseConfig, ExpressionTable, SampleRecord,
    TerminalPolicy,
};

/// Samples per time series in generated experiments
const SERIES_LENGTH: usize = 8;

/// Generate an experiment of `series` time series plus as many steady-state samples
fn create_experiment(series: usize, features: usize) -> (Vec<SampleRecord>, ExpressionTable) {
    let mut rng = StdRng::seed_from_u64(42);
    let mut records = Vec::new();
    let mut columns = Vec::new();

    for s in 0..series {
        for t in 0..SERIES_LENGTH {
            let name = format!("ts{s}_t{t}");
            let record = if t == 0 {
                SampleRecord::builder(&name).time_series(true).build()
            } else {
                // Occasional long gaps exercise series breaking
                let delta_t = if rng.gen_bool(0.1) { 200.0 } else { rng.gen_range(5.0..60.0) };
                SampleRecord::builder(&name)
                    .predecessor(format!("ts{s}_t{}", t - 1), delta_t)
                    .time_series(true)
                    .build()
            };
            records.push(record);
            columns.push((name, (0..features).map(|_| rng.gen_range(0.0..10.0)).collect()));
        }

        let name = format!("ss{s}");
        records.push(SampleRecord::new(&name));
        columns.push((name, (0..features).map(|_| rng.gen_range(0.0..10.0)).collect()));
    }

    let expression = ExpressionTable::from_columns(
        "gene",
        (0..features).map(|i| format!("gene{i}")).collect(),
        columns,
    )
    .unwrap();
    (records, expression)
}

/// Convert records back to a raw metadata batch
fn to_metadata_batch(records: &[SampleRecord]) -> RecordBatch {
    let schema = Arc::new(Schema::new(vec![
        Field::new("condName", DataType::Utf8, false),
        Field::new("prevCol", DataType::Utf8, true),
        Field::new("del.t", DataType::Utf8, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(
            records.iter().map(SampleRecord::condition_name),
        )),
        Arc::new(records.iter().map(SampleRecord::prev_condition).collect::<StringArray>()),
        Arc::new(
            records
                .iter()
                .map(|r| r.delta_t().map(|dt| dt.to_string()))
                .collect::<StringArray>(),
        ),
    ];
    RecordBatch::try_new(schema, columns).unwrap()
}

/// Benchmark segmentation
fn bench_segmentation(c: &mut Criterion) {
    let mut group = c.benchmark_group("segmentation");

    for series in [10, 100, 1_000].iter() {
        let (records, _) = create_experiment(*series, 1);

        group.bench_with_input(BenchmarkId::from_parameter(series), series, |b, _| {
            b.iter(|| {
                let seg = segment(records.clone(), 110.0, 0.0).unwrap();
                black_box(seg);
            });
        });
    }

    group.finish();
}

/// Benchmark assembly over the feature dimension
fn bench_assembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("assembly");

    for features in [1_000, 10_000, 50_000].iter() {
        let (records, expression) = create_experiment(10, *features);
        let seg = segment(records, 110.0, 0.0).unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(features), features, |b, _| {
            b.iter(|| {
                let result = assemble(&seg, &expression, 45.0, TerminalPolicy::Exclude).unwrap();
                black_box(result);
            });
        });
    }

    group.finish();
}

/// Benchmark the full calculation from a raw metadata batch
fn bench_end_to_end(c: &mut Criterion) {
    let (records, expression) = create_experiment(50, 5_000);
    let metadata = to_metadata_batch(&records);
    let config = DesignResponseConfig::default();

    c.bench_function("end_to_end_50_series_5000_genes", |b| {
        b.iter(|| {
            let result = calculate_design_and_response(&metadata, &expression, &config).unwrap();
            black_box(result);
        });
    });
}

criterion_group!(benches, bench_segmentation, bench_assembly, bench_end_to_end);
criterion_main!(benches);
