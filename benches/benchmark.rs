// Performance benchmarks: blocking vs the null index, parallel vs sequential scoring
use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use matchx::prelude::*;
use rand::prelude::*;
use rand::rngs::StdRng;
use std::collections::BTreeMap;

const FIRST: &[&str] = &["john", "jon", "mary", "marie", "ann", "anne", "bob", "robert", "li", "lee"];
const LAST: &[&str] = &["smith", "smyth", "jones", "johnson", "brown", "braun", "chan", "chen"];
const CITIES: &[&str] = &["oslo", "rome", "lima", "kyiv", "pune", "doha", "baku", "riga"];

fn generate_dataset(name: &str, size: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let records = (0..size)
        .map(|i| {
            Record::new(i as u64)
                .with_field("first", *FIRST.choose(&mut rng).unwrap_or(&"x"))
                .with_field("last", *LAST.choose(&mut rng).unwrap_or(&"x"))
                .with_field("city", *CITIES.choose(&mut rng).unwrap_or(&"x"))
                .with_field("age", rng.random_range(18i64..90))
        })
        .collect();
    Dataset::new(name, records).unwrap()
}

fn schema() -> SimilaritySchema {
    SimilaritySchema::new(BTreeMap::from([
        ("first".to_string(), FieldConfig::jaro_winkler()),
        ("last".to_string(), FieldConfig::jaro_winkler().weight(2.0)),
        ("age".to_string(), FieldConfig::relative().weight(0.5)),
    ]))
    .unwrap()
}

fn benchmark_blocking(c: &mut Criterion) {
    let mut group = c.benchmark_group("dedup_blocking");
    group.sample_size(10);

    for size in [200, 1000].iter() {
        let dataset = generate_dataset("people", *size, 7);

        group.bench_with_input(BenchmarkId::new("noop_index", size), size, |b, _| {
            b.iter_batched(
                || {
                    ThresholdMatcher::builder(NoopIndex)
                        .schema(schema())
                        .build_dedup(dataset.clone())
                        .unwrap()
                },
                |matcher| black_box(matcher.compute().unwrap().len()),
                BatchSize::SmallInput,
            );
        });

        group.bench_with_input(BenchmarkId::new("city_index", size), size, |b, _| {
            b.iter_batched(
                || {
                    ThresholdMatcher::builder(ColumnsIndex::new(["city"]))
                        .schema(schema())
                        .build_dedup(dataset.clone())
                        .unwrap()
                },
                |matcher| black_box(matcher.compute().unwrap().len()),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("match_scoring");
    group.sample_size(10);

    let left = generate_dataset("left", 1000, 11);
    let right = generate_dataset("right", 1000, 13);

    for parallel in [true, false] {
        let label = if parallel { "parallel" } else { "sequential" };
        group.bench_function(label, |b| {
            b.iter_batched(
                || {
                    ThresholdMatcher::builder(ColumnsIndex::new(["city"]))
                        .schema(schema())
                        .variator(Swap::new("first", "last"))
                        .options(MatchOptions {
                            parallel,
                            progress_log_every: 0,
                        })
                        .build_match(left.clone(), right.clone())
                        .unwrap()
                },
                |matcher| black_box(matcher.compute().unwrap().len()),
                BatchSize::SmallInput,
            );
        });
    }

    group.finish();
}

fn benchmark_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("cached_queries");

    let matcher = ThresholdMatcher::builder(ColumnsIndex::new(["city"]))
        .schema(schema())
        .build_dedup(generate_dataset("people", 1000, 3))
        .unwrap();
    matcher.compute().unwrap();
    let thresholds = Thresholds::at_least(0.85);

    group.bench_function("pairs_within_thresholds", |b| {
        b.iter(|| black_box(matcher.get_pairs_within_thresholds(&thresholds).unwrap().len()));
    });

    group.bench_function("clusters_within_threshold", |b| {
        b.iter(|| black_box(matcher.get_index_clusters_within_thresholds(&thresholds).unwrap().len()));
    });

    group.finish();
}

criterion_group!(benches, benchmark_blocking, benchmark_scoring, benchmark_queries);
criterion_main!(benches);
