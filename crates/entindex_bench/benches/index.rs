//! Index operation benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use entindex_bench::utils::{loaded_engine, random_snapshots, release_fraction};
use entindex_core::KeyValue;
use entindex_testkit::{day, snapshot_engine, OwnerCache};

/// Benchmark registering entities.
fn bench_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("add");

    for count in [100, 1_000, 10_000].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let snapshots = random_snapshots(count, 64);
            b.iter_batched(
                || {
                    let mut owner = OwnerCache::new();
                    let handles: Vec<_> = snapshots
                        .iter()
                        .cloned()
                        .map(|s| owner.hold(s))
                        .collect();
                    (snapshot_engine(), owner, handles)
                },
                |((mut engine, _), owner, handles)| {
                    for handle in &handles {
                        engine.add(black_box(handle)).unwrap();
                    }
                    (engine, owner)
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Benchmark exact and prefix lookups.
fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup");
    let mut loaded = loaded_engine(10_000, 64);

    group.bench_function("prefix", |b| {
        let prefix = [KeyValue::Integer(7)];
        b.iter(|| {
            black_box(loaded.engine.get_by(loaded.by_account, &prefix).unwrap());
        });
    });

    group.bench_function("as_of", |b| {
        let prefix = [KeyValue::Integer(7)];
        let at = KeyValue::Timestamp(day(180));
        b.iter(|| {
            black_box(loaded.engine.get_at(loaded.by_account, &prefix, &at).unwrap());
        });
    });
    group.finish();
}

/// Benchmark range scans of increasing width.
fn bench_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("range");
    let mut loaded = loaded_engine(10_000, 4);
    let prefix = [KeyValue::Integer(1)];

    for width in [7i64, 30, 180].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(width), width, |b, &width| {
            let lo = KeyValue::Timestamp(day(100));
            let hi = KeyValue::Timestamp(day(100 + width));
            b.iter(|| {
                black_box(
                    loaded
                        .engine
                        .get_over(loaded.by_account, &prefix, &lo, &hi)
                        .unwrap(),
                );
            });
        });
    }
    group.finish();
}

/// Benchmark a full sweep after releasing part of the owner's entities.
fn bench_prune(c: &mut Criterion) {
    let mut group = c.benchmark_group("prune");

    for fraction in [0.1f64, 0.5, 0.9].iter() {
        group.bench_with_input(
            BenchmarkId::from_parameter(fraction),
            fraction,
            |b, &fraction| {
                b.iter_batched(
                    || {
                        let mut loaded = loaded_engine(5_000, 64);
                        release_fraction(&mut loaded.owner, fraction);
                        loaded
                    },
                    |mut loaded| {
                        black_box(loaded.engine.prune());
                        loaded
                    },
                    criterion::BatchSize::SmallInput,
                );
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_add, bench_lookup, bench_range, bench_prune);
criterion_main!(benches);
