//! Strategy comparison benchmarks.
//!
//! Runs every executing strategy against a seeded temporary database at the
//! reference limits, one connection per strategy.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use sqlbench::config::ConnectionConfig;
use sqlbench::{connection, fixtures, QueryShape, StrategyKind};

const SEED_ROWS: usize = 30_000;

fn seeded_database() -> (tempfile::TempDir, String) {
    let dir = tempfile::tempdir().unwrap();
    let dsn = format!("bench@file({})/tickets", dir.path().display());
    fixtures::seed(&dsn, SEED_ROWS).unwrap();
    (dir, dsn)
}

fn bench_shape(c: &mut Criterion, shape: QueryShape) {
    let (_dir, dsn) = seeded_database();
    let mut group = c.benchmark_group(format!("strategies/{}", shape));

    for strategy in StrategyKind::ALL {
        for limit in [1u64, 100, 1000, 10_000] {
            let conn = connection::open(&ConnectionConfig::new(&dsn, strategy.driver_kind())).unwrap();
            let mut bound = strategy.prepare(conn, shape, limit).unwrap();

            group.bench_with_input(BenchmarkId::new(strategy.name(), limit), &limit, |b, _| {
                b.iter(|| {
                    let outcome = bound.execute().unwrap();
                    black_box(outcome.row_count());
                });
            });

            bound.close().unwrap();
        }
    }

    group.finish();
}

fn bench_tickets(c: &mut Criterion) {
    bench_shape(c, QueryShape::Tickets);
}

fn bench_ids(c: &mut Criterion) {
    bench_shape(c, QueryShape::Ids);
}

criterion_group!(benches, bench_tickets, bench_ids);
criterion_main!(benches);
