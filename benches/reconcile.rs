use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

use gig_reconcile::{
    Entity, EntityStore, InMemoryEntityStore, InMemoryNormalizedNameStore, MergingPolicy,
    NoopNormalizationService, Reconciler, ReconcilerConfig,
};

fn epoch() -> DateTime<Utc> {
    DateTime::UNIX_EPOCH + Duration::days(18_262)
}

fn make_reconciler(seed: usize) -> (Reconciler, Arc<InMemoryEntityStore>) {
    let entities = Arc::new(InMemoryEntityStore::new());
    for i in 0..seed {
        let entity = Entity::builder()
            .title(format!("Seed Organization {i}"))
            .source("bench")
            .source_date(epoch())
            .category("organization")
            .build();
        entities.create(entity).unwrap();
    }

    let reconciler = Reconciler::new(
        entities.clone(),
        Arc::new(InMemoryNormalizedNameStore::new()),
        Arc::new(NoopNormalizationService),
        Arc::new(MergingPolicy::new().ignoring("arbitrary-entities")),
    )
    .with_config(ReconcilerConfig {
        verified_sources: vec!["gazette".to_string()],
        ..ReconcilerConfig::default()
    })
    .unwrap();

    (reconciler, entities)
}

fn bench_add_create(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile/add");
    group.throughput(Throughput::Elements(1));

    group.bench_function("create_unnormalized", |b| {
        b.iter_custom(|iters| {
            // Fresh registry per sample so the search space does not grow across samples.
            let (reconciler, _) = make_reconciler(256);
            let start = Instant::now();
            for i in 0..iters {
                let record = Entity::builder()
                    .title(format!("Unseen Company {i}"))
                    .source("news")
                    .build();
                reconciler.add(record).unwrap();
            }
            start.elapsed()
        });
    });

    group.bench_function("update_fuzzy_variant", |b| {
        b.iter_custom(|iters| {
            let (reconciler, _) = make_reconciler(256);
            let start = Instant::now();
            for i in 0..iters {
                let record = Entity::builder()
                    .title("SEED ORGANIZATION 42.")
                    .source("news")
                    .source_date(epoch() + Duration::days(i64::try_from(i % 365).unwrap_or(0) + 1))
                    .build();
                reconciler.add(record).unwrap();
            }
            start.elapsed()
        });
    });

    group.bench_function("create_verified", |b| {
        b.iter_custom(|iters| {
            let (reconciler, _) = make_reconciler(0);
            let start = Instant::now();
            for i in 0..iters {
                let record = Entity::builder()
                    .title(format!("Gazetted Office {i}"))
                    .source("gazette/2020")
                    .source_date(epoch())
                    .build();
                reconciler.add(record).unwrap();
            }
            start.elapsed()
        });
    });

    group.finish();
}

fn bench_resolve_as_of(c: &mut Criterion) {
    let (reconciler, _) = make_reconciler(1024);
    let as_of = epoch() + Duration::days(30);
    c.bench_function("reconcile/resolve_as_of", |b| {
        b.iter(|| reconciler.resolve_as_of("Seed Organization 512", as_of).unwrap());
    });
}

criterion_group!(reconcile, bench_add_create, bench_resolve_as_of);
criterion_main!(reconcile);
