//! Message store benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use msgstore_bench::{entity_on_shard, generate_entities, random_entity, NOW};
use msgstore_core::{shard_key, MessageStore, StoreConfig};
use tempfile::TempDir;

/// Benchmark saves that stay in memory.
fn bench_save_memory(c: &mut Criterion) {
    let mut group = c.benchmark_group("save_memory");

    for size in [64, 256, 1024].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let store =
                MessageStore::open_in_memory(StoreConfig::default().shard_capacity(usize::MAX))
                    .unwrap();
            b.iter(|| {
                black_box(store.save(random_entity(size)));
            });
        });
    }

    group.finish();
}

/// Benchmark saves that go to an on-disk overflow log.
fn bench_save_overflow(c: &mut Criterion) {
    let mut group = c.benchmark_group("save_overflow");
    group.sample_size(20);

    group.bench_function("file_256", |b| {
        let temp_dir = TempDir::new().unwrap();
        let store = MessageStore::open(
            StoreConfig::default()
                .shard_capacity(1)
                .overflow_dir(temp_dir.path()),
        )
        .unwrap();
        // Fill one shard so the store switches to overflow.
        store.save(entity_on_shard(0, 16));
        store.save(entity_on_shard(0, 16));

        b.iter(|| {
            black_box(store.save(random_entity(256)));
        });
    });

    group.finish();
}

/// Benchmark lookups of resident messages.
fn bench_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("query");

    for count in [1_000, 10_000].iter() {
        group.bench_with_input(BenchmarkId::from_parameter(count), count, |b, &count| {
            let store = MessageStore::open_in_memory(StoreConfig::default()).unwrap();
            let entities = generate_entities(count, 64);
            let ids: Vec<String> = entities.iter().map(|e| e.message_id.clone()).collect();
            for e in entities {
                store.save(e);
            }

            let mut idx = 0;
            b.iter(|| {
                let found = store.query(black_box(&ids[(idx * 7) % count]));
                idx = (idx + 1) % count;
                black_box(found);
            });
        });
    }

    group.finish();
}

/// Benchmark a redelivery page over a populated shard.
fn bench_page_query(c: &mut Criterion) {
    let mut group = c.benchmark_group("page_query");

    for resident in [100, 1_000, 5_000].iter() {
        group.throughput(Throughput::Elements(*resident as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(resident),
            resident,
            |b, &resident| {
                let store = MessageStore::open_in_memory(StoreConfig::default()).unwrap();
                for _ in 0..resident {
                    store.save(entity_on_shard(5, 64));
                }
                let key = shard_key(5);

                b.iter(|| {
                    let page = store.page_query_entity(&key, black_box(NOW), 0, 50);
                    black_box(page);
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_save_memory,
    bench_save_overflow,
    bench_query,
    bench_page_query
);
criterion_main!(benches);
