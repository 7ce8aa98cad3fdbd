//! Segment log and codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use msgstore_bench::{generate_entities, random_body, random_entity};
use msgstore_core::segment::{scan_chunks, Chunk};
use msgstore_core::{MessageEntity, SegmentLog, SegmentManager};
use tempfile::TempDir;

/// Benchmark entity encoding and decoding.
fn bench_entity_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("entity_codec");

    for size in [64, 1024, 4096].iter() {
        let entity = random_entity(*size);
        let encoded = entity.encode().unwrap();
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &entity, |b, entity| {
            b.iter(|| black_box(entity.encode().unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, bytes| {
            b.iter(|| black_box(MessageEntity::decode(black_box(bytes)).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark chunk framing and segment scans.
fn bench_chunks(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunks");
    let payload = random_body(512);

    group.bench_function("encode_512", |b| {
        b.iter(|| black_box(Chunk::encode(0, black_box(&payload)).unwrap()));
    });

    let mut segment = Vec::new();
    for seq in 0..1_000 {
        segment.extend_from_slice(&Chunk::encode(seq, &payload).unwrap());
    }
    group.throughput(Throughput::Bytes(segment.len() as u64));
    group.bench_function("scan_1000x512", |b| {
        b.iter(|| black_box(scan_chunks(black_box(&segment))));
    });

    group.finish();
}

/// Benchmark appends to in-memory and on-disk logs.
fn bench_log_append(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_append");
    group.sample_size(30);
    let payload = random_body(256);

    group.bench_function("inmemory_256", |b| {
        let log = SegmentManager::in_memory();
        log.start().unwrap();
        b.iter(|| log.append(black_box(&payload)).unwrap());
    });

    group.bench_function("file_256", |b| {
        let temp_dir = TempDir::new().unwrap();
        let log = SegmentManager::on_disk(temp_dir.path());
        log.start().unwrap();
        b.iter(|| log.append(black_box(&payload)).unwrap());
    });

    group.finish();
}

/// Benchmark loading and removing the oldest segment, as recovery does.
fn bench_load_segment(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_segment");
    group.sample_size(20);

    let encoded: Vec<Vec<u8>> = generate_entities(1_000, 128)
        .iter()
        .map(|e| e.encode().unwrap())
        .collect();

    group.bench_function("file_1000x128", |b| {
        let temp_dir = TempDir::new().unwrap();
        let log = SegmentManager::on_disk(temp_dir.path());
        log.start().unwrap();

        b.iter(|| {
            for bytes in &encoded {
                log.append(bytes).unwrap();
            }
            let segment = log.peek_oldest().unwrap().unwrap();
            let decoded = segment
                .chunks
                .iter()
                .filter_map(|c| MessageEntity::decode(&c.payload).ok())
                .count();
            log.remove(segment.id).unwrap();
            black_box(decoded);
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_entity_codec,
    bench_chunks,
    bench_log_append,
    bench_load_segment
);
criterion_main!(benches);
