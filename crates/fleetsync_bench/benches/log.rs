//! Event log benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use fleetsync_log::{
    decode_event, encode_event, EventProperties, EventType, FileLogStore, LogEvent, LogStore,
    MemoryLogStore,
};
use tempfile::TempDir;

/// An event whose property values need escaping.
fn sample_event(log_id: u64, event_id: u64) -> LogEvent {
    LogEvent::new(
        log_id,
        event_id,
        EventType::BUNDLE_INSTALLED,
        1_700_000_000_000 + event_id,
        EventProperties::new()
            .with("symbolicName", "com.acme.assembly")
            .with("version", "2.4.1")
            .with("note", "installed, pending$restart\n"),
    )
}

/// Benchmark the event line codec.
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("event_codec");

    let event = sample_event(1, 42);
    let line = encode_event(&event);
    group.throughput(Throughput::Bytes(line.len() as u64));

    group.bench_function("encode", |b| {
        b.iter(|| black_box(encode_event(black_box(&event))));
    });
    group.bench_function("decode", |b| {
        b.iter(|| black_box(decode_event(black_box(&line)).unwrap()));
    });

    group.finish();
}

/// Benchmark the in-memory store.
fn bench_memory_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("memory_store");

    group.bench_function("put", |b| {
        let store = MemoryLogStore::new();
        b.iter(|| {
            let event = store
                .put(
                    1,
                    EventType::BUNDLE_INSTALLED,
                    EventProperties::new().with("symbolicName", "com.acme.assembly"),
                )
                .unwrap();
            black_box(event);
        });
    });

    // Steady-state replication is mostly duplicate suppression.
    group.bench_function("insert_duplicate", |b| {
        let store = MemoryLogStore::new();
        let event = sample_event(1, 7);
        store.insert(&event).unwrap();
        b.iter(|| {
            black_box(store.insert(black_box(&event)).unwrap());
        });
    });

    group.finish();
}

/// Benchmark computing the held-id set for gappy logs.
fn bench_id_range(c: &mut Criterion) {
    let mut group = c.benchmark_group("id_range");

    for count in [1_000u64, 10_000].iter() {
        let store = MemoryLogStore::new();
        for id in 1..=*count {
            // Every tenth id missing, as after pruning.
            if id % 10 != 0 {
                store.insert(&sample_event(3, id)).unwrap();
            }
        }
        group.throughput(Throughput::Elements(*count));
        group.bench_with_input(BenchmarkId::from_parameter(count), &store, |b, store| {
            b.iter(|| black_box(store.id_range(3).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark the file-backed store.
fn bench_file_store(c: &mut Criterion) {
    let mut group = c.benchmark_group("file_store");

    // Use smaller sample size for file operations
    group.sample_size(50);

    group.bench_function("put", |b| {
        let temp_dir = TempDir::new().unwrap();
        let store = FileLogStore::open(temp_dir.path(), true).unwrap();
        b.iter(|| {
            let event = store
                .put(
                    1,
                    EventType::BUNDLE_INSTALLED,
                    EventProperties::new().with("symbolicName", "com.acme.assembly"),
                )
                .unwrap();
            black_box(event);
        });
    });

    // A cold open replays every log file line by line.
    group.bench_function("open_5k_events", |b| {
        let temp_dir = TempDir::new().unwrap();
        {
            let store = FileLogStore::open(temp_dir.path(), true).unwrap();
            for id in 1..=5_000u64 {
                store.insert(&sample_event(1, id)).unwrap();
            }
        }
        b.iter(|| {
            let store = FileLogStore::open(temp_dir.path(), true).unwrap();
            black_box(store.log_ids().unwrap());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_codec,
    bench_memory_store,
    bench_id_range,
    bench_file_store,
);

criterion_main!(benches);
