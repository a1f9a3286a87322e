// benches/media.rs
//! Media assembly throughput into memory and onto disk

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use msgaudit_rs::session::memory::{MemoryArchive, DEFAULT_CHUNK_SIZE};
use msgaudit_rs::{download_media, stream_media, ChecksumAlgorithm, MediaOptions};
use std::hint::black_box;

// --- Size constants ---
const KB: usize = 1024;
const MB: usize = 1024 * 1024;

fn format_size(bytes: usize) -> String {
    if bytes >= MB {
        format!("{} MiB", bytes / MB)
    } else if bytes >= KB {
        format!("{} KiB", bytes / KB)
    } else {
        format!("{bytes} B")
    }
}

fn bench_stream(c: &mut Criterion) {
    let mut group = c.benchmark_group("media_stream");

    for &size in &[64 * KB, MB, 8 * MB] {
        let archive = MemoryArchive::new()
            .with_media("f", vec![0x5au8; size])
            .with_chunk_size(DEFAULT_CHUNK_SIZE);

        for algorithm in [ChecksumAlgorithm::Md5, ChecksumAlgorithm::Sha256] {
            let options = MediaOptions::new().with_checksum(algorithm);
            group.throughput(Throughput::Bytes(size as u64));
            group.bench_with_input(
                BenchmarkId::new(format!("{algorithm:?}"), format_size(size)),
                &size,
                |b, &size| {
                    b.iter(|| {
                        let mut sink = Vec::with_capacity(size);
                        let outcome = stream_media(&archive, "f", &mut sink, &options).unwrap();
                        black_box((sink, outcome))
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_download(c: &mut Criterion) {
    let mut group = c.benchmark_group("media_download");
    group.sample_size(20);
    let dir = tempfile::tempdir().unwrap();

    for &size in &[MB, 8 * MB] {
        let archive = MemoryArchive::new().with_media("f", vec![0xa5u8; size]);
        let options = MediaOptions::new();

        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::new("size", format_size(size)), &size, |b, _| {
            b.iter(|| {
                let download = download_media(&archive, "f", dir.path(), &options).unwrap();
                std::fs::remove_file(&download.path).unwrap();
                black_box(download.checksum)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_stream, bench_download);
criterion_main!(benches);
