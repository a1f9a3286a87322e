// benches/decrypt.rs
//! Batch decryption benchmarks: sealed records are prepared once, outside the timed loop

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use msgaudit_rs::crypto::envelope::RecordSealer;
use msgaudit_rs::session::memory::MemoryArchive;
use msgaudit_rs::{fetch_chat_batch, FetchOptions, HybridDecryptor, KeyMaterial};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde_json::json;
use std::hint::black_box;

// Production archive keys are 2048-bit.
const KEY_BITS: usize = 2048;

fn bench_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("decrypt");
    group.sample_size(20);

    let mut rng = StdRng::seed_from_u64(7);
    let private = RsaPrivateKey::new(&mut rng, KEY_BITS).unwrap();
    let public = RsaPublicKey::from(&private);
    let pem = private.to_pkcs1_pem(LineEnding::LF).unwrap().to_string();
    let decryptor = HybridDecryptor::with_key(KeyMaterial::pem(pem));

    for &batch_size in &[1u64, 10, 100] {
        // --- Seal once ---
        let records = (1..=batch_size).map(|seq| {
            let body = json!({
                "msgtype": "text",
                "text": { "content": "x".repeat(256) },
                "msgtime": seq,
            });
            RecordSealer::new(seq).seal(&public, &body).unwrap()
        });
        let archive = MemoryArchive::new().with_records(records);
        let options = FetchOptions::new();

        group.throughput(Throughput::Elements(batch_size));
        group.bench_with_input(
            BenchmarkId::new("records", batch_size),
            &batch_size,
            |b, &limit| {
                b.iter(|| {
                    let batch =
                        fetch_chat_batch(&archive, Some(&decryptor), 0, limit as u32, &options)
                            .unwrap();
                    black_box(batch)
                });
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_decrypt);
criterion_main!(benches);
