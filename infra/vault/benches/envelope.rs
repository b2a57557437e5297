use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use getrandom::fill;
use mshield_vault::prelude::*;
use std::hint::black_box;

fn bench_encrypt_decrypt(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");

    let keyring = Keyring::<Aes>::default();
    let handle = keyring.generate(KeyAlgorithm::X25519).expect("key generation failed");

    let sizes = [("256B", 256usize), ("4KB", 4 * 1024), ("64KB", 64 * 1024)];

    for (label, size) in sizes {
        let mut data = vec![0u8; size];
        fill(&mut data).expect("System RNG unavailable for benchmark data");

        group.throughput(Throughput::Bytes(size as u64));

        group.bench_with_input(BenchmarkId::new("encrypt", label), &data, |b, d| {
            b.iter(|| keyring.encrypt(black_box(d), &handle.id).unwrap());
        });

        let envelope = keyring.encrypt(&data, &handle.id).expect("encrypt failed");

        group.bench_with_input(BenchmarkId::new("decrypt", label), &envelope, |b, e| {
            b.iter(|| keyring.decrypt(black_box(e), &handle.id).unwrap());
        });
    }

    group.finish();
}

fn bench_key_generation(c: &mut Criterion) {
    c.bench_function("generate_x25519", |b| {
        b.iter(|| KeyMaterial::generate(KeyAlgorithm::X25519).unwrap());
    });
}

criterion_group!(benches, bench_encrypt_decrypt, bench_key_generation);
criterion_main!(benches);
