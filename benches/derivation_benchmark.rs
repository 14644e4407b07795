//! Cost of deriving a field key from an access key.
//!
//! Run with: `cargo bench --bench derivation_benchmark`
//!
//! PBKDF2 at the default 100,000 iterations dominates every single-record
//! operation; field encryption itself is in the microsecond range.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use softovault::crypto;
use softovault::keys::{self, AccessKey, KdfParams};

fn bench_derivation(c: &mut Criterion) {
    let mut group = c.benchmark_group("derivation");
    group.sample_size(20);

    let ak = AccessKey::new("benchmark-access-key").unwrap();
    let params = KdfParams::default();

    group.bench_function("pbkdf2_sha256_100k", |b| {
        b.iter(|| keys::derive(black_box(&ak), black_box(&params)).unwrap());
    });

    let key = keys::derive(&ak, &params).unwrap();
    group.bench_function("encrypt_field_64b", |b| {
        let plaintext = "x".repeat(64);
        b.iter(|| crypto::encrypt(black_box(&plaintext), black_box(&key)).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_derivation);
criterion_main!(benches);
