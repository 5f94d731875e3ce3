#[macro_use]
extern crate criterion;
use criterion::Criterion;
use lamport_ots::forge::{forge, ForgeConfig};
use lamport_ots::hash_message;
use lamport_ots::knowledge::derive_knowledge;
use lamport_ots::lamport::{keygen, sign, verify};

fn bench_keygen(c: &mut Criterion) {
    c.bench_function("KeyGen", |b| {
        b.iter(|| {
            keygen(&mut [0u8; 32]).unwrap();
        })
    });
}

fn bench_sign(c: &mut Criterion) {
    let (sk, _) = keygen(&mut [0u8; 32]).unwrap();
    let msg = hash_message(&[0u8; 256]);
    c.bench_function("Signature", |b| {
        b.iter(|| {
            sign(&msg, &sk);
        })
    });
}

fn bench_verify(c: &mut Criterion) {
    let (sk, pk) = keygen(&mut [0u8; 32]).unwrap();
    let msg = hash_message(&[0u8; 256]);
    let signature = sign(&msg, &sk);
    c.bench_function("Signature verification", |b| {
        b.iter(|| {
            assert!(verify(&msg, &pk, &signature));
        })
    });
}

fn derive_with_observations(nb_signatures: usize, c: &mut Criterion) {
    let (sk, _) = keygen(&mut [0u8; 32]).unwrap();
    let pairs: Vec<_> = (0..nb_signatures)
        .map(|n| {
            let m = hash_message(n.to_string().as_bytes());
            (m, sign(&m, &sk))
        })
        .collect();
    c.bench_function(
        format!("Knowledge derivation with {} signatures", nb_signatures).as_str(),
        |b| {
            b.iter(|| {
                derive_knowledge(&pairs).unwrap();
            })
        },
    );
}

fn derive4(c: &mut Criterion) {
    derive_with_observations(4, c)
}
fn derive16(c: &mut Criterion) {
    derive_with_observations(16, c)
}

fn forge_with_observations(nb_signatures: usize, c: &mut Criterion) {
    let (sk, pk) = keygen(&mut [0u8; 32]).unwrap();
    let pairs: Vec<_> = (0..nb_signatures)
        .map(|n| {
            let m = hash_message(n.to_string().as_bytes());
            (m, sign(&m, &sk))
        })
        .collect();
    let knowledge = derive_knowledge(&pairs).unwrap();
    let config = ForgeConfig::default();
    c.bench_function(
        format!("Forgery with {} signatures", nb_signatures).as_str(),
        |b| {
            b.iter(|| {
                forge(&knowledge, &pk, &config).unwrap();
            })
        },
    );
}

fn forge8(c: &mut Criterion) {
    forge_with_observations(8, c)
}

criterion_group!(keyopts_benches, bench_keygen, bench_sign, bench_verify);

criterion_group!(forgery_benches, derive4, derive16, forge8);

criterion_main!(keyopts_benches, forgery_benches);
