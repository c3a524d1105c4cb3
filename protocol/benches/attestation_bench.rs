// Attestation benchmarks.
//
// Covers commitment derivation at various set sizes, signing-digest
// computation, and full verification with and without the commitment check.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use spend_attest::attestation::{verify_at, AttestationMessage, Nonce, ProofBundle, TypedData};
use spend_attest::commitment::{derive_root, CommittedSet};
use spend_attest::crypto::keys::SignerKeypair;
use spend_attest::transaction::TransactionRecord;

const NOW: u64 = 1_704_067_200;

fn feed(n: usize) -> Vec<TransactionRecord> {
    let start: chrono::NaiveDate = "2024-01-01".parse().unwrap();
    (0..n)
        .map(|i| {
            let category = if i % 3 == 0 { "Travel" } else { "Food" };
            TransactionRecord::new(
                format!("tx-{i:06}"),
                (i % 500) as f64 + 0.25,
                vec![category.to_string(), "Sub".to_string()],
                start + chrono::Days::new((i % 28) as u64),
            )
        })
        .collect()
}

fn signed_bundle(keypair: &SignerKeypair, txs: &[TransactionRecord]) -> ProofBundle {
    let set = CommittedSet::select(txs, "Food").unwrap();
    let message = AttestationMessage::assemble(&set, 0, NOW, Nonce::from_bytes([9; 32])).unwrap();
    let typed = TypedData::new(message);
    let signature = keypair.sign_digest(&typed.digest()).unwrap();
    let message = typed.into_message();
    ProofBundle {
        time_bucket: message.time_bucket(),
        message,
        signature,
        signer: keypair.address(),
    }
}

fn bench_derive_root(c: &mut Criterion) {
    let mut group = c.benchmark_group("commitment/derive_root");
    for size in [10usize, 100, 1_000] {
        let txs = feed(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &txs, |b, txs| {
            b.iter(|| derive_root(txs, "Food", NOW).unwrap());
        });
    }
    group.finish();
}

fn bench_signing_digest(c: &mut Criterion) {
    let keypair = SignerKeypair::generate();
    let bundle = signed_bundle(&keypair, &feed(10));
    let typed = TypedData::new(bundle.message);

    c.bench_function("typed_data/digest", |b| {
        b.iter(|| typed.digest());
    });
}

fn bench_verify(c: &mut Criterion) {
    let keypair = SignerKeypair::generate();
    let address = keypair.address();
    let txs = feed(100);
    let bundle = signed_bundle(&keypair, &txs);

    c.bench_function("verify/signature_only", |b| {
        b.iter(|| verify_at(&bundle, &address, None, None, NOW));
    });
    c.bench_function("verify/with_commitment_100", |b| {
        b.iter(|| verify_at(&bundle, &address, Some(&txs), Some("Food"), NOW));
    });
}

criterion_group!(benches, bench_derive_root, bench_signing_digest, bench_verify);
criterion_main!(benches);
