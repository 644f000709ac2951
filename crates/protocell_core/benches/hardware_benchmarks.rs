use criterion::{black_box, criterion_group, criterion_main, Criterion};
use protocell_core::config::MutationConfig;
use protocell_core::label::{find_forward, CodeLabel};
use protocell_core::{Feedback, Genome, Hardware, HardwareConfig, InstSet, IsolatedHost};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

const INST_SET: &str = include_str!("../../../support/config/instset-heads.cfg");
const ANCESTOR: &str = include_str!("../../../support/config/default-heads.org");

fn setup() -> (Arc<InstSet>, Arc<HardwareConfig>) {
    let mut feedback = Feedback::new();
    let set = InstSet::from_description(INST_SET, &mut feedback).unwrap();
    let config = HardwareConfig {
        mutation: MutationConfig::disabled(),
        ..HardwareConfig::default()
    };
    (Arc::new(set), Arc::new(config))
}

/// Benchmark single steps of the heads ancestor.
fn bench_step(c: &mut Criterion) {
    let (set, config) = setup();
    let genome = set.parse_sequence(ANCESTOR).unwrap();
    let mut hardware = Hardware::new(Arc::clone(&set), config, &genome).unwrap();
    let mut host = IsolatedHost::new(genome);
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    c.bench_function("hardware_step", |b| {
        b.iter(|| {
            let report = hardware.step(&mut host, &mut rng);
            black_box(report)
        })
    });
}

/// Benchmark a full replication cycle of the heads ancestor.
fn bench_replication(c: &mut Criterion) {
    let (set, config) = setup();
    let genome = set.parse_sequence(ANCESTOR).unwrap();
    let mut rng = ChaCha8Rng::seed_from_u64(42);

    c.bench_function("hardware_replication_cycle", |b| {
        b.iter(|| {
            let mut hardware = Hardware::new(Arc::clone(&set), Arc::clone(&config), &genome).unwrap();
            let mut host = IsolatedHost::new(genome.clone());
            while !hardware.step(&mut host, &mut rng).divided {}
            black_box(host.offspring.len())
        })
    });
}

fn bench_label_search(c: &mut Criterion) {
    let (set, _) = setup();
    let genome = Genome::from_sequence(&set.parse_sequence(ANCESTOR).unwrap());
    let label = CodeLabel::from_nops(&[0, 1]);

    c.bench_function("label_find_forward_100", |b| {
        b.iter(|| black_box(find_forward(black_box(&label), &genome, &set, 0)))
    });
}

criterion_group!(benches, bench_step, bench_replication, bench_label_search);
criterion_main!(benches);
