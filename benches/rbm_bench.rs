//! Criterion benchmarks for RBM training.
//!
//! Run with: `cargo bench --bench rbm_bench`
//!
//! ## Benchmarks
//!
//! 1. **Single CD-1 step** — one full positive phase + Gibbs chain + update
//! 2. **CD-k chain length** — cost scaling with k
//! 3. **Reconstruction** — the deterministic evaluation pass

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rbm::{CdConfig, Rbm, RngSource};

/// Generate a random binary batch for benchmarking.
fn binary_batch(rows: usize, cols: usize, rng: &mut StdRng) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |_| if rng.gen::<bool>() { 1.0 } else { 0.0 })
}

fn bench_cd_step(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(1);
    let input = binary_batch(16, 64, &mut rng);
    let config = CdConfig {
        learning_rate: 0.1,
        k: 1,
    };

    c.bench_function("cd1_step_64v_32h_batch16", |b| {
        let mut rbm = Rbm::random(64, 32, &mut rng);
        let mut source = RngSource::new(StdRng::seed_from_u64(2));
        b.iter(|| {
            rbm.contrastive_divergence(black_box(Some(&input)), black_box(&config), &mut source)
                .expect("CD step failed");
        });
    });
}

fn bench_chain_length(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let input = binary_batch(16, 64, &mut rng);

    let mut group = c.benchmark_group("cd_chain_length");
    for k in [1usize, 5, 15] {
        let config = CdConfig {
            learning_rate: 0.1,
            k,
        };
        group.bench_with_input(BenchmarkId::from_parameter(k), &config, |b, config| {
            let mut rbm = Rbm::random(64, 32, &mut rng);
            let mut source = RngSource::new(StdRng::seed_from_u64(4));
            b.iter(|| {
                rbm.contrastive_divergence(black_box(Some(&input)), black_box(config), &mut source)
                    .expect("CD step failed");
            });
        });
    }
    group.finish();
}

fn bench_reconstruct(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(5);
    let input = binary_batch(16, 64, &mut rng);
    let rbm = Rbm::random(64, 32, &mut rng);

    c.bench_function("reconstruct_64v_32h_batch16", |b| {
        b.iter(|| rbm.reconstruct(black_box(&input)));
    });
}

criterion_group!(benches, bench_cd_step, bench_chain_length, bench_reconstruct);
criterion_main!(benches);
