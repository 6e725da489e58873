use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use mnet::inference::{build_graph, BPState};
use mnet::{BPConfig, PotentialTable};
use ndarray::{ArrayD, IxDyn};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256StarStar;

type BenchMarkGroup<'a> = criterion::BenchmarkGroup<'a, criterion::measurement::WallTime>;

/// Chain of `n` variables, closed into a ring if `cyclic`.
fn gen_chain(n: usize, nc: usize, cyclic: bool) -> Vec<PotentialTable> {
    let mut rng = Xoshiro256StarStar::seed_from_u64(0);
    let mut pairs: Vec<(usize, usize)> = (1..n).map(|v| (v - 1, v)).collect();
    if cyclic {
        pairs.push((n - 1, 0));
    }
    pairs
        .into_iter()
        .map(|(a, b)| {
            let values = ArrayD::random_using(IxDyn(&[nc, nc]), Uniform::new(0.1, 1.0), &mut rng);
            PotentialTable::from_array(vec![a, b], values).unwrap()
        })
        .collect()
}

fn bench_bp_inner(n: usize, nc: usize, cyclic: bool, group: &mut BenchMarkGroup) {
    let graph = Arc::new(build_graph(&gen_chain(n, nc, cyclic)).unwrap());
    let name = if cyclic { "ring" } else { "chain" };
    group.bench_with_input(BenchmarkId::new(name, n), &n, |b, _| {
        b.iter(|| {
            let mut bp = BPState::new(graph.clone());
            bp.set_evidence(0, 0).unwrap();
            bp.run(&BPConfig {
                max_iter: 20,
                tolerance: 0.0,
            });
        })
    });
}

fn bench_bp(c: &mut Criterion) {
    for nc in [2, 16, 256] {
        let mut group = c.benchmark_group(format!("bp_{}", nc));
        for n in [10, 100] {
            bench_bp_inner(n, nc, false, &mut group);
            bench_bp_inner(n, nc, true, &mut group);
        }
        group.finish();
    }
}

criterion_group! {
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(10);
    targets = bench_bp
}
criterion_main!(benches);
