#![allow(dead_code)]

use itertools::Itertools;
use mnet::{ClassVal, PotentialTable, VarId};
use ndarray::{Array1, ArrayD, IxDyn};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256StarStar;

pub fn rng(seed: u64) -> Xoshiro256StarStar {
    Xoshiro256StarStar::seed_from_u64(seed)
}

/// The three-clique network over five binary variables used throughout the tests.
pub fn small_network_tables() -> Vec<PotentialTable> {
    let d1 = PotentialTable::from_rows(
        vec![0, 1],
        &[
            (vec![0, 0], 0.1),
            (vec![0, 1], 0.2),
            (vec![1, 0], 0.4),
            (vec![1, 1], 0.3),
        ],
    )
    .unwrap();
    let d2 = PotentialTable::from_rows(
        vec![1, 2, 3],
        &[
            (vec![0, 0, 0], 0.05),
            (vec![0, 0, 1], 0.15),
            (vec![0, 1, 0], 0.07),
            (vec![0, 1, 1], 0.03),
            (vec![1, 0, 0], 0.12),
            (vec![1, 0, 1], 0.18),
            (vec![1, 1, 0], 0.10),
            (vec![1, 1, 1], 0.30),
        ],
    )
    .unwrap();
    let d3 = PotentialTable::from_rows(
        vec![2, 3, 4],
        &[
            (vec![0, 0, 0], 0.08),
            (vec![0, 0, 1], 0.12),
            (vec![0, 1, 0], 0.11),
            (vec![0, 1, 1], 0.19),
            (vec![1, 0, 0], 0.04),
            (vec![1, 0, 1], 0.06),
            (vec![1, 1, 0], 0.23),
            (vec![1, 1, 1], 0.17),
        ],
    )
    .unwrap();
    vec![d1, d2, d3]
}

pub fn random_table(
    scope: Vec<VarId>,
    cards: &[usize],
    rng: &mut Xoshiro256StarStar,
) -> PotentialTable {
    let shape: Vec<usize> = scope.iter().map(|v| cards[*v]).collect();
    let values = ArrayD::random_using(IxDyn(&shape), Uniform::new(0.05, 1.0), rng);
    PotentialTable::from_array(scope, values).unwrap()
}

/// Chain 0 - 1 - ... - (D-1) with a unary table on every variable.
pub fn random_chain(cards: &[usize], rng: &mut Xoshiro256StarStar) -> Vec<PotentialTable> {
    let mut tables: Vec<PotentialTable> = (0..cards.len())
        .map(|v| random_table(vec![v], cards, rng))
        .collect();
    for v in 1..cards.len() {
        tables.push(random_table(vec![v - 1, v], cards, rng));
    }
    tables
}

/// Random chain closed into a ring, which makes the factor graph cyclic.
pub fn random_ring(cards: &[usize], rng: &mut Xoshiro256StarStar) -> Vec<PotentialTable> {
    let mut tables = random_chain(cards, rng);
    tables.push(random_table(vec![cards.len() - 1, 0], cards, rng));
    tables
}

pub fn all_assignments(cards: &[usize]) -> Vec<Vec<ClassVal>> {
    cards
        .iter()
        .map(|c| 0..*c as ClassVal)
        .multi_cartesian_product()
        .collect()
}

pub fn unnormalized_weight(tables: &[PotentialTable], assignment: &[ClassVal]) -> f64 {
    tables
        .iter()
        .map(|t| {
            let projection: Vec<ClassVal> = t.scope().iter().map(|v| assignment[*v]).collect();
            t.probability(&projection).unwrap()
        })
        .product()
}

pub fn brute_force_partition(tables: &[PotentialTable], cards: &[usize]) -> f64 {
    all_assignments(cards)
        .iter()
        .map(|x| unnormalized_weight(tables, x))
        .sum()
}

/// Exact marginal of every variable given the evidence.
pub fn brute_force_marginals(
    tables: &[PotentialTable],
    cards: &[usize],
    evidence: &[Option<ClassVal>],
) -> Vec<Array1<f64>> {
    let mut marginals: Vec<Array1<f64>> = cards.iter().map(|c| Array1::zeros(*c)).collect();
    for x in all_assignments(cards) {
        if evidence
            .iter()
            .zip(x.iter())
            .any(|(e, v)| e.is_some_and(|e| e != *v))
        {
            continue;
        }
        let w = unnormalized_weight(tables, &x);
        for (m, v) in marginals.iter_mut().zip(x.iter()) {
            m[*v as usize] += w;
        }
    }
    for m in marginals.iter_mut() {
        let s = m.sum();
        m.mapv_inplace(|p| p / s);
    }
    marginals
}
