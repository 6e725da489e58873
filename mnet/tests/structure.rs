use approx::assert_abs_diff_eq;
use mnet::structure::{chow_liu, chow_liu_tree, mutual_information};
use mnet::{BayesianNetwork, Config, InferenceGraph, MarkovNetwork, MnetError};
use ndarray::{array, Array2};
use ndarray_rand::rand::Rng;

mod common;

/// Samples of a noisy chain 0 -> 1 -> 2 -> 3 over binary variables.
fn chain_samples(n: usize, seed: u64) -> Array2<u32> {
    let mut rng = common::rng(seed);
    let mut samples = Array2::zeros((n, 4));
    for mut row in samples.rows_mut() {
        row[0] = rng.gen_bool(0.5) as u32;
        for (v, keep) in [(1, 0.9), (2, 0.85), (3, 0.95)] {
            let prev = row[v - 1];
            row[v] = if rng.gen_bool(keep) { prev } else { 1 - prev };
        }
    }
    samples
}

#[test]
fn recovers_chain() {
    let samples = chain_samples(5000, 0);
    let (parents, order) = chow_liu_tree(samples.view(), 0.0).unwrap();
    assert_eq!(parents, vec![None, Some(0), Some(1), Some(2)]);
    assert_eq!(order, vec![0, 1, 2, 3]);
}

#[test]
fn learned_tables_are_normalized() {
    let samples = chain_samples(2000, 1);
    let tables = chow_liu(samples.view(), 1.0).unwrap();
    assert_eq!(tables.len(), 4);
    assert_eq!(tables[0].scope(), &[0]);
    assert!(tables[1..].iter().all(|t| t.scope().len() == 2));

    let mut network = MarkovNetwork::new(tables.clone()).unwrap();
    network.bake(true, &Config::no_progress()).unwrap();
    assert_abs_diff_eq!(network.log_partition().unwrap(), 0.0, epsilon = 1e-12);

    // the same tables form a valid directed network
    let directed = BayesianNetwork::new(tables).unwrap();
    assert_eq!(directed.parents(2), Some(&[1][..]));
}

#[test]
fn root_marginal_is_empirical() {
    let samples = array![[0, 1], [1, 1], [1, 0], [1, 1]];
    let tables = chow_liu(samples.view(), 0.0).unwrap();
    assert_abs_diff_eq!(tables[0].probability(&[1]).unwrap(), 0.75);
    // P(x1 = 1 | x0 = 1)
    assert_abs_diff_eq!(tables[1].probability(&[1, 1]).unwrap(), 2.0 / 3.0, epsilon = 1e-12);

    let smoothed = chow_liu(samples.view(), 1.0).unwrap();
    assert_abs_diff_eq!(smoothed[0].probability(&[1]).unwrap(), 4.0 / 6.0, epsilon = 1e-12);
}

#[test]
fn unseen_parent_value_gives_uniform_row() {
    // value 1 of variable 0 never occurs
    let samples = array![[0, 0, 1], [2, 1, 1], [0, 0, 0], [2, 1, 0]];
    let tables = chow_liu(samples.view(), 0.0).unwrap();
    let directed = BayesianNetwork::new(tables.clone()).unwrap();
    assert_eq!(directed.parents(1), Some(&[0][..]));
    let t = tables.iter().find(|t| t.scope() == [0, 1]).unwrap();
    assert_abs_diff_eq!(t.probability(&[1, 0]).unwrap(), 0.5);
    assert_abs_diff_eq!(t.probability(&[2, 1]).unwrap(), 1.0);
}

#[test]
fn mutual_information_bounds() {
    let x = array![0u32, 1, 2, 0, 1, 2, 0, 1];
    let mi = mutual_information(x.view(), x.view(), 0.0).unwrap();
    let entropy = -(2.0 * 3.0 / 8.0 * (3.0f64 / 8.0).ln() + 2.0 / 8.0 * (2.0f64 / 8.0).ln());
    assert_abs_diff_eq!(mi, entropy, epsilon = 1e-12);

    let a = array![0u32, 0, 1, 1];
    let b = array![0u32, 1, 0, 1];
    assert_abs_diff_eq!(
        mutual_information(a.view(), b.view(), 0.0).unwrap(),
        0.0,
        epsilon = 1e-12
    );
}

#[test]
fn invalid_samples() {
    let empty = Array2::<u32>::zeros((0, 3));
    assert!(matches!(
        chow_liu(empty.view(), 1.0),
        Err(MnetError::Structure(_))
    ));
    let no_vars = Array2::<u32>::zeros((5, 0));
    assert!(matches!(
        chow_liu(no_vars.view(), 1.0),
        Err(MnetError::Structure(_))
    ));
    let samples = chain_samples(10, 2);
    assert!(matches!(
        chow_liu(samples.view(), -1.0),
        Err(MnetError::Structure(_))
    ));
}

#[test]
fn huge_domains_are_rejected() {
    let samples = array![[u32::MAX, u32::MAX], [0, 0]];
    assert!(matches!(
        chow_liu(samples.view(), 1.0),
        Err(MnetError::Structure(_))
    ));
    assert!(matches!(
        mutual_information(samples.column(0), samples.column(1), 0.0),
        Err(MnetError::Structure(_))
    ));
}
