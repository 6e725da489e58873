use std::sync::Arc;

use approx::assert_abs_diff_eq;
use mnet::inference::{build_graph, BPState};
use mnet::{
    BPConfig, BPStatus, ClassVal, Config, InferenceGraph, Marginal, MarkovNetwork, MnetError,
    PotentialTable,
};

mod common;

fn baked(tables: Vec<PotentialTable>) -> MarkovNetwork {
    let mut network = MarkovNetwork::new(tables).unwrap();
    network.bake(false, &Config::no_progress()).unwrap();
    network
}

fn check_exact(
    tables: &[PotentialTable],
    cards: &[usize],
    evidence: &[Option<ClassVal>],
) {
    let network = baked(tables.to_vec());
    let inference = network.marginals(evidence, &BPConfig::default()).unwrap();
    assert!(inference.exact);
    match inference.status {
        BPStatus::Converged { iterations } => assert!(iterations as usize <= 4 * cards.len()),
        other => panic!("belief propagation did not converge: {other:?}"),
    }
    let expected = common::brute_force_marginals(tables, cards, evidence);
    for ((m, e), obs) in inference
        .marginals
        .iter()
        .zip(expected.iter())
        .zip(evidence.iter())
    {
        match (m, obs) {
            (Marginal::Observed(x), Some(o)) => assert_eq!(x, o),
            (Marginal::Distribution(d), None) => {
                assert_abs_diff_eq!(d, e, epsilon = 1e-9);
            }
            _ => panic!("observed variables must be passed through"),
        }
    }
}

#[test]
fn chain_marginals_are_exact() {
    for seed in 0..4 {
        let mut rng = common::rng(seed);
        let cards = [2, 3, 2, 4, 3];
        let tables = common::random_chain(&cards, &mut rng);
        check_exact(&tables, &cards, &[None; 5]);
        check_exact(&tables, &cards, &[None, Some(2), None, None, Some(0)]);
        check_exact(&tables, &cards, &[Some(1), None, None, Some(3), None]);
    }
}

#[test]
fn tree_with_higher_order_factors() {
    let mut rng = common::rng(42);
    let cards = [2, 3, 2, 2, 3, 2];
    let tables = vec![
        common::random_table(vec![0, 1, 2], &cards, &mut rng),
        common::random_table(vec![2, 3], &cards, &mut rng),
        common::random_table(vec![4, 3, 5], &cards, &mut rng),
        common::random_table(vec![1], &cards, &mut rng),
    ];
    check_exact(&tables, &cards, &[None; 6]);
    check_exact(&tables, &cards, &[None, None, None, Some(1), None, None]);
}

#[test]
fn loopy_graph_reports_status() {
    let mut rng = common::rng(3);
    let cards = [2, 3, 2, 2];
    let network = baked(common::random_ring(&cards, &mut rng));
    let config = BPConfig {
        max_iter: 1,
        tolerance: 1e-9,
    };
    let inference = network.marginals(&[None; 4], &config).unwrap();
    assert!(!inference.exact);
    assert!(matches!(
        inference.status,
        BPStatus::MaxIterationsReached { iterations: 1, .. }
    ));
    for m in inference.marginals {
        let Marginal::Distribution(d) = m else {
            panic!("no evidence was given")
        };
        assert_abs_diff_eq!(d.sum(), 1.0, epsilon = 1e-12);
    }

    let inference = network
        .marginals(&[Some(0), None, None, None], &BPConfig::default())
        .unwrap();
    assert!(!inference.exact);
    assert!(inference.marginals[1..]
        .iter()
        .all(|m| matches!(m, Marginal::Distribution(d) if d.iter().all(|p| p.is_finite()))));
}

#[test]
fn predict_passes_observed_values() {
    let network = baked(common::small_network_tables());
    let examples = vec![vec![Some(1), Some(0), Some(1), Some(1), Some(0)]];
    let predictions = network.predict(&examples, &BPConfig::default()).unwrap();
    assert_eq!(predictions[0].values, vec![1, 0, 1, 1, 0]);

    let proba = network
        .predict_proba(&examples, &BPConfig::default())
        .unwrap();
    assert!(proba[0]
        .marginals
        .iter()
        .zip(examples[0].iter())
        .all(|(m, x)| *m == Marginal::Observed(x.unwrap())));
}

#[test]
fn predict_takes_arg_max_of_marginals() {
    let mut rng = common::rng(9);
    let cards = [3, 2, 4, 3];
    let tables = common::random_chain(&cards, &mut rng);
    let network = baked(tables.clone());
    let examples = vec![
        vec![None, Some(1), None, None],
        vec![Some(2), None, None, Some(0)],
        vec![None; 4],
    ];
    let predictions = network.predict(&examples, &BPConfig::default()).unwrap();
    for (evidence, prediction) in examples.iter().zip(predictions.iter()) {
        assert!(prediction.exact);
        let exact = common::brute_force_marginals(&tables, &cards, evidence);
        for ((value, e), m) in prediction.values.iter().zip(evidence).zip(exact.iter()) {
            match e {
                Some(x) => assert_eq!(value, x),
                None => {
                    let best = m
                        .iter()
                        .enumerate()
                        .fold((0, f64::NEG_INFINITY), |acc, (i, p)| {
                            if *p > acc.1 {
                                (i, *p)
                            } else {
                                acc
                            }
                        })
                        .0;
                    assert_eq!(*value as usize, best);
                }
            }
        }
    }
}

#[test]
fn evidence_errors() {
    let network = baked(common::small_network_tables());
    assert!(matches!(
        network.marginals(&[None; 3], &BPConfig::default()),
        Err(MnetError::Scope {
            expected: 5,
            got: 3
        })
    ));
    assert!(matches!(
        network.predict(&[vec![None, None, Some(2), None, None]], &BPConfig::default()),
        Err(MnetError::Domain { var: 2, value: 2, .. })
    ));
    let unbaked = MarkovNetwork::new(common::small_network_tables()).unwrap();
    assert!(matches!(
        unbaked.marginals(&[None; 5], &BPConfig::default()),
        Err(MnetError::NotBaked)
    ));
}

#[test]
fn state_machine() {
    let mut rng = common::rng(17);
    let cards = [2, 2, 3];
    let tables = common::random_chain(&cards, &mut rng);
    let graph = Arc::new(build_graph(&tables).unwrap());
    let mut bp = BPState::new(graph);
    assert_eq!(bp.status(), BPStatus::Uninitialized);
    let residual = bp.propagate_loopy_step();
    assert!(residual > 0.0);
    assert_eq!(bp.status(), BPStatus::Iterating { iteration: 1 });

    bp.set_evidence(1, 1).unwrap();
    assert_eq!(bp.status(), BPStatus::Uninitialized);
    assert_eq!(bp.evidence(), &[None, Some(1), None]);
    assert!(bp.run(&BPConfig::default()).converged());
    let expected = common::brute_force_marginals(&tables, &cards, &[None, Some(1), None]);
    assert_abs_diff_eq!(bp.marginals()[2], expected[2], epsilon = 1e-9);
    assert_abs_diff_eq!(bp.get_state(1).probabilities()[1], 1.0);

    bp.drop_evidence(1).unwrap();
    assert_eq!(bp.evidence(), &[None::<ClassVal>; 3]);
    assert!(matches!(bp.set_evidence(1, 2), Err(MnetError::Domain { .. })));
    assert!(matches!(bp.set_evidence(3, 0), Err(MnetError::Structure(_))));
}
