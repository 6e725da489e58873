//! Probability queries and inference shared by undirected and directed networks.
//!
//! Both network kinds freeze into the same [`FactorGraph`] when baked; the [`InferenceGraph`]
//! trait implements every query on top of that graph and of the network's log partition.

mod bayesian;
mod markov;

pub use bayesian::BayesianNetwork;
pub use markov::MarkovNetwork;

use std::sync::Arc;

use ndarray::{Array1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::inference::{BPConfig, BPState, BPStatus, FactorGraph};
use crate::{ClassVal, Result};

/// Result of inference for one variable.
#[derive(Debug, Clone, PartialEq)]
pub enum Marginal {
    /// The variable was observed, its value is passed through.
    Observed(ClassVal),
    /// Marginal distribution of an unobserved variable.
    Distribution(Array1<f64>),
}

impl Marginal {
    /// Observed value, or the arg-max of the distribution (first value on ties).
    pub fn most_probable(&self) -> ClassVal {
        match self {
            Marginal::Observed(x) => *x,
            Marginal::Distribution(d) => {
                d.iter()
                    .enumerate()
                    .fold((0, f64::NEG_INFINITY), |(best, best_p), (i, p)| {
                        if *p > best_p {
                            (i, *p)
                        } else {
                            (best, best_p)
                        }
                    })
                    .0 as ClassVal
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct Inference {
    pub marginals: Vec<Marginal>,
    pub status: BPStatus,
    /// Belief propagation converged on an acyclic graph, so the marginals are exact.
    pub exact: bool,
}

#[derive(Debug, Clone)]
pub struct Prediction {
    pub values: Vec<ClassVal>,
    pub status: BPStatus,
    pub exact: bool,
}

impl From<Inference> for Prediction {
    fn from(inference: Inference) -> Self {
        Self {
            values: inference.marginals.iter().map(Marginal::most_probable).collect(),
            status: inference.status,
            exact: inference.exact,
        }
    }
}

/// Query surface of a baked network.
pub trait InferenceGraph: Sync {
    /// Frozen factor graph, fails with `NotBaked` before the network is baked.
    fn factor_graph(&self) -> Result<&Arc<FactorGraph>>;

    /// Natural logarithm of the partition function.
    fn log_partition(&self) -> Result<f64>;

    /// Log-probability of a full assignment (one value per variable).
    ///
    /// The unnormalized form is the sum of the log-potentials and does not need the partition
    /// function.
    fn log_probability(&self, assignment: &[ClassVal], unnormalized: bool) -> Result<f64> {
        let graph = self.factor_graph()?;
        graph.check_assignment(assignment)?;
        let log_w = graph.log_weight(assignment);
        if unnormalized {
            Ok(log_w)
        } else {
            Ok(log_w - self.log_partition()?)
        }
    }

    /// Probability of a full assignment, see [`log_probability`](Self::log_probability).
    fn probability(&self, assignment: &[ClassVal], unnormalized: bool) -> Result<f64> {
        let graph = self.factor_graph()?;
        graph.check_assignment(assignment)?;
        if unnormalized {
            Ok(graph.weight(assignment))
        } else {
            Ok((graph.log_weight(assignment) - self.log_partition()?).exp())
        }
    }

    /// Log-probabilities of a batch of assignments, shape (n, D).
    fn log_probabilities(
        &self,
        assignments: ArrayView2<ClassVal>,
        unnormalized: bool,
    ) -> Result<Array1<f64>> {
        let res = assignments
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|x| self.log_probability(&x.to_vec(), unnormalized))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Array1::from(res))
    }

    fn probabilities(
        &self,
        assignments: ArrayView2<ClassVal>,
        unnormalized: bool,
    ) -> Result<Array1<f64>> {
        let res = assignments
            .axis_iter(Axis(0))
            .into_par_iter()
            .map(|x| self.probability(&x.to_vec(), unnormalized))
            .collect::<Result<Vec<f64>>>()?;
        Ok(Array1::from(res))
    }

    /// Marginals of every variable given partial evidence (`None` for unobserved variables).
    fn marginals(&self, evidence: &[Option<ClassVal>], config: &BPConfig) -> Result<Inference> {
        let graph = self.factor_graph()?;
        let mut bp = BPState::new(graph.clone());
        bp.set_evidence_all(evidence)?;
        let status = bp.run(config);
        let marginals = evidence
            .iter()
            .zip(bp.marginals())
            .map(|(e, m)| match e {
                Some(x) => Marginal::Observed(*x),
                None => Marginal::Distribution(m),
            })
            .collect();
        Ok(Inference {
            marginals,
            status,
            exact: !graph.is_cyclic() && status.converged(),
        })
    }

    /// Marginals for a batch of partial assignments.
    fn predict_proba(
        &self,
        examples: &[Vec<Option<ClassVal>>],
        config: &BPConfig,
    ) -> Result<Vec<Inference>> {
        examples
            .par_iter()
            .map(|evidence| self.marginals(evidence, config))
            .collect()
    }

    /// Most probable value of every unobserved variable; observed values are passed through.
    fn predict(
        &self,
        examples: &[Vec<Option<ClassVal>>],
        config: &BPConfig,
    ) -> Result<Vec<Prediction>> {
        Ok(self
            .predict_proba(examples, config)?
            .into_iter()
            .map(Prediction::from)
            .collect())
    }
}
