use std::sync::Arc;

use log::{debug, warn};
use ndarray::Array1;
use rayon::prelude::*;

use super::bp_compute::{factor_message, Distribution};
use super::factor_graph::{Edge, FactorGraph};
use crate::{ClassVal, MnetError, Result, VarId};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BPConfig {
    /// Maximum number of synchronous rounds.
    pub max_iter: u32,
    /// Convergence threshold on the largest change of any message between two rounds.
    pub tolerance: f64,
}

impl Default for BPConfig {
    fn default() -> Self {
        Self {
            max_iter: 100,
            tolerance: 1e-9,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BPStatus {
    Uninitialized,
    Iterating { iteration: u32 },
    Converged { iterations: u32 },
    /// Messages were still moving by more than the tolerance when the iteration cap was hit.
    /// Marginals are best-effort.
    MaxIterationsReached { iterations: u32, residual: f64 },
}

impl BPStatus {
    pub fn converged(&self) -> bool {
        matches!(self, BPStatus::Converged { .. })
    }
}

/// Messages of a loopy belief propagation run over a frozen factor graph.
///
/// Rounds are synchronous: every new message of a round is computed from the messages of the
/// previous round.
#[derive(Debug, Clone)]
pub struct BPState {
    graph: Arc<FactorGraph>,
    // observed value for each var
    evidence: Vec<Option<ClassVal>>,
    // messages on each edge
    belief_from_var: Vec<Distribution>,
    belief_to_var: Vec<Distribution>,
    status: BPStatus,
}

impl BPState {
    pub fn new(graph: Arc<FactorGraph>) -> Self {
        let belief_from_var = graph
            .edges
            .iter()
            .map(|e| Distribution::new(graph.cardinality(e.var)))
            .collect::<Vec<_>>();
        Self {
            evidence: vec![None; graph.n_vars()],
            belief_to_var: belief_from_var.clone(),
            belief_from_var,
            graph,
            status: BPStatus::Uninitialized,
        }
    }
    pub fn status(&self) -> BPStatus {
        self.status
    }
    pub fn evidence(&self) -> &[Option<ClassVal>] {
        &self.evidence
    }

    /// Clamp `var` to `value`. Resets the messages.
    pub fn set_evidence(&mut self, var: VarId, value: ClassVal) -> Result<()> {
        self.check_var(var)?;
        self.graph.check_var_value(var, value)?;
        self.evidence[var] = Some(value);
        self.status = BPStatus::Uninitialized;
        Ok(())
    }
    pub fn drop_evidence(&mut self, var: VarId) -> Result<()> {
        self.check_var(var)?;
        self.evidence[var] = None;
        self.status = BPStatus::Uninitialized;
        Ok(())
    }
    /// Replace the evidence of all variables at once.
    pub fn set_evidence_all(&mut self, evidence: &[Option<ClassVal>]) -> Result<()> {
        if evidence.len() != self.graph.n_vars() {
            return Err(MnetError::Scope {
                expected: self.graph.n_vars(),
                got: evidence.len(),
            });
        }
        for (var, value) in evidence.iter().enumerate() {
            if let Some(value) = value {
                self.graph.check_var_value(var, *value)?;
            }
        }
        self.evidence.copy_from_slice(evidence);
        self.status = BPStatus::Uninitialized;
        Ok(())
    }
    fn check_var(&self, var: VarId) -> Result<()> {
        if var >= self.graph.n_vars() {
            Err(MnetError::Structure(format!(
                "no variable {var} in a network of {} variables",
                self.graph.n_vars()
            )))
        } else {
            Ok(())
        }
    }

    /// Uniform messages everywhere, except from observed variables which send their value.
    fn init_messages(&mut self) {
        for (edge, (from_var, to_var)) in self
            .graph
            .edges
            .iter()
            .zip(self.belief_from_var.iter_mut().zip(self.belief_to_var.iter_mut()))
        {
            let nc = self.graph.cardinality(edge.var);
            *from_var = match self.evidence[edge.var] {
                Some(value) => Distribution::one_hot(nc, value),
                None => Distribution::new(nc),
            };
            *to_var = Distribution::new(nc);
        }
        self.status = BPStatus::Iterating { iteration: 0 };
    }

    fn var_message(&self, edge: &Edge, belief_to_var: &[Distribution]) -> Distribution {
        let nc = self.graph.cardinality(edge.var);
        if let Some(value) = self.evidence[edge.var] {
            return Distribution::one_hot(nc, value);
        }
        let mut res = Distribution::new(nc);
        res.multiply(
            self.graph.vars[edge.var]
                .edges
                .values()
                .enumerate()
                .filter(|(pos, _)| *pos != edge.pos_var)
                .map(|(_, e)| &belief_to_var[*e]),
        );
        res.regularize();
        res
    }

    /// One synchronous round over all edges. Returns the largest message change.
    pub fn propagate_loopy_step(&mut self) -> f64 {
        if let BPStatus::Uninitialized = self.status {
            self.init_messages();
        }
        let graph = &self.graph;
        let new_to_var: Vec<Distribution> = graph
            .edges
            .par_iter()
            .map(|e| factor_message(&graph.factors[e.factor], e.pos_factor, &self.belief_from_var))
            .collect();
        let new_from_var: Vec<Distribution> = graph
            .edges
            .par_iter()
            .map(|e| self.var_message(e, &self.belief_to_var))
            .collect();
        let residual = new_to_var
            .par_iter()
            .zip(self.belief_to_var.par_iter())
            .chain(new_from_var.par_iter().zip(self.belief_from_var.par_iter()))
            .map(|(new, old)| new.distance(old))
            .reduce(|| 0.0, f64::max);
        self.belief_to_var = new_to_var;
        self.belief_from_var = new_from_var;
        let iteration = match self.status {
            BPStatus::Iterating { iteration } => iteration + 1,
            BPStatus::Converged { iterations } => iterations + 1,
            BPStatus::MaxIterationsReached { iterations, .. } => iterations + 1,
            BPStatus::Uninitialized => unreachable!(),
        };
        self.status = BPStatus::Iterating { iteration };
        debug!("BP round {iteration}: residual {residual:e}");
        residual
    }

    /// Iterate until the messages move by less than the tolerance, or until the iteration cap.
    pub fn run(&mut self, config: &BPConfig) -> BPStatus {
        let mut residual = f64::INFINITY;
        for _ in 0..config.max_iter {
            residual = self.propagate_loopy_step();
            if residual < config.tolerance {
                let BPStatus::Iterating { iteration } = self.status else {
                    unreachable!()
                };
                self.status = BPStatus::Converged {
                    iterations: iteration,
                };
                return self.status;
            }
        }
        let iterations = match self.status {
            BPStatus::Iterating { iteration } => iteration,
            _ => 0,
        };
        warn!(
            "Belief propagation stopped after {iterations} rounds without converging \
             (residual {residual:e}, cyclic graph: {}).",
            self.graph.is_cyclic()
        );
        self.status = BPStatus::MaxIterationsReached {
            iterations,
            residual,
        };
        self.status
    }

    /// Current belief for `var`: the normalized product of all incoming factor messages, or the
    /// observed value for clamped variables.
    pub fn get_state(&self, var: VarId) -> Distribution {
        let nc = self.graph.cardinality(var);
        if let Some(value) = self.evidence[var] {
            return Distribution::one_hot(nc, value);
        }
        let mut res = Distribution::new(nc);
        res.multiply(
            self.graph.vars[var]
                .edges
                .values()
                .map(|e| &self.belief_to_var[*e]),
        );
        res.normalize();
        res
    }

    pub fn marginals(&self) -> Vec<Array1<f64>> {
        self.graph
            .range_vars()
            .map(|var| self.get_state(var).into_probabilities())
            .collect()
    }
}
