//! Inference over discrete undirected graphical models.
//!
//! A network is a list of [`PotentialTable`]s over integer-indexed variables. Baking a network
//! freezes it into a [`FactorGraph`](inference::FactorGraph) on which loopy belief propagation
//! runs, and optionally computes the exact partition function by enumeration.

pub mod inference;
pub mod network;
pub mod partition;
pub mod potential;
pub mod structure;
pub(crate) mod utils;

pub use inference::{BPConfig, BPStatus};
pub use network::{
    BayesianNetwork, Inference, InferenceGraph, Marginal, MarkovNetwork, Prediction,
};
pub use potential::PotentialTable;

/// Identifier of a variable, in [0, D).
pub type VarId = usize;
/// Value taken by a discrete variable.
pub type ClassVal = u32;

use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MnetError>;

#[derive(Error, Debug)]
pub enum MnetError {
    #[error("Assignment has {got} values, expected {expected}.")]
    Scope { expected: usize, got: usize },
    #[error("Value {value} of variable {var} is outside its domain [0, {cardinality}).")]
    Domain {
        var: VarId,
        value: ClassVal,
        cardinality: usize,
    },
    #[error("Variable {var} has {first} values in one table and {second} in another.")]
    InconsistentDomain {
        var: VarId,
        first: usize,
        second: usize,
    },
    #[error("Variable {0} is not in the scope of the table.")]
    NotInScope(VarId),
    #[error("Must calculate partition before computing probability.")]
    PartitionNotComputed,
    #[error("Log partition must be finite, got {0}.")]
    InvalidPartition(f64),
    #[error("Invalid network structure: {0}")]
    Structure(String),
    #[error(
        "Exact partition function exceeds the computation budget \
         ({n_assignments} assignments, {reason})."
    )]
    ResourceExhausted { n_assignments: u64, reason: String },
    #[error("Malformed potential table: {0}")]
    MalformedTable(String),
    #[error("The network must be baked before it can be queried.")]
    NotBaked,
    #[error("All joint assignments have zero weight.")]
    EmptySupport,
    #[error("Serialization failed.")]
    Serialization(#[from] bincode::Error),
}

#[derive(Clone, Debug)]
pub struct Config {
    /// Display a progress bar for long-running computations.
    show_progress: bool,
    /// Computation time after which a progress bar is displayed.
    /// This avoids showing progress bars for negligible amounts of time.
    progress_min_time: Duration,
    /// Largest number of joint assignments the exact partition function may enumerate.
    max_assignments: Option<u64>,
    /// Wall-clock budget for the exact partition function.
    partition_timeout: Option<Duration>,
}

impl Config {
    pub fn with_default_timing() -> Self {
        Self {
            show_progress: true,
            progress_min_time: Duration::from_millis(500),
            max_assignments: None,
            partition_timeout: None,
        }
    }
    pub fn no_progress() -> Self {
        Self {
            show_progress: false,
            ..Self::with_default_timing()
        }
    }
    pub fn with_max_assignments(mut self, max_assignments: u64) -> Self {
        self.max_assignments = Some(max_assignments);
        self
    }
    pub fn with_partition_timeout(mut self, timeout: Duration) -> Self {
        self.partition_timeout = Some(timeout);
        self
    }
    pub fn max_assignments(&self) -> Option<u64> {
        self.max_assignments
    }
    pub fn partition_timeout(&self) -> Option<Duration> {
        self.partition_timeout
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::with_default_timing()
    }
}
