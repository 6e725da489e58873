mod belief_propagation;
mod bp_compute;
mod factor_graph;
mod fg_build;

pub use belief_propagation::{BPConfig, BPState, BPStatus};
pub use bp_compute::Distribution;
pub use factor_graph::{EdgeId, FactorGraph, FactorId};
pub use fg_build::build_graph;
pub(crate) use fg_build::discover_cardinalities;
