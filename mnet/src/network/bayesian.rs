use std::sync::Arc;

use ndarray::Axis;

use super::InferenceGraph;
use crate::inference::{build_graph, discover_cardinalities, FactorGraph};
use crate::potential::PotentialTable;
use crate::{MnetError, Result, VarId};

/// Tolerance on the sum of each conditional distribution.
const CPT_TOLERANCE: f64 = 1e-6;

/// Directed network: one conditional probability table per variable.
///
/// The last variable of a table scope is the child, the others are its parents. Since every
/// table is normalized over its child and the parent graph is acyclic, the product of the
/// tables is a normalized joint distribution and the log partition is 0.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BayesianNetwork {
    tables: Vec<PotentialTable>,
    #[serde(skip)]
    graph: Option<Arc<FactorGraph>>,
}

impl BayesianNetwork {
    pub fn new(tables: Vec<PotentialTable>) -> Result<Self> {
        let n_vars = discover_cardinalities(&tables)?.len();
        let mut table_of: Vec<Option<usize>> = vec![None; n_vars];
        for (i, table) in tables.iter().enumerate() {
            let child = child_of(table);
            if table_of[child].replace(i).is_some() {
                return Err(MnetError::Structure(format!(
                    "variable {child} has more than one conditional table"
                )));
            }
            let sums = table.values().sum_axis(Axis(table.scope().len() - 1));
            if sums.iter().any(|s| (s - 1.0).abs() > CPT_TOLERANCE) {
                return Err(MnetError::MalformedTable(format!(
                    "conditional table of variable {child} does not sum to one for every \
                     parent configuration"
                )));
            }
        }
        if let Some(var) = table_of.iter().position(Option::is_none) {
            return Err(MnetError::Structure(format!(
                "variable {var} has no conditional table"
            )));
        }
        check_acyclic(&tables, n_vars)?;
        Ok(Self {
            tables,
            graph: None,
        })
    }

    pub fn tables(&self) -> &[PotentialTable] {
        &self.tables
    }

    /// Parents of `var`, in table order.
    pub fn parents(&self, var: VarId) -> Option<&[VarId]> {
        self.tables
            .iter()
            .find(|t| child_of(t) == var)
            .map(|t| &t.scope()[..t.scope().len() - 1])
    }

    pub fn is_baked(&self) -> bool {
        self.graph.is_some()
    }

    pub fn bake(&mut self) -> Result<()> {
        self.graph = Some(Arc::new(build_graph(&self.tables)?));
        Ok(())
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let stored: Self = bincode::deserialize(bytes)?;
        let mut network = Self::new(stored.tables)?;
        network.bake()?;
        Ok(network)
    }
}

fn child_of(table: &PotentialTable) -> VarId {
    // scopes are never empty
    table.scope()[table.scope().len() - 1]
}

/// Kahn's algorithm over the parent -> child edges.
fn check_acyclic(tables: &[PotentialTable], n_vars: usize) -> Result<()> {
    let mut n_parents = vec![0usize; n_vars];
    let mut children: Vec<Vec<VarId>> = vec![Vec::new(); n_vars];
    for table in tables {
        let child = child_of(table);
        let parents = &table.scope()[..table.scope().len() - 1];
        n_parents[child] = parents.len();
        for p in parents {
            children[*p].push(child);
        }
    }
    let mut ready: Vec<VarId> = (0..n_vars).filter(|v| n_parents[*v] == 0).collect();
    let mut n_sorted = 0;
    while let Some(var) = ready.pop() {
        n_sorted += 1;
        for child in &children[var] {
            n_parents[*child] -= 1;
            if n_parents[*child] == 0 {
                ready.push(*child);
            }
        }
    }
    if n_sorted != n_vars {
        return Err(MnetError::Structure(
            "the parent graph contains a cycle".to_owned(),
        ));
    }
    Ok(())
}

impl InferenceGraph for BayesianNetwork {
    fn factor_graph(&self) -> Result<&Arc<FactorGraph>> {
        self.graph.as_ref().ok_or(MnetError::NotBaked)
    }
    fn log_partition(&self) -> Result<f64> {
        Ok(0.0)
    }
}
