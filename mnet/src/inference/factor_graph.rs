use indexmap::IndexMap;

use crate::potential::PotentialTable;
use crate::{ClassVal, MnetError, Result, VarId};

pub type FactorId = usize;
pub type EdgeId = usize;

#[derive(Debug, Clone)]
pub(super) struct Var {
    pub(super) cardinality: usize,
    pub(super) edges: IndexMap<FactorId, EdgeId>,
}

#[derive(Debug, Clone)]
pub(super) struct Factor {
    pub(super) table: PotentialTable,
    // same order as the table scope
    pub(super) edges: IndexMap<VarId, EdgeId>,
}

#[derive(Debug, Clone)]
pub(super) struct Edge {
    pub(super) var: VarId,
    pub(super) pos_var: usize,
    pub(super) factor: FactorId,
    pub(super) pos_factor: usize,
}

/// Bipartite graph of variable nodes and factor nodes (one per potential table).
///
/// Built once from a list of tables and never mutated afterwards.
#[derive(Debug, Clone)]
pub struct FactorGraph {
    pub(super) vars: Vec<Var>,
    pub(super) factors: Vec<Factor>,
    pub(super) edges: Vec<Edge>,
    pub(super) cyclic: bool,
}

impl FactorGraph {
    pub fn n_vars(&self) -> usize {
        self.vars.len()
    }
    pub fn n_factors(&self) -> usize {
        self.factors.len()
    }
    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }
    /// True if the graph contains a cycle, in which case belief propagation is approximate.
    pub fn is_cyclic(&self) -> bool {
        self.cyclic
    }
    pub fn cardinality(&self, var: VarId) -> usize {
        self.vars[var].cardinality
    }
    pub fn cardinalities(&self) -> Vec<usize> {
        self.vars.iter().map(|v| v.cardinality).collect()
    }
    pub fn tables(&self) -> impl Iterator<Item = &PotentialTable> {
        self.factors.iter().map(|f| &f.table)
    }
    pub fn range_vars(&self) -> std::ops::Range<VarId> {
        0..self.vars.len()
    }

    pub fn check_var_value(&self, var: VarId, value: ClassVal) -> Result<()> {
        let cardinality = self.vars[var].cardinality;
        if value as usize >= cardinality {
            Err(MnetError::Domain {
                var,
                value,
                cardinality,
            })
        } else {
            Ok(())
        }
    }

    /// Check that `assignment` gives one in-domain value to every variable.
    pub fn check_assignment(&self, assignment: &[ClassVal]) -> Result<()> {
        if assignment.len() != self.vars.len() {
            return Err(MnetError::Scope {
                expected: self.vars.len(),
                got: assignment.len(),
            });
        }
        assignment
            .iter()
            .enumerate()
            .try_for_each(|(var, value)| self.check_var_value(var, *value))
    }

    /// Product of all factor weights at a (checked) full assignment.
    pub(crate) fn weight(&self, assignment: &[ClassVal]) -> f64 {
        self.factors
            .iter()
            .map(|f| f.table.weight_of(assignment))
            .product()
    }

    /// Sum of all factor log-weights at a (checked) full assignment.
    pub(crate) fn log_weight(&self, assignment: &[ClassVal]) -> f64 {
        self.factors
            .iter()
            .map(|f| f.table.weight_of(assignment).ln())
            .sum()
    }

    /// Spanning-forest check over the bipartite graph: an edge that joins two nodes already
    /// connected closes a cycle.
    pub(super) fn detect_cycle(&self) -> bool {
        let n_vars = self.vars.len();
        // factors are numbered after the variables
        let mut forest = DisjointSets::new(n_vars + self.factors.len());
        self.edges
            .iter()
            .any(|e| !forest.union(e.var, n_vars + e.factor))
    }
}

struct DisjointSets {
    parent: Vec<usize>,
    rank: Vec<u8>,
}

impl DisjointSets {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
            rank: vec![0; n],
        }
    }
    fn find(&mut self, mut x: usize) -> usize {
        while self.parent[x] != x {
            self.parent[x] = self.parent[self.parent[x]];
            x = self.parent[x];
        }
        x
    }
    /// Returns false if a and b were already in the same set.
    fn union(&mut self, a: usize, b: usize) -> bool {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra == rb {
            return false;
        }
        match self.rank[ra].cmp(&self.rank[rb]) {
            std::cmp::Ordering::Less => self.parent[ra] = rb,
            std::cmp::Ordering::Greater => self.parent[rb] = ra,
            std::cmp::Ordering::Equal => {
                self.parent[rb] = ra;
                self.rank[ra] += 1;
            }
        }
        true
    }
}
