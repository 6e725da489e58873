use indexmap::IndexMap;
use log::info;

use super::factor_graph as fg;
use crate::potential::PotentialTable;
use crate::{MnetError, Result, VarId};

impl fg::FactorGraph {
    fn build(cardinalities: Vec<usize>) -> Self {
        Self {
            vars: cardinalities
                .into_iter()
                .map(|cardinality| fg::Var {
                    cardinality,
                    edges: IndexMap::new(),
                })
                .collect(),
            factors: Vec::new(),
            edges: Vec::new(),
            cyclic: false,
        }
    }
    fn add_factor(&mut self, table: PotentialTable) {
        let factor_id = self.factors.len();
        let mut edges = IndexMap::new();
        for var_id in table.scope() {
            let edge_id = self.edges.len();
            let v = &mut self.vars[*var_id];
            v.edges.insert(factor_id, edge_id);
            edges.insert(*var_id, edge_id);
            self.edges.push(fg::Edge {
                var: *var_id,
                pos_var: v.edges.len() - 1,
                factor: factor_id,
                pos_factor: edges.len() - 1,
            });
        }
        self.factors.push(fg::Factor { table, edges });
    }
}

/// Domain size of every variable in [0, D), where D is one past the largest variable index of
/// the tables.
pub(crate) fn discover_cardinalities(tables: &[PotentialTable]) -> Result<Vec<usize>> {
    if tables.is_empty() {
        return Err(MnetError::Structure(
            "the network has no potential table".to_owned(),
        ));
    }
    let n_vars = tables
        .iter()
        .flat_map(|t| t.scope().iter())
        .max()
        .map_or(0, |v| v + 1);
    let mut cards: Vec<Option<usize>> = vec![None; n_vars];
    for table in tables {
        for (var, c) in table.scope().iter().zip(table.cardinalities().iter()) {
            match cards[*var] {
                Some(first) if first != *c => {
                    return Err(MnetError::InconsistentDomain {
                        var: *var,
                        first,
                        second: *c,
                    });
                }
                _ => cards[*var] = Some(*c),
            }
        }
    }
    cards
        .into_iter()
        .enumerate()
        .map(|(var, c): (VarId, _)| {
            c.ok_or_else(|| {
                MnetError::Structure(format!("variable {var} does not appear in any table"))
            })
        })
        .collect()
}

/// Build the factor graph of a list of potential tables.
pub fn build_graph(tables: &[PotentialTable]) -> Result<fg::FactorGraph> {
    let cardinalities = discover_cardinalities(tables)?;
    let mut graph = fg::FactorGraph::build(cardinalities);
    for table in tables {
        graph.add_factor(table.clone());
    }
    graph.cyclic = graph.detect_cycle();
    info!(
        "Built factor graph: {} variables, {} factors, {} edges, {}.",
        graph.n_vars(),
        graph.n_factors(),
        graph.n_edges(),
        if graph.cyclic { "cyclic" } else { "acyclic" }
    );
    Ok(graph)
}
