use std::sync::Arc;

use log::info;

use super::InferenceGraph;
use crate::inference::{build_graph, discover_cardinalities, FactorGraph};
use crate::potential::PotentialTable;
use crate::{partition, Config, MnetError, Result};

/// Undirected network: a product of potential tables, normalized by the partition function.
///
/// Lifecycle: the network is built from its tables, then [`bake`](Self::bake) freezes the
/// factor graph and optionally computes the exact partition function. Changing the tables
/// afterwards drops both and the network must be baked again.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct MarkovNetwork {
    tables: Vec<PotentialTable>,
    log_partition: Option<f64>,
    #[serde(skip)]
    graph: Option<Arc<FactorGraph>>,
}

impl MarkovNetwork {
    /// Every variable in [0, D) must appear in at least one table, with the same cardinality
    /// in all tables.
    pub fn new(tables: Vec<PotentialTable>) -> Result<Self> {
        discover_cardinalities(&tables)?;
        Ok(Self {
            tables,
            log_partition: None,
            graph: None,
        })
    }

    pub fn tables(&self) -> &[PotentialTable] {
        &self.tables
    }
    pub fn n_vars(&self) -> usize {
        self.tables
            .iter()
            .flat_map(|t| t.scope().iter())
            .max()
            .map_or(0, |v| v + 1)
    }

    pub fn add_table(&mut self, table: PotentialTable) -> Result<()> {
        let mut tables = self.tables.clone();
        tables.push(table);
        self.set_tables(tables)
    }
    pub fn replace_table(&mut self, index: usize, table: PotentialTable) -> Result<()> {
        if index >= self.tables.len() {
            return Err(MnetError::Structure(format!(
                "no table {index} in a network of {} tables",
                self.tables.len()
            )));
        }
        let mut tables = self.tables.clone();
        tables[index] = table;
        self.set_tables(tables)
    }
    fn set_tables(&mut self, tables: Vec<PotentialTable>) -> Result<()> {
        discover_cardinalities(&tables)?;
        self.tables = tables;
        self.graph = None;
        self.log_partition = None;
        Ok(())
    }

    pub fn is_baked(&self) -> bool {
        self.graph.is_some()
    }

    /// Freeze the factor graph. If `calculate_partition`, also compute the exact partition
    /// function. Otherwise a partition set with [`set_log_partition`](Self::set_log_partition)
    /// since the tables last changed is kept; without one, only unnormalized queries succeed.
    ///
    /// If the partition computation exceeds the budget of `config`, the network is still baked
    /// (without partition) and `ResourceExhausted` is returned.
    pub fn bake(&mut self, calculate_partition: bool, config: &Config) -> Result<()> {
        let graph = Arc::new(build_graph(&self.tables)?);
        self.graph = Some(graph.clone());
        if calculate_partition {
            self.log_partition = None;
            self.log_partition = Some(partition::log_partition(&graph, config)?);
        }
        Ok(())
    }

    /// Set the log partition from an external estimate instead of exact enumeration.
    ///
    /// The value is dropped when the tables change.
    pub fn set_log_partition(&mut self, log_partition: f64) -> Result<()> {
        if !log_partition.is_finite() {
            return Err(MnetError::InvalidPartition(log_partition));
        }
        info!("Log partition set to {log_partition}.");
        self.log_partition = Some(log_partition);
        Ok(())
    }

    pub fn partition(&self) -> Result<f64> {
        self.log_partition().map(f64::exp)
    }

    pub fn is_cyclic(&self) -> Result<bool> {
        Ok(self.factor_graph()?.is_cyclic())
    }

    /// Serialize the tables and the cached log partition.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(bincode::serialize(self)?)
    }

    /// Restore a network serialized with [`to_bytes`](Self::to_bytes). The factor graph is
    /// rebuilt, the log partition is kept as it was stored.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let stored: Self = bincode::deserialize(bytes)?;
        let mut network = Self::new(stored.tables)?;
        network.graph = Some(Arc::new(build_graph(&network.tables)?));
        network.log_partition = stored.log_partition;
        Ok(network)
    }
}

impl InferenceGraph for MarkovNetwork {
    fn factor_graph(&self) -> Result<&Arc<FactorGraph>> {
        self.graph.as_ref().ok_or(MnetError::NotBaked)
    }
    fn log_partition(&self) -> Result<f64> {
        self.log_partition.ok_or(MnetError::PartitionNotComputed)
    }
}
