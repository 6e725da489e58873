//! Network and sample files.
//!
//! Networks are stored either as JSON
//! (`{"tables": [{"scope": [0, 1], "rows": [[0, 0, 0.1], ...]}], "log_partition": null}`,
//! each row being the values of the scope followed by the weight) or in the binary format of
//! [`MarkovNetwork::to_bytes`]. Files ending in `.json` are JSON, anything else is binary.
//!
//! Sample files hold one comma-separated example per line; `?` marks an unobserved value and
//! lines starting with `#` are ignored.

use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use mnet::{BayesianNetwork, ClassVal, InferenceGraph, MarkovNetwork, PotentialTable, VarId};
use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug)]
pub struct TableFile {
    pub scope: Vec<VarId>,
    pub rows: Vec<Vec<f64>>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct NetworkFile {
    pub tables: Vec<TableFile>,
    #[serde(default)]
    pub log_partition: Option<f64>,
    /// Tables are conditional distributions (child last).
    #[serde(default)]
    pub directed: bool,
}

pub enum Network {
    Markov(MarkovNetwork),
    Bayesian(BayesianNetwork),
}

impl Network {
    pub fn as_graph(&self) -> &dyn InferenceGraph {
        match self {
            Network::Markov(n) => n,
            Network::Bayesian(n) => n,
        }
    }
}

impl TableFile {
    fn to_table(&self) -> Result<PotentialTable> {
        let rows = self
            .rows
            .iter()
            .map(|row| {
                ensure!(
                    row.len() == self.scope.len() + 1,
                    "row {row:?} of table over {:?} must have {} entries",
                    self.scope,
                    self.scope.len() + 1
                );
                let (values, w) = row.split_at(self.scope.len());
                let values = values
                    .iter()
                    .map(|x| {
                        ensure!(
                            *x >= 0.0 && x.fract() == 0.0 && *x <= ClassVal::MAX as f64,
                            "value {x} is not a valid class"
                        );
                        Ok(*x as ClassVal)
                    })
                    .collect::<Result<Vec<_>>>()?;
                Ok((values, w[0]))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(PotentialTable::from_rows(self.scope.clone(), &rows)?)
    }

    fn from_table(table: &PotentialTable) -> Self {
        Self {
            scope: table.scope().to_vec(),
            rows: table
                .rows()
                .map(|(values, w)| {
                    let mut row: Vec<f64> = values.iter().map(|x| *x as f64).collect();
                    row.push(w);
                    row
                })
                .collect(),
        }
    }
}

impl NetworkFile {
    pub fn from_tables(tables: &[PotentialTable], directed: bool) -> Self {
        Self {
            tables: tables.iter().map(TableFile::from_table).collect(),
            log_partition: if directed { None } else { Some(0.0) },
            directed,
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "json")
}

/// Load an unbaked network. For binary Markov networks, the stored partition is kept.
pub fn read_network(path: &Path) -> Result<Network> {
    if !is_json(path) {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        let network = MarkovNetwork::from_bytes(&bytes)
            .with_context(|| format!("decoding {}", path.display()))?;
        return Ok(Network::Markov(network));
    }
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let file: NetworkFile =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    let tables = file
        .tables
        .iter()
        .enumerate()
        .map(|(i, t)| t.to_table().with_context(|| format!("table {i}")))
        .collect::<Result<Vec<_>>>()?;
    if file.directed {
        return Ok(Network::Bayesian(BayesianNetwork::new(tables)?));
    }
    let mut network = MarkovNetwork::new(tables)?;
    if let Some(log_z) = file.log_partition {
        network.set_log_partition(log_z)?;
    }
    Ok(Network::Markov(network))
}

pub fn write_json(path: &Path, file: &NetworkFile) -> Result<()> {
    let text = serde_json::to_string_pretty(file)?;
    fs::write(path, text).with_context(|| format!("writing {}", path.display()))
}

pub fn write_binary(path: &Path, network: &MarkovNetwork) -> Result<()> {
    fs::write(path, network.to_bytes()?).with_context(|| format!("writing {}", path.display()))
}

/// Examples of a sample file, `None` for unobserved values.
pub fn read_samples(path: &Path) -> Result<Vec<Vec<Option<ClassVal>>>> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty() && !l.trim_start().starts_with('#'))
        .map(|(i, line)| {
            line.split(',')
                .map(|field| match field.trim() {
                    "?" => Ok(None),
                    v => v
                        .parse::<ClassVal>()
                        .map(Some)
                        .with_context(|| format!("line {}: invalid value {v:?}", i + 1)),
                })
                .collect()
        })
        .collect()
}

/// Fully observed samples as an (n, D) matrix.
pub fn read_full_samples(path: &Path) -> Result<Array2<ClassVal>> {
    let samples = read_samples(path)?;
    let d = samples.first().map_or(0, Vec::len);
    let mut res = Array2::zeros((samples.len(), d));
    for (i, (sample, mut row)) in samples.iter().zip(res.rows_mut()).enumerate() {
        if sample.len() != d {
            bail!("sample {i} has {} values, expected {d}", sample.len());
        }
        for (x, slot) in sample.iter().zip(row.iter_mut()) {
            *slot = (*x).with_context(|| format!("sample {i} is not fully observed"))?;
        }
    }
    Ok(res)
}
