//! Exact partition function by enumeration.
//!
//! Every joint assignment is visited (variable 0 most significant, lexicographic order) and its
//! unnormalized log-weight accumulated with a streaming log-sum-exp. The cost is the product of
//! all domain sizes times the number of factors, which limits this to a few tens of binary
//! variables. For larger networks, set a budget in [`Config`](crate::Config) and inject an
//! estimate of the log partition instead.
//!
//! The assignment space is split in shards of consecutive assignments that are summed in
//! parallel and combined with log-sum-exp.

use std::time::Instant;

use log::info;
use rayon::prelude::*;

use crate::inference::FactorGraph;
use crate::utils::{with_progress, LogSumExp};
use crate::{ClassVal, Config, MnetError, Result};

/// Number of consecutive assignments summed by one task.
const SHARD_SIZE: u64 = 1 << 14;

/// Number of joint assignments, None if it does not fit in a u64.
pub fn n_assignments(cardinalities: &[usize]) -> Option<u64> {
    cardinalities
        .iter()
        .try_fold(1u64, |acc, c| acc.checked_mul(*c as u64))
}

/// Assignment at position `index` of the lexicographic enumeration.
fn decode_index(mut index: u64, cardinalities: &[usize]) -> Vec<ClassVal> {
    let mut assignment = vec![0; cardinalities.len()];
    for (x, c) in assignment.iter_mut().zip(cardinalities.iter()).rev() {
        *x = (index % *c as u64) as ClassVal;
        index /= *c as u64;
    }
    assignment
}

/// Next assignment in lexicographic order (last variable fastest). Returns false after the last
/// one.
fn increment(assignment: &mut [ClassVal], cardinalities: &[usize]) -> bool {
    for (x, c) in assignment.iter_mut().zip(cardinalities.iter()).rev() {
        *x += 1;
        if (*x as usize) < *c {
            return true;
        }
        *x = 0;
    }
    false
}

/// Natural logarithm of the sum of the unnormalized weights of all joint assignments.
pub fn log_partition(graph: &FactorGraph, config: &Config) -> Result<f64> {
    let cardinalities = graph.cardinalities();
    let n = n_assignments(&cardinalities).ok_or_else(|| MnetError::ResourceExhausted {
        n_assignments: u64::MAX,
        reason: "the number of assignments overflows".to_owned(),
    })?;
    if let Some(max) = config.max_assignments() {
        if n > max {
            return Err(MnetError::ResourceExhausted {
                n_assignments: n,
                reason: format!("limit is {max}"),
            });
        }
    }
    let log_tables: Vec<Vec<f64>> = graph
        .tables()
        .map(|t| t.values().iter().map(|w| w.ln()).collect())
        .collect();
    let n_shards = n.div_ceil(SHARD_SIZE);
    let start = Instant::now();
    let acc = with_progress(
        |it_cnt| {
            (0..n_shards)
                .into_par_iter()
                .map(|shard| {
                    if let Some(timeout) = config.partition_timeout() {
                        if start.elapsed() > timeout {
                            return Err(MnetError::ResourceExhausted {
                                n_assignments: n,
                                reason: format!("timeout of {timeout:?} exceeded"),
                            });
                        }
                    }
                    let first = shard * SHARD_SIZE;
                    let count = std::cmp::min(SHARD_SIZE, n - first);
                    let mut assignment = decode_index(first, &cardinalities);
                    let mut acc = LogSumExp::new();
                    for _ in 0..count {
                        let log_w: f64 = graph
                            .tables()
                            .zip(log_tables.iter())
                            .map(|(t, lt)| lt[t.offset_of(&assignment)])
                            .sum();
                        acc.add(log_w);
                        increment(&mut assignment, &cardinalities);
                    }
                    it_cnt.inc(1);
                    Ok(acc)
                })
                .try_reduce(LogSumExp::new, |a, b| Ok(a.merge(b)))
        },
        n_shards,
        "Partition function",
        config,
    )?;
    let log_z = acc.value();
    if log_z == f64::NEG_INFINITY {
        return Err(MnetError::EmptySupport);
    }
    info!(
        "Exact log partition over {n} assignments: {log_z} ({:?}).",
        start.elapsed()
    );
    Ok(log_z)
}
