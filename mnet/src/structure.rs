//! Chow-Liu structure learning.
//!
//! Given samples of D discrete variables, finds the tree that maximizes the sum of the empirical
//! pairwise mutual information (maximum spanning tree, grown from variable 0) and fits one
//! table per variable on it. The tables are a root marginal and one conditional table per tree
//! edge (parent first, child last), so the product of the tables is normalized and they can
//! be used either as a [`MarkovNetwork`](crate::MarkovNetwork) (with Z = 1) or as a
//! [`BayesianNetwork`](crate::BayesianNetwork).

use itertools::Itertools;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use rayon::prelude::*;

use crate::potential::{checked_size, PotentialTable};
use crate::{ClassVal, MnetError, Result, VarId};

fn check_samples(samples: &ArrayView2<ClassVal>, pseudocount: f64) -> Result<Vec<usize>> {
    let (n, d) = samples.dim();
    if n == 0 || d == 0 {
        return Err(MnetError::Structure(format!(
            "cannot learn a structure from {n} samples of {d} variables"
        )));
    }
    if !(pseudocount >= 0.0 && pseudocount.is_finite()) {
        return Err(MnetError::Structure(format!(
            "pseudocount must be finite and non-negative, got {pseudocount}"
        )));
    }
    Ok(samples
        .axis_iter(Axis(1))
        .map(|col| col.iter().max().map_or(0, |m| *m as usize + 1))
        .collect())
}

/// Smoothed joint distribution of two variables.
fn joint_distribution(
    x: ArrayView1<ClassVal>,
    y: ArrayView1<ClassVal>,
    nc_x: usize,
    nc_y: usize,
    pseudocount: f64,
) -> Result<Array2<f64>> {
    if checked_size(&[nc_x, nc_y]).is_none() {
        return Err(MnetError::Structure(format!(
            "joint table of {nc_x} by {nc_y} values is too large"
        )));
    }
    let mut counts = Array2::from_elem((nc_x, nc_y), pseudocount);
    for (x, y) in x.iter().zip(y.iter()) {
        counts[(*x as usize, *y as usize)] += 1.0;
    }
    let total = counts.sum();
    counts.mapv_inplace(|c| c / total);
    Ok(counts)
}

/// Empirical mutual information (in nats) of two variables.
pub fn mutual_information(
    x: ArrayView1<ClassVal>,
    y: ArrayView1<ClassVal>,
    pseudocount: f64,
) -> Result<f64> {
    let nc_x = x.iter().max().map_or(0, |m| *m as usize + 1);
    let nc_y = y.iter().max().map_or(0, |m| *m as usize + 1);
    if nc_x == 0 || nc_y == 0 {
        return Ok(0.0);
    }
    let joint = joint_distribution(x, y, nc_x, nc_y, pseudocount)?;
    Ok(mutual_information_joint(&joint))
}

fn mutual_information_joint(joint: &Array2<f64>) -> f64 {
    let p_x = joint.sum_axis(Axis(1));
    let p_y = joint.sum_axis(Axis(0));
    joint
        .indexed_iter()
        .filter(|(_, p)| **p > 0.0)
        .map(|((i, j), p)| p * (p / (p_x[i] * p_y[j])).ln())
        .sum::<f64>()
        .max(0.0)
}

/// Parent of each variable in the maximum mutual information spanning tree rooted at
/// variable 0 (None for the root), and the order in which variables joined the tree.
pub fn chow_liu_tree(
    samples: ArrayView2<ClassVal>,
    pseudocount: f64,
) -> Result<(Vec<Option<VarId>>, Vec<VarId>)> {
    let cards = check_samples(&samples, pseudocount)?;
    let d = cards.len();
    let pairs: Vec<(usize, usize)> = (0..d).tuple_combinations().collect();
    let mi = pairs
        .par_iter()
        .map(|(i, j)| {
            let joint = joint_distribution(
                samples.column(*i),
                samples.column(*j),
                cards[*i],
                cards[*j],
                pseudocount,
            )?;
            Ok(mutual_information_joint(&joint))
        })
        .collect::<Result<Vec<f64>>>()?;
    let mut weights = Array2::<f64>::zeros((d, d));
    for ((i, j), w) in pairs.iter().zip(mi.iter()) {
        weights[(*i, *j)] = *w;
        weights[(*j, *i)] = *w;
    }
    // Prim's algorithm on the dense weight matrix.
    let mut parent: Vec<Option<VarId>> = vec![None; d];
    let mut in_tree = vec![false; d];
    let mut best = Array1::from_elem(d, f64::NEG_INFINITY);
    let mut order = Vec::with_capacity(d);
    best[0] = 0.0;
    while let Some(next) = (0..d)
        .filter(|v| !in_tree[*v])
        .fold(None, |acc: Option<usize>, v| match acc {
            Some(b) if best[b] >= best[v] => Some(b),
            _ => Some(v),
        })
    {
        in_tree[next] = true;
        order.push(next);
        for v in 0..d {
            if !in_tree[v] && weights[(next, v)] > best[v] {
                best[v] = weights[(next, v)];
                parent[v] = Some(next);
            }
        }
    }
    Ok((parent, order))
}

/// Learn a tree-structured network from samples of shape (n, D).
///
/// `pseudocount` is added to every count before estimating the tables.
pub fn chow_liu(samples: ArrayView2<ClassVal>, pseudocount: f64) -> Result<Vec<PotentialTable>> {
    let cards = check_samples(&samples, pseudocount)?;
    let (parent, order) = chow_liu_tree(samples, pseudocount)?;
    order
        .into_iter()
        .map(|var| match parent[var] {
            None => {
                let mut counts = Array1::from_elem(cards[var], pseudocount);
                for x in samples.column(var) {
                    counts[*x as usize] += 1.0;
                }
                let total = counts.sum();
                counts.mapv_inplace(|c| c / total);
                PotentialTable::from_array(vec![var], counts.into_dyn())
            }
            Some(p) => {
                let mut joint = joint_distribution(
                    samples.column(p),
                    samples.column(var),
                    cards[p],
                    cards[var],
                    pseudocount,
                )?;
                for mut row in joint.axis_iter_mut(Axis(0)) {
                    let s = row.sum();
                    if s > 0.0 {
                        row.mapv_inplace(|c| c / s);
                    } else {
                        // parent value never observed
                        row.fill(1.0 / cards[var] as f64);
                    }
                }
                PotentialTable::from_array(vec![p, var], joint.into_dyn())
            }
        })
        .collect()
}
