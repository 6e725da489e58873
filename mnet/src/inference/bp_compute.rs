use ndarray::{Array1, ArrayD, ArrayView1, Axis, Ix1};

use super::factor_graph::Factor;
use crate::ClassVal;

type Proba = f64;

/// The minimum non-zero probability (to avoid denormalization, etc.)
const MIN_PROBA: Proba = 1e-40;

#[derive(Debug, Clone)]
enum DistrRepr {
    Uniform,
    Full(Array1<Proba>),
}

/// Distribution over the values of one variable, used both for messages and marginals.
///
/// Uniform distributions are kept implicit so that they cost nothing to multiply.
#[derive(Debug, Clone)]
pub struct Distribution {
    nc: usize,
    value: DistrRepr,
}

impl Distribution {
    pub fn new(nc: usize) -> Self {
        Self {
            nc,
            value: DistrRepr::Uniform,
        }
    }
    pub fn from_array(array: Array1<Proba>) -> Self {
        Self {
            nc: array.len(),
            value: DistrRepr::Full(array),
        }
    }
    pub fn one_hot(nc: usize, value: ClassVal) -> Self {
        let mut v = Array1::zeros(nc);
        v[value as usize] = 1.0;
        Self::from_array(v)
    }
    pub fn value(&self) -> Option<ArrayView1<'_, Proba>> {
        if let DistrRepr::Full(v) = &self.value {
            Some(v.view())
        } else {
            None
        }
    }
    /// Explicit probability vector.
    pub fn probabilities(&self) -> Array1<Proba> {
        match &self.value {
            DistrRepr::Full(v) => v.clone(),
            DistrRepr::Uniform => Array1::from_elem(self.nc, 1.0 / (self.nc as Proba)),
        }
    }
    pub fn into_probabilities(self) -> Array1<Proba> {
        match self.value {
            DistrRepr::Full(v) => v,
            DistrRepr::Uniform => Array1::from_elem(self.nc, 1.0 / (self.nc as Proba)),
        }
    }

    pub fn multiply<'a>(&mut self, factors: impl Iterator<Item = &'a Distribution>) {
        for factor in factors {
            assert_eq!(self.nc, factor.nc);
            if let DistrRepr::Full(d) = &factor.value {
                match &mut self.value {
                    DistrRepr::Uniform => {
                        self.value = DistrRepr::Full(d.clone());
                    }
                    DistrRepr::Full(v) => {
                        *v *= d;
                    }
                }
            }
        }
    }
    /// Normalize sum to one. A distribution with zero mass becomes uniform.
    pub fn normalize(&mut self) {
        if let DistrRepr::Full(v) = &mut self.value {
            if !crate::utils::normalize(v) {
                self.value = DistrRepr::Uniform;
            }
        }
    }
    /// Normalize sum to one, and make values not too small
    pub fn regularize(&mut self) {
        if let DistrRepr::Full(v) = &mut self.value {
            let norm_f = 1.0 / (v.sum() + MIN_PROBA * v.len() as f64);
            v.mapv_inplace(|x| (x + MIN_PROBA) * norm_f);
        }
    }
    /// Largest absolute difference between the probability vectors.
    pub fn distance(&self, other: &Self) -> Proba {
        match (&self.value, &other.value) {
            (DistrRepr::Uniform, DistrRepr::Uniform) => 0.0,
            _ => {
                let a = self.probabilities();
                let b = other.probabilities();
                a.iter()
                    .zip(b.iter())
                    .fold(0.0, |acc: Proba, (x, y)| acc.max((x - y).abs()))
            }
        }
    }
}

/// Message from a factor to the variable at position `dest` of its scope: the potential table
/// multiplied by the incoming messages of all other variables, summed over those variables.
pub(super) fn factor_message(
    factor: &Factor,
    dest: usize,
    belief_from_var: &[Distribution],
) -> Distribution {
    let mut acc: ArrayD<Proba> = factor.table.values().to_owned();
    // Contract from the last axis down, so that lower axis indices stay valid.
    for (pos, e) in factor.edges.values().enumerate().rev() {
        if pos == dest {
            continue;
        }
        let mut reduced = ArrayD::zeros(acc.index_axis(Axis(pos), 0).raw_dim());
        if let Some(distr) = belief_from_var[*e].value() {
            for (d, slice) in distr.iter().zip(acc.axis_iter(Axis(pos))) {
                if *d != 0.0 {
                    reduced.scaled_add(*d, &slice);
                }
            }
        } else {
            // For uniform, we implicitly multiply by 1.0
            for slice in acc.axis_iter(Axis(pos)) {
                reduced += &slice;
            }
        }
        acc = reduced;
    }
    let acc = acc
        .into_dimensionality::<Ix1>()
        .expect("Only the destination axis is left.");
    let mut res = Distribution::from_array(acc);
    res.regularize();
    res
}
