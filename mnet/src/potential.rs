//! Dense potential tables over an ordered scope of discrete variables.
//!
//! A table stores one non-negative weight for every combination of values of the variables in
//! its scope, as an n-dimensional array whose axis k has the cardinality of `scope[k]`.

use itertools::Itertools;
use ndarray::{ArrayD, ArrayViewD, Axis, Dimension, IxDyn};

use crate::{ClassVal, MnetError, Result, VarId};

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "PotentialTableSer", into = "PotentialTableSer")]
pub struct PotentialTable {
    scope: Vec<VarId>,
    // Standard (C) layout, shape = cardinalities of the scope.
    values: ArrayD<f64>,
}

// Deserialized tables go through the same checks as constructed ones.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct PotentialTableSer {
    scope: Vec<VarId>,
    values: ArrayD<f64>,
}

impl TryFrom<PotentialTableSer> for PotentialTable {
    type Error = MnetError;
    fn try_from(t: PotentialTableSer) -> Result<Self> {
        Self::from_array(t.scope, t.values)
    }
}

impl From<PotentialTable> for PotentialTableSer {
    fn from(t: PotentialTable) -> Self {
        Self {
            scope: t.scope,
            values: t.values,
        }
    }
}

/// Number of entries of a dense table with these axis lengths, None if it does not fit in
/// memory addressing.
pub(crate) fn checked_size(cardinalities: &[usize]) -> Option<usize> {
    cardinalities
        .iter()
        .try_fold(1usize, |acc, c| acc.checked_mul(*c))
        .filter(|n| *n <= isize::MAX as usize / std::mem::size_of::<f64>())
}

impl PotentialTable {
    /// Build a table from a dense array of weights; axis k of `values` corresponds to
    /// `scope[k]`.
    pub fn from_array(scope: Vec<VarId>, values: ArrayD<f64>) -> Result<Self> {
        if scope.is_empty() {
            return Err(MnetError::MalformedTable("empty scope".to_owned()));
        }
        if scope.len() != values.ndim() {
            return Err(MnetError::MalformedTable(format!(
                "scope has {} variables but the table has {} dimensions",
                scope.len(),
                values.ndim()
            )));
        }
        if let Some(var) = scope.iter().duplicates().next() {
            return Err(MnetError::MalformedTable(format!(
                "variable {var} appears twice in the scope"
            )));
        }
        if let Some(pos) = values.shape().iter().position(|c| *c == 0) {
            return Err(MnetError::MalformedTable(format!(
                "variable {} has an empty domain",
                scope[pos]
            )));
        }
        if let Some(w) = values.iter().find(|w| !w.is_finite() || **w < 0.0) {
            return Err(MnetError::MalformedTable(format!(
                "weights must be finite and non-negative, found {w}"
            )));
        }
        let values = values.as_standard_layout().into_owned();
        Ok(Self { scope, values })
    }

    /// Build a table from rows of `(values, weight)`.
    ///
    /// The cardinality of each variable is inferred as the largest value found in its column
    /// plus one. The rows must cover the Cartesian product of the domains exactly once: with as
    /// many rows as combinations and no duplicate, none is missing.
    pub fn from_rows(scope: Vec<VarId>, rows: &[(Vec<ClassVal>, f64)]) -> Result<Self> {
        if let Some((row, _)) = rows.iter().find(|(row, _)| row.len() != scope.len()) {
            return Err(MnetError::MalformedTable(format!(
                "row {row:?} has {} values, scope has {} variables",
                row.len(),
                scope.len()
            )));
        }
        let cardinalities: Vec<usize> = (0..scope.len())
            .map(|k| {
                rows.iter()
                    .map(|(row, _)| row[k] as usize + 1)
                    .max()
                    .unwrap_or(0)
            })
            .collect();
        let size = checked_size(&cardinalities);
        if size != Some(rows.len()) {
            return Err(MnetError::MalformedTable(format!(
                "{} rows cannot cover the domains {cardinalities:?}",
                rows.len()
            )));
        }
        let mut values = ArrayD::zeros(IxDyn(&cardinalities));
        let mut seen = ArrayD::from_elem(IxDyn(&cardinalities), false);
        for (row, w) in rows {
            let idx: Vec<usize> = row.iter().map(|x| *x as usize).collect();
            let slot = &mut seen[IxDyn(&idx)];
            if *slot {
                return Err(MnetError::MalformedTable(format!("duplicate row {row:?}")));
            }
            *slot = true;
            values[IxDyn(&idx)] = *w;
        }
        Self::from_array(scope, values)
    }

    pub fn scope(&self) -> &[VarId] {
        &self.scope
    }
    /// Domain size of each variable of the scope, in scope order.
    pub fn cardinalities(&self) -> &[usize] {
        self.values.shape()
    }
    pub fn cardinality_of(&self, var: VarId) -> Option<usize> {
        self.axis_of(var).map(|ax| self.values.shape()[ax])
    }
    pub fn values(&self) -> ArrayViewD<'_, f64> {
        self.values.view()
    }
    pub(crate) fn axis_of(&self, var: VarId) -> Option<usize> {
        self.scope.iter().position(|v| *v == var)
    }

    /// Rows of the table in lexicographic order of the values.
    pub fn rows(&self) -> impl Iterator<Item = (Vec<ClassVal>, f64)> + '_ {
        self.values.indexed_iter().map(|(idx, w)| {
            (
                idx.slice().iter().map(|x| *x as ClassVal).collect(),
                *w,
            )
        })
    }

    pub fn sum(&self) -> f64 {
        self.values.sum()
    }
    pub fn is_normalized(&self, tol: f64) -> bool {
        (self.sum() - 1.0).abs() <= tol
    }
    /// Copy of the table scaled to sum to one.
    pub fn normalized(&self) -> Result<Self> {
        let s = self.sum();
        if s <= 0.0 {
            return Err(MnetError::EmptySupport);
        }
        Ok(Self {
            scope: self.scope.clone(),
            values: self.values.mapv(|w| w / s),
        })
    }

    pub(crate) fn check_assignment(&self, assignment: &[ClassVal]) -> Result<()> {
        if assignment.len() != self.scope.len() {
            return Err(MnetError::Scope {
                expected: self.scope.len(),
                got: assignment.len(),
            });
        }
        for ((var, value), c) in self
            .scope
            .iter()
            .zip(assignment.iter())
            .zip(self.values.shape().iter())
        {
            if *value as usize >= *c {
                return Err(MnetError::Domain {
                    var: *var,
                    value: *value,
                    cardinality: *c,
                });
            }
        }
        Ok(())
    }

    /// Weight of a full assignment of the scope (values in scope order).
    pub fn probability(&self, assignment: &[ClassVal]) -> Result<f64> {
        self.check_assignment(assignment)?;
        let idx: Vec<usize> = assignment.iter().map(|x| *x as usize).collect();
        Ok(self.values[IxDyn(&idx)])
    }

    pub fn log_probability(&self, assignment: &[ClassVal]) -> Result<f64> {
        self.probability(assignment).map(f64::ln)
    }

    /// Offset in the flat (standard layout) table of the projection of a network-wide
    /// assignment onto the scope. The assignment must already be domain-checked.
    pub(crate) fn offset_of(&self, full: &[ClassVal]) -> usize {
        self.scope
            .iter()
            .zip(self.values.shape().iter())
            .fold(0, |acc, (var, c)| acc * c + full[*var] as usize)
    }

    /// Weight of the projection of a network-wide assignment onto the scope.
    pub(crate) fn weight_of(&self, full: &[ClassVal]) -> f64 {
        let values = self
            .values
            .as_slice()
            .expect("Tables are kept in standard layout.");
        values[self.offset_of(full)]
    }

    /// Table over `subset` (in the given order), obtained by summing out the other variables.
    pub fn marginalize(&self, subset: &[VarId]) -> Result<Self> {
        if let Some(var) = subset.iter().duplicates().next() {
            return Err(MnetError::MalformedTable(format!(
                "variable {var} appears twice in the marginalization subset"
            )));
        }
        let axes = subset
            .iter()
            .map(|v| self.axis_of(*v).ok_or(MnetError::NotInScope(*v)))
            .collect::<Result<Vec<_>>>()?;
        let mut values = self.values.clone();
        let mut kept: Vec<usize> = (0..self.scope.len()).collect();
        for ax in (0..self.scope.len()).rev() {
            if !axes.contains(&ax) {
                values = values.sum_axis(Axis(ax));
                kept.remove(ax);
            }
        }
        // kept[i] is the original axis now at position i; reorder to follow `subset`.
        let perm: Vec<usize> = axes
            .iter()
            .map(|ax| {
                kept.iter()
                    .position(|k| k == ax)
                    .expect("Subset axes are kept.")
            })
            .collect();
        let values = values.permuted_axes(IxDyn(&perm));
        Self::from_array(subset.to_vec(), values)
    }

    /// Pointwise product over the union of both scopes (outer-join semantics).
    ///
    /// The result scope is the scope of `self` followed by the variables that only `other`
    /// covers.
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        let mut scope = self.scope.clone();
        let mut cards = self.cardinalities().to_vec();
        for (var, c) in other.scope.iter().zip(other.cardinalities().iter()) {
            match self.cardinality_of(*var) {
                Some(c_self) if c_self != *c => {
                    return Err(MnetError::InconsistentDomain {
                        var: *var,
                        first: c_self,
                        second: *c,
                    });
                }
                Some(_) => {}
                None => {
                    scope.push(*var);
                    cards.push(*c);
                }
            }
        }
        // position of each variable of `other` in the union scope
        let other_axes: Vec<usize> = other
            .scope
            .iter()
            .map(|v| {
                scope
                    .iter()
                    .position(|u| u == v)
                    .expect("The union scope contains every variable.")
            })
            .collect();
        let n_self = self.scope.len();
        let values = ArrayD::from_shape_fn(IxDyn(&cards), |ix| {
            let ix = ix.slice();
            let other_idx: Vec<usize> = other_axes.iter().map(|ax| ix[*ax]).collect();
            self.values[&ix[..n_self]] * other.values[other_idx.as_slice()]
        });
        Self::from_array(scope, values)
    }
}
