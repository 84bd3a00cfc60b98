//! Classification family: per-output, per-class weighted count histograms
//! (spec §4.2), shared by [`Gini`](crate::Gini) and [`Entropy`](crate::Entropy).

mod entropy;
mod gini;

pub use entropy::Entropy;
pub use gini::Gini;

use std::marker::PhantomData;

use ndarray::{ArrayView1, ArrayView2};

use crate::cursor::{sweep_update, NodeCursor};
use crate::error::{Error, Result};
use crate::Criterion;

/// Per-output class counts, the classification family's only
/// construction-time parameter beyond `n_outputs` (spec §6). A newtype over
/// `Vec<usize>` rather than a bare vector so it can carry `serde` support
/// (behind the `serde-support` feature) without touching the transient
/// per-node histograms it has nothing to do with.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct ClassCounts(pub Vec<usize>);

impl From<Vec<usize>> for ClassCounts {
    fn from(counts: Vec<usize>) -> Self {
        Self(counts)
    }
}

impl std::ops::Deref for ClassCounts {
    type Target = [usize];

    fn deref(&self) -> &[usize] {
        &self.0
    }
}

/// Per-output-per-class impurity formula, the only thing that differs
/// between [`Gini`] and [`Entropy`] — both share every other byte of state
/// and update logic, so they are instantiated as
/// `ClassificationCriterion<GiniKind>` / `ClassificationCriterion<EntropyKind>`
/// rather than duplicating the histogram machinery twice.
pub trait ImpurityKind {
    /// Impurity contribution of one output's class histogram, given the
    /// class counts for that output (length `n_classes[k]`, padded entries
    /// excluded by the caller) and that side's total weight.
    fn impurity_from_counts(counts: &[f64], weighted_n: f64) -> f64;
}

/// Flat `n_outputs * max_n_classes` histogram storage, ragged per output
/// (only the first `n_classes[k]` entries of output `k`'s row are
/// meaningful — see spec §9, "rectangular ragged histogram").
pub struct ClassificationBase<'a> {
    y: ArrayView2<'a, f64>,
    sample_weight: Option<ArrayView1<'a, f64>>,
    sample_indices: ArrayView1<'a, usize>,
    cursor: NodeCursor,
    n_outputs: usize,
    n_classes: Vec<usize>,
    max_n_classes: usize,
    sum_total: Vec<f64>,
    sum_left: Vec<f64>,
    sum_right: Vec<f64>,
    sum_missing: Vec<f64>,
}

impl<'a> ClassificationBase<'a> {
    fn new(n_outputs: usize, n_classes: Vec<usize>) -> Result<Self> {
        if n_outputs == 0 {
            return Err(Error::InvalidParameter("n_outputs must be at least 1".into()));
        }
        if n_classes.len() != n_outputs {
            return Err(Error::InvalidParameter(
                "n_classes must have one entry per output".into(),
            ));
        }
        if n_classes.iter().any(|&c| c == 0) {
            return Err(Error::InvalidParameter(
                "every output needs at least one class".into(),
            ));
        }
        let max_n_classes = *n_classes.iter().max().unwrap();
        let len = n_outputs * max_n_classes;
        Ok(Self {
            y: ArrayView2::from_shape((0, n_outputs), &[]).unwrap(),
            sample_weight: None,
            sample_indices: ArrayView1::from_shape(0, &[]).unwrap(),
            cursor: NodeCursor::default(),
            n_outputs,
            n_classes,
            max_n_classes,
            sum_total: vec![0.0; len],
            sum_left: vec![0.0; len],
            sum_right: vec![0.0; len],
            sum_missing: vec![0.0; len],
        })
    }

    #[inline]
    fn slot(&self, k: usize, c: usize) -> usize {
        k * self.max_n_classes + c
    }

    fn init(
        &mut self,
        y: ArrayView2<'a, f64>,
        sample_weight: Option<ArrayView1<'a, f64>>,
        weighted_n_samples: f64,
        sample_indices: ArrayView1<'a, usize>,
        start: usize,
        end: usize,
    ) -> Result<()> {
        self.y = y;
        self.sample_weight = sample_weight;
        self.sample_indices = sample_indices;

        self.sum_total.iter_mut().for_each(|v| *v = 0.0);
        let mut weighted_n_node_samples = 0.0;
        for i in start..end {
            let idx = sample_indices[i];
            let w = sample_weight.map_or(1.0, |sw| sw[idx]);
            weighted_n_node_samples += w;
            for k in 0..self.n_outputs {
                let c = y[[idx, k]] as usize;
                let slot = self.slot(k, c);
                self.sum_total[slot] += w;
            }
        }

        self.cursor
            .bind(weighted_n_samples, weighted_n_node_samples, start, end);
        self.reset();
        Ok(())
    }

    fn init_missing(&mut self, n_missing: usize) -> Result<()> {
        self.cursor.n_missing = n_missing;
        self.sum_missing.iter_mut().for_each(|v| *v = 0.0);
        self.cursor.weighted_n_missing = 0.0;
        if n_missing == 0 {
            return Ok(());
        }
        let start_missing = self.cursor.end - n_missing;
        for i in start_missing..self.cursor.end {
            let idx = self.sample_indices[i];
            let w = self.sample_weight.map_or(1.0, |sw| sw[idx]);
            self.cursor.weighted_n_missing += w;
            for k in 0..self.n_outputs {
                let c = self.y[[idx, k]] as usize;
                let slot = self.slot(k, c);
                self.sum_missing[slot] += w;
            }
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.cursor.reset_weights();
        let missing_go_to_left = self.cursor.missing_go_to_left;
        for i in 0..self.sum_total.len() {
            self.sum_left[i] = if missing_go_to_left { self.sum_missing[i] } else { 0.0 };
            self.sum_right[i] = self.sum_total[i] - self.sum_left[i];
        }
    }

    fn reverse_reset(&mut self) {
        self.cursor.reverse_reset_weights();
        let missing_go_to_left = self.cursor.missing_go_to_left;
        for i in 0..self.sum_total.len() {
            self.sum_left[i] = if missing_go_to_left {
                self.sum_total[i]
            } else {
                self.sum_total[i] - self.sum_missing[i]
            };
            self.sum_right[i] = self.sum_total[i] - self.sum_left[i];
        }
    }

    fn update(&mut self, new_pos: usize) {
        let n_outputs = self.n_outputs;
        let max_n_classes = self.max_n_classes;
        let y = self.y;
        let sample_weight = self.sample_weight;
        let sample_indices = self.sample_indices;
        let sum_total = &self.sum_total;
        let sum_missing = &self.sum_missing;
        let sum_left = &mut self.sum_left;
        let sum_right = &mut self.sum_right;

        sweep_update(
            &mut self.cursor,
            sample_indices,
            sample_weight,
            new_pos,
            |cursor| {
                cursor.reverse_reset_weights();
                for i in 0..sum_left.len() {
                    sum_left[i] = if cursor.missing_go_to_left {
                        sum_total[i]
                    } else {
                        sum_total[i] - sum_missing[i]
                    };
                    sum_right[i] = sum_total[i] - sum_left[i];
                }
            },
            |idx, w, adding| {
                for k in 0..n_outputs {
                    let c = y[[idx, k]] as usize;
                    let slot = k * max_n_classes + c;
                    if adding {
                        sum_left[slot] += w;
                        sum_right[slot] -= w;
                    } else {
                        sum_left[slot] -= w;
                        sum_right[slot] += w;
                    }
                }
            },
        );
    }

    fn impurity_over<K: ImpurityKind>(&self, sums: &[f64], weighted_n: f64) -> f64 {
        if weighted_n <= 0.0 {
            return 0.0;
        }
        let mut total = 0.0;
        for k in 0..self.n_outputs {
            let start = k * self.max_n_classes;
            let counts = &sums[start..start + self.n_classes[k]];
            total += K::impurity_from_counts(counts, weighted_n);
        }
        total / self.n_outputs as f64
    }

    fn node_value(&self, dest: &mut [f64]) {
        let weighted_n = self.cursor.weighted_n_node_samples;
        self.proportions_into(&self.sum_total, weighted_n, dest);
    }

    fn proportions_into(&self, sums: &[f64], weighted_n: f64, dest: &mut [f64]) {
        for k in 0..self.n_outputs {
            let start = k * self.max_n_classes;
            for c in 0..self.n_classes[k] {
                let slot = start + c;
                dest[slot] = if weighted_n > 0.0 { sums[slot] / weighted_n } else { 0.0 };
            }
        }
    }

    fn is_binary_single_output(&self) -> bool {
        self.n_outputs == 1 && self.n_classes[0] == 2
    }

    /// Weighted proportion of the positive class (the highest class index)
    /// in output `0` on a given side; the quantity monotonicity constraints
    /// and `middle_value` are defined over (spec §4.1: "child values for
    /// output 0"). For the binary case this is the proportion of class `1`.
    fn class1_proportion(&self, sums: &[f64], weighted_n: f64) -> f64 {
        if weighted_n <= 0.0 {
            return 0.0;
        }
        let slot = self.slot(0, self.n_classes[0] - 1);
        sums[slot] / weighted_n
    }
}

/// A classification criterion generic over its impurity formula; see
/// [`Gini`] and [`Entropy`] for the two instantiations this crate exposes.
pub struct ClassificationCriterion<'a, K> {
    base: ClassificationBase<'a>,
    _kind: PhantomData<K>,
}

impl<'a, K: ImpurityKind> ClassificationCriterion<'a, K> {
    /// `n_classes[k]` is the number of distinct classes output `k` takes.
    pub fn new(n_outputs: usize, n_classes: impl Into<ClassCounts>) -> Result<Self> {
        let ClassCounts(n_classes) = n_classes.into();
        Ok(Self {
            base: ClassificationBase::new(n_outputs, n_classes)?,
            _kind: PhantomData,
        })
    }
}

impl<'a, K: ImpurityKind> Criterion<'a> for ClassificationCriterion<'a, K> {
    fn init(
        &mut self,
        y: ArrayView2<'a, f64>,
        sample_weight: Option<ArrayView1<'a, f64>>,
        weighted_n_samples: f64,
        sample_indices: ArrayView1<'a, usize>,
        start: usize,
        end: usize,
    ) -> Result<()> {
        self.base
            .init(y, sample_weight, weighted_n_samples, sample_indices, start, end)
    }

    fn init_missing(&mut self, n_missing: usize) -> Result<()> {
        self.base.init_missing(n_missing)
    }

    fn reset(&mut self) {
        self.base.reset();
    }

    fn reverse_reset(&mut self) {
        self.base.reverse_reset();
    }

    fn update(&mut self, new_pos: usize) {
        self.base.update(new_pos);
    }

    fn node_impurity(&self) -> f64 {
        self.base
            .impurity_over::<K>(&self.base.sum_total, self.base.cursor.weighted_n_node_samples)
    }

    fn children_impurity(&self, impurity_left: &mut f64, impurity_right: &mut f64) {
        *impurity_left = self
            .base
            .impurity_over::<K>(&self.base.sum_left, self.base.cursor.weighted_n_left);
        *impurity_right = self
            .base
            .impurity_over::<K>(&self.base.sum_right, self.base.cursor.weighted_n_right);
    }

    fn node_value(&self, dest: &mut [f64]) {
        self.base.node_value(dest);
    }

    fn clip_node_value(&self, dest: &mut [f64], lower_bound: f64, upper_bound: f64) {
        dest[0] = dest[0].clamp(lower_bound, upper_bound);
        if self.base.is_binary_single_output() {
            debug_assert!(dest.len() >= 2, "binary classification node_value must carry both class slots");
            if dest.len() >= 2 {
                dest[1] = 1.0 - dest[0];
            }
        }
    }

    fn middle_value(&self) -> f64 {
        let left = self
            .base
            .class1_proportion(&self.base.sum_left, self.base.cursor.weighted_n_left);
        let right = self
            .base
            .class1_proportion(&self.base.sum_right, self.base.cursor.weighted_n_right);
        (left + right) / 2.0
    }

    fn check_monotonicity(&self, sign: i8, lower_bound: f64, upper_bound: f64) -> bool {
        let value_left = self
            .base
            .class1_proportion(&self.base.sum_left, self.base.cursor.weighted_n_left);
        let value_right = self
            .base
            .class1_proportion(&self.base.sum_right, self.base.cursor.weighted_n_right);
        if !(lower_bound..=upper_bound).contains(&value_left) || !(lower_bound..=upper_bound).contains(&value_right) {
            return false;
        }
        if sign == 0 {
            return true;
        }
        (value_left - value_right) * sign as f64 <= 0.0
    }

    fn set_missing_go_to_left(&mut self, missing_go_to_left: bool) {
        self.base.cursor.missing_go_to_left = missing_go_to_left;
    }

    fn weighted_n_node_samples(&self) -> f64 {
        self.base.cursor.weighted_n_node_samples
    }

    fn weighted_n_left(&self) -> f64 {
        self.base.cursor.weighted_n_left
    }

    fn weighted_n_right(&self) -> f64 {
        self.base.cursor.weighted_n_right
    }

    fn weighted_n_samples(&self) -> f64 {
        self.base.cursor.weighted_n_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Gini;

    #[test]
    fn rejects_zero_outputs() {
        let err = Gini::new(0, vec![2]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn rejects_class_count_length_mismatch() {
        let err = Gini::new(2, vec![2]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn rejects_zero_classes_for_an_output() {
        let err = Gini::new(1, vec![0]).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }
}
