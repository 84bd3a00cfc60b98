//! Regression family: per-output weighted sums of `y` plus a scalar
//! weighted sum of `y²` (spec §4.3), shared by [`Mse`], [`FriedmanMse`],
//! [`Poisson`] and [`Huber`]. MAE does not build on this base — it
//! maintains a weighted streaming median per output instead (see
//! [`crate::mae`]).

mod friedman_mse;
mod huber;
mod mse;
mod poisson;

pub use friedman_mse::FriedmanMse;
pub use huber::{Huber, HuberDelta};
pub use mse::Mse;
pub use poisson::Poisson;

use ndarray::{ArrayView1, ArrayView2};

use crate::cursor::{sweep_update, NodeCursor};
use crate::error::{Error, Result};

/// Sums of `y` (and `y²`) over a node's sample range, incrementally
/// updatable as the split boundary moves. Every regression criterion in
/// this crate except MAE embeds one of these and only differs in how it
/// turns the sums into an impurity.
pub struct RegressionBase<'a> {
    y: ArrayView2<'a, f64>,
    sample_weight: Option<ArrayView1<'a, f64>>,
    sample_indices: ArrayView1<'a, usize>,
    cursor: NodeCursor,
    n_outputs: usize,
    sum_total: Vec<f64>,
    sum_left: Vec<f64>,
    sum_right: Vec<f64>,
    sum_missing: Vec<f64>,
    sq_sum_total: f64,
}

impl<'a> RegressionBase<'a> {
    pub(crate) fn new(n_outputs: usize, n_samples: usize) -> Result<Self> {
        if n_outputs == 0 {
            return Err(Error::InvalidParameter("n_outputs must be at least 1".into()));
        }
        if n_samples == 0 {
            return Err(Error::InvalidParameter("n_samples must be at least 1".into()));
        }
        Ok(Self {
            y: ArrayView2::from_shape((0, n_outputs), &[]).unwrap(),
            sample_weight: None,
            sample_indices: ArrayView1::from_shape(0, &[]).unwrap(),
            cursor: NodeCursor::default(),
            n_outputs,
            sum_total: vec![0.0; n_outputs],
            sum_left: vec![0.0; n_outputs],
            sum_right: vec![0.0; n_outputs],
            sum_missing: vec![0.0; n_outputs],
            sq_sum_total: 0.0,
        })
    }

    pub(crate) fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    pub(crate) fn sum_left(&self) -> &[f64] {
        &self.sum_left
    }

    pub(crate) fn sum_right(&self) -> &[f64] {
        &self.sum_right
    }

    pub(crate) fn sum_total(&self) -> &[f64] {
        &self.sum_total
    }

    pub(crate) fn sq_sum_total(&self) -> f64 {
        self.sq_sum_total
    }

    pub(crate) fn pos(&self) -> usize {
        self.cursor.pos
    }

    pub(crate) fn start(&self) -> usize {
        self.cursor.start
    }

    pub(crate) fn end(&self) -> usize {
        self.cursor.end
    }

    pub(crate) fn y_view(&self) -> ArrayView2<'a, f64> {
        self.y
    }

    pub(crate) fn sample_weight_view(&self) -> Option<ArrayView1<'a, f64>> {
        self.sample_weight
    }

    pub(crate) fn sample_indices_view(&self) -> ArrayView1<'a, usize> {
        self.sample_indices
    }

    pub(crate) fn init(
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
        self.sq_sum_total = 0.0;
        let mut weighted_n_node_samples = 0.0;
        for i in start..end {
            let idx = sample_indices[i];
            let w = sample_weight.map_or(1.0, |sw| sw[idx]);
            weighted_n_node_samples += w;
            for k in 0..self.n_outputs {
                let yk = y[[idx, k]];
                self.sum_total[k] += w * yk;
                self.sq_sum_total += w * yk * yk;
            }
        }

        self.cursor
            .bind(weighted_n_samples, weighted_n_node_samples, start, end);
        self.reset();
        Ok(())
    }

    pub(crate) fn init_missing(&mut self, n_missing: usize) -> Result<()> {
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
                self.sum_missing[k] += w * self.y[[idx, k]];
            }
        }
        Ok(())
    }

    pub(crate) fn reset(&mut self) {
        self.cursor.reset_weights();
        let missing_go_to_left = self.cursor.missing_go_to_left;
        for k in 0..self.n_outputs {
            self.sum_left[k] = if missing_go_to_left { self.sum_missing[k] } else { 0.0 };
            self.sum_right[k] = self.sum_total[k] - self.sum_left[k];
        }
    }

    pub(crate) fn reverse_reset(&mut self) {
        self.cursor.reverse_reset_weights();
        let missing_go_to_left = self.cursor.missing_go_to_left;
        for k in 0..self.n_outputs {
            self.sum_left[k] = if missing_go_to_left {
                self.sum_total[k]
            } else {
                self.sum_total[k] - self.sum_missing[k]
            };
            self.sum_right[k] = self.sum_total[k] - self.sum_left[k];
        }
    }

    pub(crate) fn update(&mut self, new_pos: usize) {
        let n_outputs = self.n_outputs;
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
                for k in 0..n_outputs {
                    sum_left[k] = if cursor.missing_go_to_left {
                        sum_total[k]
                    } else {
                        sum_total[k] - sum_missing[k]
                    };
                    sum_right[k] = sum_total[k] - sum_left[k];
                }
            },
            |idx, w, adding| {
                for k in 0..n_outputs {
                    let contribution = w * y[[idx, k]];
                    if adding {
                        sum_left[k] += contribution;
                        sum_right[k] -= contribution;
                    } else {
                        sum_left[k] -= contribution;
                        sum_right[k] += contribution;
                    }
                }
            },
        );
    }

    /// Weighted sum of `y²` over `[lo, hi)`, summed across all outputs.
    /// Recomputed by a single pass rather than tracked incrementally
    /// (spec §9): this is only invoked once per chosen split, and a
    /// one-shot scan avoids the cancellation error a running `sq_sum_left`
    /// would accumulate over a long sweep.
    fn sq_sum_over(&self, lo: usize, hi: usize) -> f64 {
        let mut total = 0.0;
        for i in lo..hi {
            let idx = self.sample_indices[i];
            let w = self.sample_weight.map_or(1.0, |sw| sw[idx]);
            for k in 0..self.n_outputs {
                let yk = self.y[[idx, k]];
                total += w * yk * yk;
            }
        }
        total
    }

    pub(crate) fn node_value(&self, dest: &mut [f64]) {
        let weighted_n = self.cursor.weighted_n_node_samples;
        for k in 0..self.n_outputs {
            dest[k] = if weighted_n > 0.0 { self.sum_total[k] / weighted_n } else { 0.0 };
        }
    }

    pub(crate) fn middle_value(&self) -> f64 {
        let left = mean_of(self.sum_left[0], self.cursor.weighted_n_left);
        let right = mean_of(self.sum_right[0], self.cursor.weighted_n_right);
        (left + right) / 2.0
    }

    pub(crate) fn check_monotonicity(&self, sign: i8, lower_bound: f64, upper_bound: f64) -> bool {
        let value_left = mean_of(self.sum_left[0], self.cursor.weighted_n_left);
        let value_right = mean_of(self.sum_right[0], self.cursor.weighted_n_right);
        if !(lower_bound..=upper_bound).contains(&value_left) || !(lower_bound..=upper_bound).contains(&value_right) {
            return false;
        }
        if sign == 0 {
            return true;
        }
        (value_left - value_right) * sign as f64 <= 0.0
    }

    pub(crate) fn weighted_n_node_samples(&self) -> f64 {
        self.cursor.weighted_n_node_samples
    }

    pub(crate) fn weighted_n_left(&self) -> f64 {
        self.cursor.weighted_n_left
    }

    pub(crate) fn weighted_n_right(&self) -> f64 {
        self.cursor.weighted_n_right
    }

    pub(crate) fn weighted_n_samples(&self) -> f64 {
        self.cursor.weighted_n_samples
    }

    pub(crate) fn set_missing_go_to_left(&mut self, missing_go_to_left: bool) {
        self.cursor.missing_go_to_left = missing_go_to_left;
    }
}

fn mean_of(sum: f64, weight: f64) -> f64 {
    if weight > 0.0 {
        sum / weight
    } else {
        0.0
    }
}

/// `node_impurity`/`children_impurity` shared by [`Mse`] and [`FriedmanMse`]
/// (spec §4.3–§4.4: "identical state and update to MSE").
pub(crate) fn mse_node_impurity(base: &RegressionBase) -> f64 {
    let weighted_n = base.cursor.weighted_n_node_samples;
    if weighted_n <= 0.0 {
        return 0.0;
    }
    let mean_sq_sum: f64 = base
        .sum_total
        .iter()
        .map(|&s| (s / weighted_n).powi(2))
        .sum();
    (base.sq_sum_total / weighted_n - mean_sq_sum) / base.n_outputs as f64
}

pub(crate) fn mse_children_impurity(base: &RegressionBase, impurity_left: &mut f64, impurity_right: &mut f64) {
    let sq_sum_left = base.sq_sum_over(base.cursor.start, base.cursor.pos);
    let sq_sum_right = base.sq_sum_total - sq_sum_left;

    *impurity_left = side_mse(sq_sum_left, &base.sum_left, base.cursor.weighted_n_left, base.n_outputs);
    *impurity_right = side_mse(sq_sum_right, &base.sum_right, base.cursor.weighted_n_right, base.n_outputs);
}

fn side_mse(sq_sum: f64, sums: &[f64], weighted_n: f64, n_outputs: usize) -> f64 {
    if weighted_n <= 0.0 {
        return 0.0;
    }
    let mean_sq_sum: f64 = sums.iter().map(|&s| (s / weighted_n).powi(2)).sum();
    (sq_sum / weighted_n - mean_sq_sum) / n_outputs as f64
}

/// Proxy shared by [`Mse`]: `Σ_k sum_left[k]² / weighted_n_left + Σ_k
/// sum_right[k]² / weighted_n_right` (spec §4.3 — the constant
/// `sq_sum_total`/`n_outputs` terms are dropped since they don't affect
/// which candidate split ranks highest).
pub(crate) fn mse_proxy(base: &RegressionBase) -> f64 {
    let left: f64 = base.sum_left.iter().map(|&s| s * s).sum::<f64>() / base.cursor.weighted_n_left;
    let right: f64 = base.sum_right.iter().map(|&s| s * s).sum::<f64>() / base.cursor.weighted_n_right;
    left + right
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::{FriedmanMse, Mse, Poisson};

    #[test]
    fn mse_rejects_zero_outputs() {
        let err = Mse::new(0, 4).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn mse_rejects_zero_samples() {
        let err = Mse::new(1, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn friedman_mse_rejects_zero_outputs() {
        let err = FriedmanMse::new(0, 4).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn poisson_rejects_zero_samples() {
        let err = Poisson::new(1, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }
}
