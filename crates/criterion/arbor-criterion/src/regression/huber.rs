use ndarray::{ArrayView1, ArrayView2};

use super::RegressionBase;
use crate::error::{Error, Result};
use crate::Criterion;

const DEFAULT_DELTA: f64 = 1.0;

/// Huber's `delta` threshold, the single construction-time parameter beyond
/// `n_outputs`/`n_samples` this family needs (spec §6). A newtype over `f64`
/// so it can carry `serde` support (behind `serde-support`) without that
/// attaching to the transient per-node sums it has nothing to do with.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-support", derive(serde::Serialize, serde::Deserialize))]
pub struct HuberDelta(pub f64);

impl Default for HuberDelta {
    fn default() -> Self {
        Self(DEFAULT_DELTA)
    }
}

impl From<f64> for HuberDelta {
    fn from(delta: f64) -> Self {
        Self(delta)
    }
}

/// Huber loss, summed over outputs and samples in `[lo, hi)`: per output
/// `k`, let `mu_k` be the weighted mean of `y[:, k]` over the range and
/// `e = y[i, k] - mu_k`; contribute `0.5 e²` if `|e| <= delta` else
/// `delta (|e| - 0.5 delta)`. The total is divided by `weighted_n *
/// n_outputs` (spec §4.6). Requires a second pass over the range since the
/// per-output mean must be known before any residual can be formed.
fn huber_loss(
    y: &ArrayView2<f64>,
    sample_weight: Option<ArrayView1<f64>>,
    sample_indices: &ArrayView1<usize>,
    lo: usize,
    hi: usize,
    n_outputs: usize,
    delta: f64,
) -> f64 {
    let mut weighted_n = 0.0;
    let mut sums = vec![0.0; n_outputs];
    for i in lo..hi {
        let idx = sample_indices[i];
        let w = sample_weight.map_or(1.0, |sw| sw[idx]);
        weighted_n += w;
        for k in 0..n_outputs {
            sums[k] += w * y[[idx, k]];
        }
    }
    if weighted_n <= 0.0 {
        return 0.0;
    }
    let means: Vec<f64> = sums.iter().map(|&s| s / weighted_n).collect();

    let mut total = 0.0;
    for i in lo..hi {
        let idx = sample_indices[i];
        let w = sample_weight.map_or(1.0, |sw| sw[idx]);
        for k in 0..n_outputs {
            let e = y[[idx, k]] - means[k];
            let abs_e = e.abs();
            total += w
                * if abs_e <= delta {
                    0.5 * e * e
                } else {
                    delta * (abs_e - 0.5 * delta)
                };
        }
    }
    total / (weighted_n * n_outputs as f64)
}

/// Huber-loss criterion (spec §4.6): behaves like MSE for residuals within
/// `delta` and like MAE beyond it.
pub struct Huber<'a> {
    base: RegressionBase<'a>,
    delta: f64,
}

impl<'a> Huber<'a> {
    pub fn new(n_outputs: usize, n_samples: usize) -> Result<Self> {
        Self::with_delta(n_outputs, n_samples, DEFAULT_DELTA)
    }

    pub fn with_delta(n_outputs: usize, n_samples: usize, delta: impl Into<HuberDelta>) -> Result<Self> {
        let HuberDelta(delta) = delta.into();
        if !(delta.is_finite() && delta > 0.0) {
            return Err(Error::InvalidParameter(format!(
                "huber delta must be finite and positive, got {delta}"
            )));
        }
        Ok(Self {
            base: RegressionBase::new(n_outputs, n_samples)?,
            delta,
        })
    }

    fn loss_over(&self, y: ArrayView2<f64>, sample_weight: Option<ArrayView1<f64>>, sample_indices: ArrayView1<usize>, lo: usize, hi: usize) -> f64 {
        huber_loss(&y, sample_weight, &sample_indices, lo, hi, self.base.n_outputs(), self.delta)
    }
}

impl<'a> Criterion<'a> for Huber<'a> {
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
        self.loss_over(self.y_view(), self.sample_weight_view(), self.sample_indices_view(), self.base.start(), self.base.end())
    }

    fn children_impurity(&self, impurity_left: &mut f64, impurity_right: &mut f64) {
        let y = self.y_view();
        let sw = self.sample_weight_view();
        let indices = self.sample_indices_view();
        *impurity_left = self.loss_over(y, sw, indices, self.base.start(), self.base.pos());
        *impurity_right = self.loss_over(y, sw, indices, self.base.pos(), self.base.end());
    }

    fn node_value(&self, dest: &mut [f64]) {
        self.base.node_value(dest);
    }

    fn middle_value(&self) -> f64 {
        self.base.middle_value()
    }

    fn check_monotonicity(&self, sign: i8, lower_bound: f64, upper_bound: f64) -> bool {
        self.base.check_monotonicity(sign, lower_bound, upper_bound)
    }

    fn set_missing_go_to_left(&mut self, missing_go_to_left: bool) {
        self.base.set_missing_go_to_left(missing_go_to_left);
    }

    fn weighted_n_node_samples(&self) -> f64 {
        self.base.weighted_n_node_samples()
    }

    fn weighted_n_left(&self) -> f64 {
        self.base.weighted_n_left()
    }

    fn weighted_n_right(&self) -> f64 {
        self.base.weighted_n_right()
    }

    fn weighted_n_samples(&self) -> f64 {
        self.base.weighted_n_samples()
    }
}

impl<'a> Huber<'a> {
    fn y_view(&self) -> ArrayView2<'a, f64> {
        self.base.y_view()
    }

    fn sample_weight_view(&self) -> Option<ArrayView1<'a, f64>> {
        self.base.sample_weight_view()
    }

    fn sample_indices_view(&self) -> ArrayView1<'a, usize> {
        self.base.sample_indices_view()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2};

    #[test]
    fn rejects_non_positive_delta() {
        assert!(Huber::with_delta(1, 4, 0.0).is_err());
        assert!(Huber::with_delta(1, 4, -1.0).is_err());
        assert!(Huber::with_delta(1, 4, f64::NAN).is_err());
    }

    #[test]
    fn rejects_zero_outputs() {
        let err = Huber::new(0, 4).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn rejects_zero_samples() {
        let err = Huber::new(1, 0).unwrap_err();
        assert!(matches!(err, Error::InvalidParameter(_)));
    }

    #[test]
    fn reduces_to_mse_within_delta() {
        let y = arr2(&[[0.0], [0.1], [-0.1], [0.05]]);
        let indices = arr1(&[0usize, 1, 2, 3]);
        let mut huber = Huber::with_delta(1, 4, 10.0).unwrap();
        huber.init(y.view(), None, 4.0, indices.view(), 0, 4).unwrap();

        let mean: f64 = y.iter().sum::<f64>() / 4.0;
        let expected: f64 = y.iter().map(|&v| 0.5 * (v - mean).powi(2)).sum::<f64>() / 4.0;
        assert_relative_eq!(huber.node_impurity(), expected, epsilon = 1e-12);
    }

    #[test]
    fn large_residuals_are_linear_not_quadratic() {
        let y = arr2(&[[0.0], [0.0], [0.0], [100.0]]);
        let indices = arr1(&[0usize, 1, 2, 3]);
        let mut huber = Huber::with_delta(1, 4, 1.0).unwrap();
        huber.init(y.view(), None, 4.0, indices.view(), 0, 4).unwrap();
        assert!(huber.node_impurity().is_finite());
        assert!(huber.node_impurity() < 100.0);
    }
}
