use ndarray::{ArrayView1, ArrayView2};

use super::{mse_children_impurity, mse_node_impurity, RegressionBase};
use crate::error::Result;
use crate::Criterion;

/// MSE with Friedman's improvement-in-variance formula (spec §4.4). State
/// and update are identical to [`Mse`](super::Mse); only the proxy and the
/// reported improvement differ — both compute
/// `d = weighted_n_right * Σsum_left - weighted_n_left * Σsum_right` and
/// ignore the `parent`/`left`/`right` impurity arguments entirely.
pub struct FriedmanMse<'a> {
    base: RegressionBase<'a>,
}

impl<'a> FriedmanMse<'a> {
    pub fn new(n_outputs: usize, n_samples: usize) -> Result<Self> {
        Ok(Self {
            base: RegressionBase::new(n_outputs, n_samples)?,
        })
    }

    fn diff(&self) -> f64 {
        let total_left: f64 = self.base.sum_left().iter().sum();
        let total_right: f64 = self.base.sum_right().iter().sum();
        self.weighted_n_right() * total_left - self.weighted_n_left() * total_right
    }
}

impl<'a> Criterion<'a> for FriedmanMse<'a> {
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
        mse_node_impurity(&self.base)
    }

    fn children_impurity(&self, impurity_left: &mut f64, impurity_right: &mut f64) {
        mse_children_impurity(&self.base, impurity_left, impurity_right);
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

    fn proxy_impurity_improvement(&self) -> f64 {
        let d = self.diff();
        d * d / (self.weighted_n_left() * self.weighted_n_right())
    }

    fn impurity_improvement(&self, _parent_impurity: f64, _impurity_left: f64, _impurity_right: f64) -> f64 {
        let d_prime = self.diff() / self.base.n_outputs() as f64;
        (d_prime * d_prime) / (self.weighted_n_left() * self.weighted_n_right() * self.weighted_n_node_samples())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2};

    /// Scenario C (spec §8): FriedmanMSE proxy, same inputs as scenario B.
    #[test]
    fn scenario_c_friedman_proxy() {
        let y = arr2(&[[1.0], [2.0], [10.0], [11.0]]);
        let indices = arr1(&[0usize, 1, 2, 3]);
        let mut fmse = FriedmanMse::new(1, 4).unwrap();
        fmse.init(y.view(), None, 4.0, indices.view(), 0, 4).unwrap();
        fmse.update(2);

        assert_relative_eq!(fmse.proxy_impurity_improvement(), 324.0, epsilon = 1e-9);
    }
}
