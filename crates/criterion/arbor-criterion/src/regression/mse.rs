use ndarray::{ArrayView1, ArrayView2};

use super::{mse_children_impurity, mse_node_impurity, mse_proxy, RegressionBase};
use crate::error::Result;
use crate::Criterion;

/// Mean squared error criterion: `(sq_sum_total / W - Σ_k mean_k²) /
/// n_outputs` (spec §4.3).
pub struct Mse<'a> {
    base: RegressionBase<'a>,
}

impl<'a> Mse<'a> {
    pub fn new(n_outputs: usize, n_samples: usize) -> Result<Self> {
        Ok(Self {
            base: RegressionBase::new(n_outputs, n_samples)?,
        })
    }
}

impl<'a> Criterion<'a> for Mse<'a> {
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
        mse_proxy(&self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2};

    /// Scenario B (spec §8): MSE, 1 output.
    #[test]
    fn scenario_b_mse_one_output() {
        let y = arr2(&[[1.0], [2.0], [10.0], [11.0]]);
        let indices = arr1(&[0usize, 1, 2, 3]);
        let mut mse = Mse::new(1, 4).unwrap();
        mse.init(y.view(), None, 4.0, indices.view(), 0, 4).unwrap();

        assert_relative_eq!(mse.node_impurity(), 20.5, epsilon = 1e-12);

        mse.update(2);
        let mut left = 0.0;
        let mut right = 0.0;
        mse.children_impurity(&mut left, &mut right);
        assert_relative_eq!(left, 0.25, epsilon = 1e-12);
        assert_relative_eq!(right, 0.25, epsilon = 1e-12);
    }

    #[test]
    fn node_value_is_weighted_mean() {
        let y = arr2(&[[2.0], [4.0], [6.0]]);
        let w = arr1(&[1.0, 1.0, 2.0]);
        let indices = arr1(&[0usize, 1, 2]);
        let mut mse = Mse::new(1, 3).unwrap();
        mse.init(y.view(), Some(w.view()), 4.0, indices.view(), 0, 3).unwrap();

        let mut dest = [0.0];
        mse.node_value(&mut dest);
        assert_relative_eq!(dest[0], (2.0 + 4.0 + 12.0) / 4.0, epsilon = 1e-12);
    }
}
