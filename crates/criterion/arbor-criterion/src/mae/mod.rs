//! MAE (mean absolute error) criterion: maintains a weighted streaming
//! median per output per side instead of running sums (spec §4.7), since
//! the median has no incremental additive update the way a mean does.

mod weighted_median;

pub use weighted_median::WeightedMedianCalculator;

use ndarray::{ArrayView1, ArrayView2};

use crate::cursor::{sweep_update, NodeCursor};
use crate::error::{Error, Result};
use crate::Criterion;

/// Mean absolute error criterion (spec §4.7): node value is the per-output
/// weighted median, not the mean, so the running sufficient statistic is a
/// pair of streaming [`WeightedMedianCalculator`]s per output rather than a
/// scalar sum. Does not support missing values (spec §4.7, §7).
pub struct Mae<'a> {
    y: ArrayView2<'a, f64>,
    sample_weight: Option<ArrayView1<'a, f64>>,
    sample_indices: ArrayView1<'a, usize>,
    cursor: NodeCursor,
    n_outputs: usize,
    left: Vec<WeightedMedianCalculator>,
    right: Vec<WeightedMedianCalculator>,
    node_medians: Vec<f64>,
}

impl<'a> Mae<'a> {
    pub fn new(n_outputs: usize, n_samples: usize) -> Result<Self> {
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
            left: (0..n_outputs).map(|_| WeightedMedianCalculator::new()).collect(),
            right: (0..n_outputs).map(|_| WeightedMedianCalculator::new()).collect(),
            node_medians: vec![0.0; n_outputs],
        })
    }

    fn weight_of(&self, idx: usize) -> f64 {
        self.sample_weight.map_or(1.0, |sw| sw[idx])
    }

    fn side_impurity(&self, lo: usize, hi: usize, medians: &[f64], weighted_n: f64) -> f64 {
        if weighted_n <= 0.0 {
            return 0.0;
        }
        let mut total = 0.0;
        for i in lo..hi {
            let idx = self.sample_indices[i];
            let w = self.weight_of(idx);
            for k in 0..self.n_outputs {
                total += w * (self.y[[idx, k]] - medians[k]).abs();
            }
        }
        total / (weighted_n * self.n_outputs as f64)
    }
}

impl<'a> Criterion<'a> for Mae<'a> {
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

        let mut weighted_n_node_samples = 0.0;
        for calc in self.left.iter_mut().chain(self.right.iter_mut()) {
            calc.reset();
        }
        for i in start..end {
            let idx = sample_indices[i];
            let w = sample_weight.map_or(1.0, |sw| sw[idx]);
            weighted_n_node_samples += w;
            for k in 0..self.n_outputs {
                self.right[k].push(y[[idx, k]], w);
            }
        }
        for k in 0..self.n_outputs {
            self.node_medians[k] = self.right[k].get_median();
        }

        self.cursor
            .bind(weighted_n_samples, weighted_n_node_samples, start, end);
        self.reset();
        Ok(())
    }

    fn init_missing(&mut self, n_missing: usize) -> Result<()> {
        if n_missing > 0 {
            return Err(Error::UnsupportedMissing(
                "MAE does not support missing values".into(),
            ));
        }
        self.cursor.n_missing = 0;
        self.cursor.weighted_n_missing = 0.0;
        Ok(())
    }

    fn reset(&mut self) {
        self.cursor.reset_weights();
        for k in 0..self.n_outputs {
            let mut value = 0.0;
            let mut weight = 0.0;
            while self.left[k].pop(&mut value, &mut weight) {
                self.right[k].push(value, weight);
            }
        }
    }

    fn reverse_reset(&mut self) {
        self.cursor.reverse_reset_weights();
        for k in 0..self.n_outputs {
            let mut value = 0.0;
            let mut weight = 0.0;
            while self.right[k].pop(&mut value, &mut weight) {
                self.left[k].push(value, weight);
            }
        }
    }

    fn update(&mut self, new_pos: usize) {
        let n_outputs = self.n_outputs;
        let y = self.y;
        let sample_weight = self.sample_weight;
        let sample_indices = self.sample_indices;
        let left = &mut self.left;
        let right = &mut self.right;

        sweep_update(
            &mut self.cursor,
            sample_indices,
            sample_weight,
            new_pos,
            |cursor| {
                cursor.reverse_reset_weights();
                for k in 0..n_outputs {
                    let mut value = 0.0;
                    let mut weight = 0.0;
                    while right[k].pop(&mut value, &mut weight) {
                        left[k].push(value, weight);
                    }
                }
            },
            |idx, w, adding| {
                for k in 0..n_outputs {
                    let v = y[[idx, k]];
                    if adding {
                        right[k].remove(v, w);
                        left[k].push(v, w);
                    } else {
                        left[k].remove(v, w);
                        right[k].push(v, w);
                    }
                }
            },
        );
    }

    fn node_impurity(&self) -> f64 {
        self.side_impurity(
            self.cursor.start,
            self.cursor.end,
            &self.node_medians,
            self.cursor.weighted_n_node_samples,
        )
    }

    fn children_impurity(&self, impurity_left: &mut f64, impurity_right: &mut f64) {
        let left_medians: Vec<f64> = self.left.iter().map(|c| c.get_median()).collect();
        let right_medians: Vec<f64> = self.right.iter().map(|c| c.get_median()).collect();
        *impurity_left = self.side_impurity(
            self.cursor.start,
            self.cursor.pos,
            &left_medians,
            self.cursor.weighted_n_left,
        );
        *impurity_right = self.side_impurity(
            self.cursor.pos,
            self.cursor.end,
            &right_medians,
            self.cursor.weighted_n_right,
        );
    }

    fn node_value(&self, dest: &mut [f64]) {
        dest[..self.n_outputs].copy_from_slice(&self.node_medians);
    }

    fn middle_value(&self) -> f64 {
        (self.left[0].get_median() + self.right[0].get_median()) / 2.0
    }

    fn check_monotonicity(&self, sign: i8, lower_bound: f64, upper_bound: f64) -> bool {
        let value_left = self.left[0].get_median();
        let value_right = self.right[0].get_median();
        if !(lower_bound..=upper_bound).contains(&value_left) || !(lower_bound..=upper_bound).contains(&value_right) {
            return false;
        }
        if sign == 0 {
            return true;
        }
        (value_left - value_right) * sign as f64 <= 0.0
    }

    fn set_missing_go_to_left(&mut self, missing_go_to_left: bool) {
        self.cursor.missing_go_to_left = missing_go_to_left;
    }

    fn weighted_n_node_samples(&self) -> f64 {
        self.cursor.weighted_n_node_samples
    }

    fn weighted_n_left(&self) -> f64 {
        self.cursor.weighted_n_left
    }

    fn weighted_n_right(&self) -> f64 {
        self.cursor.weighted_n_right
    }

    fn weighted_n_samples(&self) -> f64 {
        self.cursor.weighted_n_samples
    }
}
