//! The abstract `Criterion` contract (spec §4.1) implemented by every
//! concrete impurity criterion in this crate.

use ndarray::{ArrayView1, ArrayView2};

use crate::error::Result;

/// An impurity criterion together with the incremental statistics that make
/// it cheap to re-evaluate as a split boundary moves one sample at a time.
///
/// A single instance is bound to one node's sample slice via [`init`], then
/// swept across candidate split positions with [`reset`]/[`update`]; it is
/// rebound to the next node by calling [`init`] again. It borrows `y`,
/// `sample_weight` and `sample_indices` for the lifetime `'a` of the
/// training matrices (which outlive every node visit), never mutates them,
/// and retains no state beyond construction parameters between `init` calls.
///
/// [`init`]: Criterion::init
/// [`reset`]: Criterion::reset
/// [`update`]: Criterion::update
pub trait Criterion<'a> {
    /// Binds this instance to the sample range `[start, end)` of the given
    /// node, recomputing `sum_total` (and, for regression, `sq_sum_total`)
    /// and calling [`reset`](Criterion::reset). `sample_weight` absent is
    /// equivalent to all-ones.
    fn init(
        &mut self,
        y: ArrayView2<'a, f64>,
        sample_weight: Option<ArrayView1<'a, f64>>,
        weighted_n_samples: f64,
        sample_indices: ArrayView1<'a, usize>,
        start: usize,
        end: usize,
    ) -> Result<()>;

    /// Declares that the last `n_missing` samples of the bound range are
    /// missing for the feature currently being scanned, populating
    /// `sum_missing`/`weighted_n_missing` from them. `n_missing == 0` resets
    /// that state to empty. MAE returns `Err` for any `n_missing > 0`.
    fn init_missing(&mut self, n_missing: usize) -> Result<()>;

    /// `pos = start`; left/right split according to `missing_go_to_left`.
    fn reset(&mut self);

    /// `pos = end`; left/right split symmetric to [`reset`](Criterion::reset).
    fn reverse_reset(&mut self);

    /// Moves `pos` to `new_pos` (`pos <= new_pos <= end - n_missing`),
    /// choosing whichever direction touches fewer samples.
    fn update(&mut self, new_pos: usize);

    /// Impurity of the whole bound range `[start, end)`.
    fn node_impurity(&self) -> f64;

    /// Impurities of `[start, pos)` and `[pos, end)`.
    fn children_impurity(&self, impurity_left: &mut f64, impurity_right: &mut f64);

    /// Writes the leaf prediction for the bound range into `dest`.
    fn node_value(&self, dest: &mut [f64]);

    /// Clamps `dest[0]` into `[lower_bound, upper_bound]`. Single-output
    /// binary classification also re-projects `dest[1] = 1 - dest[0]`;
    /// every other family only touches `dest[0]`.
    fn clip_node_value(&self, dest: &mut [f64], lower_bound: f64, upper_bound: f64) {
        dest[0] = dest[0].clamp(lower_bound, upper_bound);
    }

    /// Average of the left- and right-child predictions for output 0, used
    /// by monotonicity checks.
    fn middle_value(&self) -> f64;

    /// `true` iff both child values for output 0 lie in `[lower_bound,
    /// upper_bound]` and, when `sign != 0`, `(value_left - value_right) *
    /// sign <= 0`. `sign == 0` disables the ordering check.
    fn check_monotonicity(&self, sign: i8, lower_bound: f64, upper_bound: f64) -> bool;

    /// Sets the policy bit the splitter chose for missing values on the
    /// feature about to be scanned. Write-only between `init` and `reset`.
    fn set_missing_go_to_left(&mut self, missing_go_to_left: bool);

    fn weighted_n_node_samples(&self) -> f64;
    fn weighted_n_left(&self) -> f64;
    fn weighted_n_right(&self) -> f64;
    fn weighted_n_samples(&self) -> f64;

    /// Cheap, monotone-in-the-true-improvement score for ranking candidate
    /// splits. The default recomputes both children's impurities; concrete
    /// criteria with a closed form (MSE, FriedmanMSE, Poisson) override this
    /// to avoid the extra work.
    fn proxy_impurity_improvement(&self) -> f64 {
        let mut impurity_left = 0.0;
        let mut impurity_right = 0.0;
        self.children_impurity(&mut impurity_left, &mut impurity_right);
        -self.weighted_n_right() * impurity_right - self.weighted_n_left() * impurity_left
    }

    /// The exact, reported impurity improvement from splitting a node whose
    /// impurity was `parent_impurity` into children with impurities
    /// `impurity_left`/`impurity_right`.
    fn impurity_improvement(&self, parent_impurity: f64, impurity_left: f64, impurity_right: f64) -> f64 {
        let weighted_n_node_samples = self.weighted_n_node_samples();
        (weighted_n_node_samples / self.weighted_n_samples())
            * (parent_impurity
                - (self.weighted_n_right() / weighted_n_node_samples) * impurity_right
                - (self.weighted_n_left() / weighted_n_node_samples) * impurity_left)
    }
}
