use super::{ClassificationCriterion, ImpurityKind};

/// Gini impurity: `1 - Σ_c p_c²`, averaged over outputs (spec §4.2).
#[derive(Debug)]
pub struct GiniKind;

impl ImpurityKind for GiniKind {
    fn impurity_from_counts(counts: &[f64], weighted_n: f64) -> f64 {
        let sum_sq: f64 = counts.iter().map(|&c| (c / weighted_n).powi(2)).sum();
        1.0 - sum_sq
    }
}

/// Gini-impurity classification criterion: maintains per-output, per-class
/// weighted count histograms and splits on `1 - Σ_c p_c²`.
pub type Gini<'a> = ClassificationCriterion<'a, GiniKind>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2, ArrayView1};

    use crate::Criterion;

    /// Scenario A (spec §8): binary Gini, 1 output.
    #[test]
    fn scenario_a_binary_gini_one_output() {
        let y = arr2(&[[0.0], [0.0], [1.0], [1.0]]);
        let indices = arr1(&[0usize, 1, 2, 3]);
        let mut gini = Gini::new(1, vec![2]).unwrap();
        gini.init(y.view(), None, 4.0, indices.view(), 0, 4).unwrap();

        assert_relative_eq!(gini.node_impurity(), 0.5, epsilon = 1e-12);

        gini.update(2);
        let mut left = 0.0;
        let mut right = 0.0;
        gini.children_impurity(&mut left, &mut right);
        assert_relative_eq!(left, 0.0, epsilon = 1e-12);
        assert_relative_eq!(right, 0.0, epsilon = 1e-12);
        assert_relative_eq!(gini.impurity_improvement(0.5, left, right), 0.5, epsilon = 1e-12);
    }

    /// Scenario G (spec §8): missing-value side policy.
    #[test]
    fn scenario_g_missing_policy() {
        let y = arr2(&[[0.0], [0.0], [1.0], [1.0]]);
        let indices = arr1(&[0usize, 1, 2, 3]);

        let mut gini = Gini::new(1, vec![2]).unwrap();
        gini.init(y.view(), None, 4.0, indices.view(), 0, 4).unwrap();
        gini.init_missing(1).unwrap();

        gini.set_missing_go_to_left(true);
        gini.reset();
        assert_relative_eq!(gini.weighted_n_left(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(gini.weighted_n_right(), 3.0, epsilon = 1e-12);

        gini.set_missing_go_to_left(false);
        gini.reset();
        assert_relative_eq!(gini.weighted_n_left(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(gini.weighted_n_right(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn conservation_after_update() {
        let y = arr2(&[[0.0], [1.0], [0.0], [1.0], [1.0]]);
        let w = arr1(&[1.0, 2.0, 0.5, 1.5, 1.0]);
        let indices = arr1(&[0usize, 1, 2, 3, 4]);
        let total_weight: f64 = w.iter().sum();

        let mut gini = Gini::new(1, vec![2]).unwrap();
        gini.init(y.view(), Some(w.view()), total_weight, indices.view(), 0, 5)
            .unwrap();
        gini.update(3);

        assert_relative_eq!(gini.weighted_n_left() + gini.weighted_n_right(), gini.weighted_n_node_samples(), epsilon = 1e-12);
    }

    #[test]
    fn direction_equivalence_forward_vs_single_shot() {
        let y = arr2(&[[0.0], [1.0], [1.0], [0.0], [1.0], [0.0]]);
        let indices = arr1(&[0usize, 1, 2, 3, 4, 5]);
        let weight_view: Option<ArrayView1<f64>> = None;

        let mut stepwise = Gini::new(1, vec![2]).unwrap();
        stepwise.init(y.view(), weight_view, 6.0, indices.view(), 0, 6).unwrap();
        stepwise.update(1);
        stepwise.update(2);
        stepwise.update(3);
        stepwise.update(4);

        let mut jump = Gini::new(1, vec![2]).unwrap();
        jump.init(y.view(), weight_view, 6.0, indices.view(), 0, 6).unwrap();
        jump.update(4);

        assert_relative_eq!(stepwise.weighted_n_left(), jump.weighted_n_left(), epsilon = 1e-12);
        assert_relative_eq!(stepwise.node_impurity(), jump.node_impurity(), epsilon = 1e-12);

        let (mut sl, mut sr) = (0.0, 0.0);
        stepwise.children_impurity(&mut sl, &mut sr);
        let (mut jl, mut jr) = (0.0, 0.0);
        jump.children_impurity(&mut jl, &mut jr);
        assert_relative_eq!(sl, jl, epsilon = 1e-12);
        assert_relative_eq!(sr, jr, epsilon = 1e-12);
    }
}
