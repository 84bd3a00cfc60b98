use arbor_num::xlogy;

use super::{ClassificationCriterion, ImpurityKind};

/// Shannon entropy: `-Σ_c p_c ln p_c`, averaged over outputs (spec §4.2).
/// Natural log throughout; classes with `p_c == 0` contribute `0`.
#[derive(Debug)]
pub struct EntropyKind;

impl ImpurityKind for EntropyKind {
    fn impurity_from_counts(counts: &[f64], weighted_n: f64) -> f64 {
        -counts
            .iter()
            .map(|&c| {
                let p = c / weighted_n;
                xlogy(p, p)
            })
            .sum::<f64>()
    }
}

/// Entropy classification criterion: maintains per-output, per-class
/// weighted count histograms and splits on Shannon entropy.
pub type Entropy<'a> = ClassificationCriterion<'a, EntropyKind>;

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{arr1, arr2};

    use crate::Criterion;

    /// Scenario D (spec §8): entropy, 2 classes.
    #[test]
    fn scenario_d_entropy_two_classes() {
        let y = arr2(&[[0.0], [0.0], [0.0], [1.0]]);
        let indices = arr1(&[0usize, 1, 2, 3]);
        let mut entropy = Entropy::new(1, vec![2]).unwrap();
        entropy.init(y.view(), None, 4.0, indices.view(), 0, 4).unwrap();

        let expected = -(0.75_f64.ln() * 0.75 + 0.25_f64.ln() * 0.25);
        assert_relative_eq!(entropy.node_impurity(), expected, epsilon = 1e-12);
        assert_relative_eq!(entropy.node_impurity(), 0.5623351446188083, epsilon = 1e-9);
    }

    #[test]
    fn pure_node_has_zero_entropy() {
        let y = arr2(&[[1.0], [1.0], [1.0]]);
        let indices = arr1(&[0usize, 1, 2]);
        let mut entropy = Entropy::new(1, vec![2]).unwrap();
        entropy.init(y.view(), None, 3.0, indices.view(), 0, 3).unwrap();
        assert_relative_eq!(entropy.node_impurity(), 0.0, epsilon = 1e-12);
    }
}
