//! Shared split-boundary bookkeeping used by every concrete criterion.
//!
//! Every concrete criterion embeds a [`NodeCursor`] and drives it through
//! [`sweep_update`] so the "advance from whichever side is cheaper" rule
//! (spec: `update`) is implemented exactly once instead of once per family.

use ndarray::ArrayView1;

/// Which side of `pos` a call to [`sweep_update`] walked from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Walked forward from the old `pos`, adding samples to the left child.
    Forward,
    /// Walked backward from `end - n_missing`, after a [`NodeCursor::reverse_reset`]
    /// rebuilt the left child as "everything", removing samples from it.
    Backward,
}

/// Integer cursors and weighted counters for one node visit.
///
/// `pos` splits the node's sample range into left `[start, pos)` and right
/// `[pos, end)` children; missing-valued samples occupy the trailing
/// `[end - n_missing, end)` segment and are assigned wholesale to one side
/// per `missing_go_to_left`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeCursor {
    pub start: usize,
    pub end: usize,
    pub pos: usize,
    pub n_missing: usize,
    pub missing_go_to_left: bool,
    pub weighted_n_samples: f64,
    pub weighted_n_node_samples: f64,
    pub weighted_n_left: f64,
    pub weighted_n_right: f64,
    pub weighted_n_missing: f64,
}

impl NodeCursor {
    /// Binds a fresh node visit: `[start, end)`, no missing values yet.
    pub fn bind(&mut self, weighted_n_samples: f64, weighted_n_node_samples: f64, start: usize, end: usize) {
        self.start = start;
        self.end = end;
        self.pos = start;
        self.n_missing = 0;
        self.weighted_n_samples = weighted_n_samples;
        self.weighted_n_node_samples = weighted_n_node_samples;
        self.weighted_n_left = 0.0;
        self.weighted_n_right = weighted_n_node_samples;
        self.weighted_n_missing = 0.0;
    }

    /// The index one past the last non-missing sample, i.e. `end - n_missing`.
    #[inline]
    pub fn effective_end(&self) -> usize {
        self.end - self.n_missing
    }

    /// `pos = start`; left/right weights reflect the missing-side policy.
    pub fn reset_weights(&mut self) {
        self.pos = self.start;
        if self.missing_go_to_left {
            self.weighted_n_left = self.weighted_n_missing;
            self.weighted_n_right = self.weighted_n_node_samples - self.weighted_n_missing;
        } else {
            self.weighted_n_left = 0.0;
            self.weighted_n_right = self.weighted_n_node_samples;
        }
    }

    /// `pos = end`; left/right weights reflect the missing-side policy,
    /// symmetric to [`Self::reset_weights`].
    pub fn reverse_reset_weights(&mut self) {
        self.pos = self.end;
        if self.missing_go_to_left {
            self.weighted_n_right = 0.0;
            self.weighted_n_left = self.weighted_n_node_samples;
        } else {
            self.weighted_n_right = self.weighted_n_missing;
            self.weighted_n_left = self.weighted_n_node_samples - self.weighted_n_missing;
        }
    }

    /// Which direction is cheaper for a move to `new_pos`.
    fn plan(&self, new_pos: usize) -> Direction {
        let effective_end = self.effective_end();
        if new_pos - self.pos <= effective_end - new_pos {
            Direction::Forward
        } else {
            Direction::Backward
        }
    }
}

/// Drives `cursor` from its current `pos` to `new_pos`, choosing whichever
/// direction touches fewer samples, and calls back into the concrete
/// criterion to accumulate each visited sample's contribution.
///
/// `on_reverse_reset` is invoked exactly when the backward direction is
/// chosen, before any sample is visited, so the caller can rebuild its own
/// `sum_left`/`sum_right` state to "everything on the left" before samples
/// start being removed from it. `on_sample` receives the training-set row
/// index, that sample's weight, and `true` when the sample is being added
/// to the left child (forward sweep) or `false` when it is being removed
/// from it (backward sweep) — a single callback rather than one-per-
/// direction so it can hold one `&mut` borrow of the criterion's sum
/// buffers instead of two simultaneous ones. `on_sample` must not touch
/// `cursor.weighted_n_left`/`weighted_n_right` — this function owns that
/// bookkeeping so every criterion gets it for free.
#[allow(clippy::too_many_arguments)]
pub fn sweep_update(
    cursor: &mut NodeCursor,
    sample_indices: ArrayView1<usize>,
    sample_weight: Option<ArrayView1<f64>>,
    new_pos: usize,
    mut on_reverse_reset: impl FnMut(&mut NodeCursor),
    mut on_sample: impl FnMut(usize, f64, bool),
) {
    debug_assert!(new_pos >= cursor.pos);
    debug_assert!(new_pos <= cursor.effective_end());

    let weight_of = |idx: usize| sample_weight.map_or(1.0, |sw| sw[idx]);

    match cursor.plan(new_pos) {
        Direction::Forward => {
            for i in cursor.pos..new_pos {
                let idx = sample_indices[i];
                let w = weight_of(idx);
                on_sample(idx, w, true);
                cursor.weighted_n_left += w;
            }
        }
        Direction::Backward => {
            on_reverse_reset(cursor);
            let effective_end = cursor.effective_end();
            for i in (new_pos..effective_end).rev() {
                let idx = sample_indices[i];
                let w = weight_of(idx);
                on_sample(idx, w, false);
                cursor.weighted_n_left -= w;
            }
        }
    }

    cursor.pos = new_pos;
    cursor.weighted_n_right = cursor.weighted_n_node_samples - cursor.weighted_n_left;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_picks_forward_when_closer_to_pos() {
        let mut cursor = NodeCursor::default();
        cursor.bind(10.0, 10.0, 0, 10);
        cursor.pos = 2;
        assert_eq!(cursor.plan(3), Direction::Forward);
    }

    #[test]
    fn plan_picks_backward_when_closer_to_effective_end() {
        let mut cursor = NodeCursor::default();
        cursor.bind(10.0, 10.0, 0, 10);
        cursor.pos = 1;
        assert_eq!(cursor.plan(9), Direction::Backward);
    }

    #[test]
    fn reset_weights_respects_missing_policy() {
        let mut cursor = NodeCursor::default();
        cursor.bind(4.0, 4.0, 0, 4);
        cursor.n_missing = 1;
        cursor.weighted_n_missing = 1.0;

        cursor.missing_go_to_left = true;
        cursor.reset_weights();
        assert_eq!(cursor.weighted_n_left, 1.0);
        assert_eq!(cursor.weighted_n_right, 3.0);

        cursor.missing_go_to_left = false;
        cursor.reset_weights();
        assert_eq!(cursor.weighted_n_left, 0.0);
        assert_eq!(cursor.weighted_n_right, 3.0);
    }
}
