use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet, VecDeque};

/// Running weighted median over a multiset of `(value, weight)` pairs,
/// maintained as two heaps: `lower` (a max-heap) holds values at or below
/// the median and surfaces the largest of them in O(1); `upper` (a
/// min-heap, via `Reverse`) holds values above the median and surfaces the
/// smallest of them in O(1). The heaps are kept balanced so
/// `weight(lower) >= weight(upper)` and `weight(lower) - weight(upper) <=
/// weight` of `lower`'s top element, which keeps the median always
/// readable from `lower`'s top alone.
///
/// `remove` can't physically splice an arbitrary element out of a
/// `BinaryHeap` in better than O(n), so removal is lazy: each pushed
/// element is tagged with a unique id, `remove` marks that id deleted in
/// O(1) and only pops it off its heap if it happens to already be on top;
/// a buried deleted entry is skipped (and actually popped) the next time
/// it surfaces, in whichever call eventually exposes it. Every physical
/// heap element is popped at most once over its lifetime, so the amortized
/// cost per `push`/`remove`/`pop` stays O(log n), matching spec §4.8.
#[derive(Debug, Default)]
pub struct WeightedMedianCalculator {
    lower: BinaryHeap<Entry>,
    upper: BinaryHeap<Reverse<Entry>>,
    deleted_lower: HashSet<u64>,
    deleted_upper: HashSet<u64>,
    /// Which heap currently holds each live id, so `remove` knows where to
    /// mark a deletion without searching both heaps.
    location: HashMap<u64, Side>,
    /// Ids currently live for a given `(value, weight)` pair, so `remove`
    /// can find one to delete without caring which physical entry it is —
    /// duplicates are interchangeable.
    by_key: HashMap<(u64, u64), VecDeque<u64>>,
    weight_lower: f64,
    weight_upper: f64,
    next_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Lower,
    Upper,
}

/// `(value, weight, id)` ordered by `value` alone; `id` disambiguates
/// otherwise-identical entries for lazy deletion and carries no ordering
/// weight of its own. Sample values fed to this calculator are never
/// `NaN`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Entry {
    value: f64,
    weight: f64,
    id: u64,
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.value.total_cmp(&other.value)
    }
}

fn key(value: f64, weight: f64) -> (u64, u64) {
    (value.to_bits(), weight.to_bits())
}

impl WeightedMedianCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.lower.clear();
        self.upper.clear();
        self.deleted_lower.clear();
        self.deleted_upper.clear();
        self.location.clear();
        self.by_key.clear();
        self.weight_lower = 0.0;
        self.weight_upper = 0.0;
    }

    /// Count of live (not-yet-lazily-removed) elements. Entries already
    /// marked deleted but not yet physically popped don't count.
    pub fn size(&self) -> usize {
        (self.lower.len() - self.deleted_lower.len()) + (self.upper.len() - self.deleted_upper.len())
    }

    pub fn total_weight(&self) -> f64 {
        self.weight_lower + self.weight_upper
    }

    /// Pops stale (lazily-deleted) entries off the top of `lower` so its
    /// `peek`/`pop` always sees a live element.
    fn purge_lower(&mut self) {
        while let Some(top) = self.lower.peek() {
            if self.deleted_lower.remove(&top.id) {
                self.lower.pop();
            } else {
                break;
            }
        }
    }

    fn purge_upper(&mut self) {
        while let Some(Reverse(top)) = self.upper.peek() {
            if self.deleted_upper.remove(&top.id) {
                self.upper.pop();
            } else {
                break;
            }
        }
    }

    /// Drops bookkeeping for an id that just left a heap for real (via
    /// `pop`, not lazy deletion).
    fn forget(&mut self, id: u64, value: f64, weight: f64) {
        self.location.remove(&id);
        let k = key(value, weight);
        if let Some(ids) = self.by_key.get_mut(&k) {
            if let Some(pos) = ids.iter().position(|&i| i == id) {
                ids.remove(pos);
            }
            if ids.is_empty() {
                self.by_key.remove(&k);
            }
        }
    }

    /// Inserts `(value, weight)` and restores the lower/upper balance.
    pub fn push(&mut self, value: f64, weight: f64) {
        let side = if self.lower.peek().map_or(true, |top| value <= top.value) {
            Side::Lower
        } else {
            Side::Upper
        };
        let id = self.next_id;
        self.next_id += 1;
        match side {
            Side::Lower => {
                self.lower.push(Entry { value, weight, id });
                self.weight_lower += weight;
            }
            Side::Upper => {
                self.upper.push(Reverse(Entry { value, weight, id }));
                self.weight_upper += weight;
            }
        }
        self.location.insert(id, side);
        self.by_key.entry(key(value, weight)).or_default().push_back(id);
        self.rebalance();
    }

    /// Removes one occurrence of `(value, weight)`. The value must
    /// currently be present; used when a sample leaves the node range as
    /// the split boundary sweeps past it. Duplicate `(value, weight)`
    /// entries that ended up split across both heaps by `rebalance` are
    /// handled correctly: the id to delete is looked up by identity, not
    /// by re-deriving which heap "should" hold it.
    pub fn remove(&mut self, value: f64, weight: f64) {
        let k = key(value, weight);
        let id = self
            .by_key
            .get_mut(&k)
            .and_then(|ids| ids.pop_front())
            .expect("(value, weight) must currently be present to remove");
        if self.by_key.get(&k).is_some_and(VecDeque::is_empty) {
            self.by_key.remove(&k);
        }
        let side = self
            .location
            .remove(&id)
            .expect("an id tracked by by_key must have a known heap location");
        match side {
            Side::Lower => {
                self.deleted_lower.insert(id);
                self.weight_lower -= weight;
                self.purge_lower();
            }
            Side::Upper => {
                self.deleted_upper.insert(id);
                self.weight_upper -= weight;
                self.purge_upper();
            }
        }
        self.rebalance();
    }

    /// Pops the element nearest the median (from the heavier of the two
    /// weighted halves) into `(value, weight)`, returning `false` if empty.
    pub fn pop(&mut self, value: &mut f64, weight: &mut f64) -> bool {
        self.purge_lower();
        self.purge_upper();
        if self.weight_lower >= self.weight_upper {
            if let Some(entry) = self.lower.pop() {
                self.weight_lower -= entry.weight;
                self.forget(entry.id, entry.value, entry.weight);
                *value = entry.value;
                *weight = entry.weight;
                self.purge_lower();
                self.rebalance();
                return true;
            }
        } else if let Some(Reverse(entry)) = self.upper.pop() {
            self.weight_upper -= entry.weight;
            self.forget(entry.id, entry.value, entry.weight);
            *value = entry.value;
            *weight = entry.weight;
            self.purge_upper();
            self.rebalance();
            return true;
        }
        false
    }

    fn rebalance(&mut self) {
        loop {
            self.purge_lower();
            let should_move = self.weight_lower > self.weight_upper
                && self
                    .lower
                    .peek()
                    .map_or(false, |top| self.weight_lower - top.weight >= self.weight_upper);
            if !should_move {
                break;
            }
            let entry = self.lower.pop().unwrap();
            self.weight_lower -= entry.weight;
            self.location.insert(entry.id, Side::Upper);
            self.upper.push(Reverse(entry));
            self.weight_upper += entry.weight;
        }
        loop {
            self.purge_upper();
            if self.weight_upper <= self.weight_lower {
                break;
            }
            let Reverse(entry) = self.upper.pop().unwrap();
            self.weight_upper -= entry.weight;
            self.location.insert(entry.id, Side::Lower);
            self.lower.push(entry);
            self.weight_lower += entry.weight;
        }
    }

    /// The weighted median under the "lower median" convention: when the
    /// cumulative weight reaches exactly half the total at a value
    /// boundary, the smaller of the two candidate values is returned
    /// (spec scenario F: `median([1,2,3,100]) == 2`). Empty calculators
    /// return `0.0`; callers never query an empty side's median (a side
    /// with `weighted_n == 0` skips the impurity term instead).
    ///
    /// Every mutating method (`push`/`remove`/`pop`) leaves both heaps'
    /// tops already purged of lazily-deleted entries before it returns, so
    /// this can `peek` directly without needing `&mut self` to purge.
    pub fn get_median(&self) -> f64 {
        match self.lower.peek() {
            Some(top) => top.value,
            None => self.upper.peek().map_or(0.0, |Reverse(v)| v.value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn median_of_four_is_lower_median() {
        let mut calc = WeightedMedianCalculator::new();
        for v in [1.0, 2.0, 3.0, 100.0] {
            calc.push(v, 1.0);
        }
        assert_relative_eq!(calc.get_median(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn median_of_odd_count_is_middle_value() {
        let mut calc = WeightedMedianCalculator::new();
        for v in [5.0, 1.0, 3.0] {
            calc.push(v, 1.0);
        }
        assert_relative_eq!(calc.get_median(), 3.0, epsilon = 1e-12);
    }

    #[test]
    fn remove_then_push_keeps_correct_median() {
        let mut calc = WeightedMedianCalculator::new();
        for v in [1.0, 2.0, 3.0, 100.0] {
            calc.push(v, 1.0);
        }
        calc.remove(100.0, 1.0);
        assert_relative_eq!(calc.get_median(), 2.0, epsilon = 1e-12);
        calc.remove(1.0, 1.0);
        // Two elements remain, tied in weight either side of the median;
        // the lower-median convention picks the smaller, not the average.
        assert_relative_eq!(calc.get_median(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn weighted_values_shift_the_median() {
        let mut calc = WeightedMedianCalculator::new();
        calc.push(1.0, 1.0);
        calc.push(2.0, 10.0);
        calc.push(3.0, 1.0);
        assert_relative_eq!(calc.get_median(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn pop_drains_from_the_heavier_side() {
        let mut calc = WeightedMedianCalculator::new();
        for v in [1.0, 2.0, 3.0] {
            calc.push(v, 1.0);
        }
        assert_eq!(calc.size(), 3);
        let mut value = 0.0;
        let mut weight = 0.0;
        assert!(calc.pop(&mut value, &mut weight));
        assert_eq!(calc.size(), 2);
    }

    #[test]
    fn reset_empties_both_heaps() {
        let mut calc = WeightedMedianCalculator::new();
        calc.push(1.0, 1.0);
        calc.push(2.0, 1.0);
        calc.reset();
        assert_eq!(calc.size(), 0);
        assert_eq!(calc.get_median(), 0.0);
    }

    /// Reproduces the maintainer-reported failure: two entries share a
    /// value but carry different weights, so `rebalance` can end up
    /// splitting them across both heaps. `remove` must find the exact
    /// `(value, weight)` pair requested, not silently miss and corrupt the
    /// weight bookkeeping.
    #[test]
    fn remove_finds_duplicate_value_with_distinct_weight() {
        let mut calc = WeightedMedianCalculator::new();
        calc.push(5.0, 1.0);
        calc.push(5.0, 100.0);
        let total_before = calc.total_weight();

        calc.remove(5.0, 1.0);

        assert_relative_eq!(calc.total_weight(), total_before - 1.0, epsilon = 1e-12);
        assert_eq!(calc.size(), 1);
        assert_relative_eq!(calc.get_median(), 5.0, epsilon = 1e-12);

        calc.remove(5.0, 100.0);
        assert_eq!(calc.size(), 0);
        assert_relative_eq!(calc.total_weight(), 0.0, epsilon = 1e-12);
    }

    /// A deleted-but-not-yet-physically-popped entry buried under other
    /// elements must not affect `size`/`get_median` until it would
    /// otherwise surface, and must never be double-counted.
    #[test]
    fn lazy_deletion_does_not_resurface_removed_entries() {
        let mut calc = WeightedMedianCalculator::new();
        for v in [10.0, 20.0, 30.0, 40.0, 50.0] {
            calc.push(v, 1.0);
        }
        calc.remove(30.0, 1.0);
        assert_eq!(calc.size(), 4);

        let mut drained = Vec::new();
        let mut value = 0.0;
        let mut weight = 0.0;
        while calc.pop(&mut value, &mut weight) {
            drained.push(value);
        }
        drained.sort_by(|a, b| a.partial_cmp(b).unwrap());
        assert_eq!(drained, vec![10.0, 20.0, 40.0, 50.0]);
    }
}
