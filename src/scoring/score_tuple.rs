/// How an incoming tuple is merged into an accumulator tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineOp {
    /// Element-wise sum, ignoring the weight.
    Sum,
    /// Element-wise weighted accumulation (`self += weight * other`).
    Average,
    /// Keep whichever tuple scores lower for the reference player.
    Min,
    /// Keep whichever tuple scores higher for the reference player.
    Max,
}

/// Per-player vector of reward or value estimates.
///
/// A single scalar value generalizes poorly beyond one player, so every
/// reward and evaluation surface in this crate hands back one entry per
/// player. The min/max marks track the best and worst reference score seen
/// so far across `combine` calls with `Min`/`Max`.
///
/// Not serialized: the marks start at the infinities, which JSON cannot
/// represent.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreTuple {
    values: Vec<f64>,
    min_mark: f64,
    max_mark: f64,
}

impl ScoreTuple {
    /// All-zero tuple for `num_players` players.
    pub fn new(num_players: usize) -> Self {
        Self {
            values: vec![0.0; num_players],
            min_mark: f64::INFINITY,
            max_mark: f64::NEG_INFINITY,
        }
    }

    pub fn from_values(values: Vec<f64>) -> Self {
        Self {
            values,
            min_mark: f64::INFINITY,
            max_mark: f64::NEG_INFINITY,
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, player: usize) -> f64 {
        self.values[player]
    }

    pub fn set(&mut self, player: usize, value: f64) {
        self.values[player] = value;
    }

    pub fn add(&mut self, player: usize, delta: f64) {
        self.values[player] += delta;
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Merges `other` into `self`.
    ///
    /// `Sum` and `Average` are element-wise; `Min`/`Max` replace the whole
    /// tuple whenever `other` beats the current mark for the `reference`
    /// player, so the accumulator always holds one coherent outcome rather
    /// than a mixture.
    pub fn combine(&mut self, other: &ScoreTuple, op: CombineOp, reference: usize, weight: f64) {
        debug_assert_eq!(self.values.len(), other.values.len());
        match op {
            CombineOp::Sum => {
                for (v, o) in self.values.iter_mut().zip(&other.values) {
                    *v += o;
                }
            }
            CombineOp::Average => {
                for (v, o) in self.values.iter_mut().zip(&other.values) {
                    *v += weight * o;
                }
            }
            CombineOp::Min => {
                if other.values[reference] < self.min_mark {
                    self.values.copy_from_slice(&other.values);
                    self.min_mark = other.values[reference];
                }
            }
            CombineOp::Max => {
                if other.values[reference] > self.max_mark {
                    self.values.copy_from_slice(&other.values);
                    self.max_mark = other.values[reference];
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_all_zero() {
        let t = ScoreTuple::new(3);
        assert_eq!(t.len(), 3);
        assert_eq!(t.values(), &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_sum_combines_element_wise() {
        let mut acc = ScoreTuple::from_values(vec![1.0, -1.0]);
        let other = ScoreTuple::from_values(vec![0.5, 0.5]);
        acc.combine(&other, CombineOp::Sum, 0, 0.0);
        assert_eq!(acc.values(), &[1.5, -0.5]);
    }

    #[test]
    fn test_average_applies_weight() {
        let mut acc = ScoreTuple::new(2);
        let a = ScoreTuple::from_values(vec![1.0, 3.0]);
        let b = ScoreTuple::from_values(vec![3.0, 1.0]);
        acc.combine(&a, CombineOp::Average, 0, 0.5);
        acc.combine(&b, CombineOp::Average, 0, 0.5);
        assert_eq!(acc.values(), &[2.0, 2.0]);
    }

    #[test]
    fn test_max_keeps_best_reference_outcome() {
        let mut acc = ScoreTuple::new(2);
        acc.combine(
            &ScoreTuple::from_values(vec![0.3, -0.3]),
            CombineOp::Max,
            0,
            0.0,
        );
        acc.combine(
            &ScoreTuple::from_values(vec![0.1, 0.9]),
            CombineOp::Max,
            0,
            0.0,
        );
        // Second tuple is worse for player 0 and must not replace the first.
        assert_eq!(acc.values(), &[0.3, -0.3]);
    }

    #[test]
    fn test_max_replaces_whole_tuple() {
        let mut acc = ScoreTuple::new(2);
        acc.combine(
            &ScoreTuple::from_values(vec![0.1, 0.9]),
            CombineOp::Max,
            0,
            0.0,
        );
        acc.combine(
            &ScoreTuple::from_values(vec![0.7, -0.7]),
            CombineOp::Max,
            0,
            0.0,
        );
        assert_eq!(acc.values(), &[0.7, -0.7]);
    }

    #[test]
    fn test_min_keeps_worst_reference_outcome() {
        let mut acc = ScoreTuple::new(2);
        acc.combine(
            &ScoreTuple::from_values(vec![0.3, -0.3]),
            CombineOp::Min,
            0,
            0.0,
        );
        acc.combine(
            &ScoreTuple::from_values(vec![-0.5, 0.5]),
            CombineOp::Min,
            0,
            0.0,
        );
        assert_eq!(acc.values(), &[-0.5, 0.5]);
    }

    #[test]
    fn test_set_and_add() {
        let mut t = ScoreTuple::new(2);
        t.set(1, 2.0);
        t.add(1, 0.5);
        assert_eq!(t.get(1), 2.5);
        assert_eq!(t.get(0), 0.0);
    }
}
