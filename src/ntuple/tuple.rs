//! Single n-tuple lookup table.
//!
//! An n-tuple samples L board cells; the joint position values of those
//! cells form a mixed-radix number addressing a weight table of P^L entries.
//! Updates go through a per-table dedup bitmap so that several equivalent
//! boards hitting the same entry within one pass change it exactly once.

use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::symmetry::BoardVector;
use crate::{Result, TupleNetError};

/// Weight-table initialization.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightInit {
    /// All entries at 0.0.
    Zero,
    /// Entries drawn uniformly from `(-spread, spread)`.
    Uniform { spread: f64 },
}

/// One sampling pattern with its weight table and optional
/// temporal-coherence accumulators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NTuple {
    /// Ordered board-cell indices this tuple samples.
    cells: Vec<usize>,
    /// Number of distinct values a cell can hold.
    num_values: usize,
    weights: Vec<f64>,
    /// Signed delta accumulator per entry, present with temporal coherence.
    tc_signed: Option<Vec<f64>>,
    /// Absolute delta accumulator per entry, present with temporal coherence.
    tc_absolute: Option<Vec<f64>>,
    /// Dedup bitmap for the current update pass.
    #[serde(skip)]
    touched: Vec<bool>,
    /// Entries flagged in `touched`, so clearing costs O(touched).
    #[serde(skip)]
    touched_scratch: Vec<usize>,
}

/// Table size P^L for a sampling pattern, after checking the pattern
/// itself: non-empty, duplicate-free, at least two position values, and a
/// size that fits in `usize`.
fn checked_table_size(cells: &[usize], num_values: usize) -> Result<usize> {
    if cells.is_empty() {
        return Err(TupleNetError::Configuration(
            "empty sampling pattern".to_string(),
        ));
    }
    if num_values < 2 {
        return Err(TupleNetError::Configuration(format!(
            "at least 2 position values needed, got {}",
            num_values
        )));
    }
    for (i, &cell) in cells.iter().enumerate() {
        if cells[..i].contains(&cell) {
            return Err(TupleNetError::Configuration(format!(
                "duplicate cell index {} in sampling pattern",
                cell
            )));
        }
    }
    num_values.checked_pow(cells.len() as u32).ok_or_else(|| {
        TupleNetError::Configuration(format!(
            "weight table size {}^{} overflows",
            num_values,
            cells.len()
        ))
    })
}

impl NTuple {
    /// Builds a tuple over `cells` of a board with `num_cells` cells and
    /// `num_values` position values per cell.
    ///
    /// Rejects empty patterns, duplicate or out-of-range cell indices and
    /// weight tables whose size P^L overflows.
    pub fn new(
        cells: Vec<usize>,
        num_cells: usize,
        num_values: usize,
        init: WeightInit,
        tc_init: Option<f64>,
        rng: &mut StdRng,
    ) -> Result<Self> {
        for &cell in &cells {
            if cell >= num_cells {
                return Err(TupleNetError::Configuration(format!(
                    "cell index {} out of range for a board of {} cells",
                    cell, num_cells
                )));
            }
        }
        let table_size = checked_table_size(&cells, num_values)?;

        let weights = match init {
            WeightInit::Uniform { spread } if spread > 0.0 => (0..table_size)
                .map(|_| rng.random_range(-spread..spread))
                .collect(),
            _ => vec![0.0; table_size],
        };

        Ok(Self {
            cells,
            num_values,
            weights,
            tc_signed: tc_init.map(|c| vec![c; table_size]),
            tc_absolute: tc_init.map(|c| vec![c; table_size]),
            touched: vec![false; table_size],
            touched_scratch: Vec::new(),
        })
    }

    /// Mixed-radix index of `board` under this tuple's sampling pattern:
    /// `sum of board[cells[i]] * P^i`. Pure in `(board, cells)`.
    pub fn index(&self, board: &BoardVector) -> usize {
        let mut index = 0;
        let mut radix = 1;
        for &cell in &self.cells {
            debug_assert!(board[cell] < self.num_values);
            index += board[cell] * radix;
            radix *= self.num_values;
        }
        index
    }

    /// Weight stored for `board`'s index.
    pub fn score(&self, board: &BoardVector) -> f64 {
        self.weights[self.index(board)]
    }

    /// Applies one TD weight change for `board`.
    ///
    /// Temporal-coherence accumulators (when present) take the raw `delta`
    /// unconditionally; the weight itself moves by
    /// `alpha_m * delta * e * factor` at most once per pass, where `factor`
    /// is the coherence ratio (1.0 without temporal coherence) and `e` the
    /// caller's eligibility weight.
    pub fn update(&mut self, board: &BoardVector, alpha_m: f64, delta: f64, e: f64) {
        let idx = self.index(board);
        let factor = match (&mut self.tc_signed, &mut self.tc_absolute) {
            (Some(signed), Some(absolute)) => {
                signed[idx] += delta;
                absolute[idx] += delta.abs();
                (signed[idx].abs() / absolute[idx]).clamp(0.0, 1.0)
            }
            _ => 1.0,
        };
        if !self.touched[idx] {
            self.touched[idx] = true;
            self.touched_scratch.push(idx);
            self.weights[idx] += alpha_m * delta * e * factor;
        }
    }

    /// Resets the dedup bitmap in O(touched) time. Call once per tuple
    /// before each equivalent-set pass.
    pub fn clear_dedup(&mut self) {
        for idx in self.touched_scratch.drain(..) {
            self.touched[idx] = false;
        }
    }

    /// Current coherence factor for a table entry, 1.0 when temporal
    /// coherence is off. Diagnostic; does not accumulate.
    pub fn tc_factor(&self, idx: usize) -> f64 {
        match (&self.tc_signed, &self.tc_absolute) {
            (Some(signed), Some(absolute)) => {
                (signed[idx].abs() / absolute[idx]).clamp(0.0, 1.0)
            }
            _ => 1.0,
        }
    }

    pub fn cells(&self) -> &[usize] {
        &self.cells
    }

    pub fn num_values(&self) -> usize {
        self.num_values
    }

    /// Number of weight-table entries (P^L).
    pub fn table_size(&self) -> usize {
        self.weights.len()
    }

    /// Direct weight read, mainly for diagnostics and tests.
    pub fn weight(&self, idx: usize) -> f64 {
        self.weights[idx]
    }

    /// Rebuilds the transient dedup state after deserialization.
    pub(crate) fn restore_transient(&mut self) {
        self.touched = vec![false; self.weights.len()];
        self.touched_scratch = Vec::new();
    }

    /// Re-checks the construction invariants on a tuple that arrived from
    /// outside, e.g. deserialized from an agent file. A table of the wrong
    /// size would index out of bounds on the first lookup.
    pub(crate) fn validate(&self) -> Result<()> {
        let table_size = checked_table_size(&self.cells, self.num_values)?;
        if self.weights.len() != table_size {
            return Err(TupleNetError::Configuration(format!(
                "weight table holds {} entries, pattern needs {}",
                self.weights.len(),
                table_size
            )));
        }
        match (&self.tc_signed, &self.tc_absolute) {
            (Some(signed), Some(absolute)) => {
                if signed.len() != table_size || absolute.len() != table_size {
                    return Err(TupleNetError::Configuration(format!(
                        "temporal-coherence accumulators hold {}/{} entries, table needs {}",
                        signed.len(),
                        absolute.len(),
                        table_size
                    )));
                }
            }
            (None, None) => {}
            _ => {
                return Err(TupleNetError::Configuration(
                    "temporal-coherence accumulators must come as a pair".to_string(),
                ));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(42)
    }

    fn plain_tuple(cells: Vec<usize>, num_cells: usize, num_values: usize) -> NTuple {
        NTuple::new(cells, num_cells, num_values, WeightInit::Zero, None, &mut rng()).unwrap()
    }

    #[test]
    fn test_index_is_mixed_radix() {
        let tuple = plain_tuple(vec![0, 2], 3, 3);
        // board[0]=1 contributes 1*3^0, board[2]=2 contributes 2*3^1.
        assert_eq!(tuple.index(&vec![1, 0, 2]), 7);
        assert_eq!(tuple.index(&vec![0, 0, 0]), 0);
        assert_eq!(tuple.index(&vec![2, 0, 2]), 8);
        assert_eq!(tuple.table_size(), 9);
    }

    #[test]
    fn test_index_ignores_unsampled_cells() {
        let tuple = plain_tuple(vec![0, 2], 3, 3);
        assert_eq!(tuple.index(&vec![1, 0, 2]), tuple.index(&vec![1, 2, 2]));
    }

    #[test]
    fn test_rejects_empty_pattern() {
        let err = NTuple::new(vec![], 9, 3, WeightInit::Zero, None, &mut rng());
        assert!(matches!(err, Err(TupleNetError::Configuration(_))));
    }

    #[test]
    fn test_rejects_out_of_range_cell() {
        let err = NTuple::new(vec![0, 9], 9, 3, WeightInit::Zero, None, &mut rng());
        assert!(matches!(err, Err(TupleNetError::Configuration(_))));
    }

    #[test]
    fn test_rejects_duplicate_cell() {
        let err = NTuple::new(vec![0, 4, 0], 9, 3, WeightInit::Zero, None, &mut rng());
        assert!(matches!(err, Err(TupleNetError::Configuration(_))));
    }

    #[test]
    fn test_rejects_overflowing_table() {
        let cells: Vec<usize> = (0..30).collect();
        let err = NTuple::new(cells, 30, 10, WeightInit::Zero, None, &mut rng());
        assert!(matches!(err, Err(TupleNetError::Configuration(_))));
    }

    #[test]
    fn test_single_update_is_exact() {
        let mut tuple = plain_tuple(vec![0], 1, 2);
        let board = vec![1];
        assert_eq!(tuple.score(&board), 0.0);
        tuple.update(&board, 1.0, 0.25, 1.0);
        assert_eq!(tuple.score(&board), 0.25);
    }

    #[test]
    fn test_within_pass_dedup_applies_once() {
        let mut tuple = plain_tuple(vec![0], 2, 2);
        // Both boards collide on index 1 because only cell 0 is sampled.
        let a = vec![1, 0];
        let b = vec![1, 1];
        tuple.update(&a, 1.0, 0.5, 1.0);
        tuple.update(&b, 1.0, 0.5, 1.0);
        assert_eq!(tuple.score(&a), 0.5);

        tuple.clear_dedup();
        tuple.update(&b, 1.0, 0.5, 1.0);
        assert_eq!(tuple.score(&a), 1.0);
    }

    #[test]
    fn test_uniform_init_stays_within_spread() {
        let tuple = NTuple::new(
            (0..4).collect(),
            4,
            3,
            WeightInit::Uniform { spread: 0.05 },
            None,
            &mut rng(),
        )
        .unwrap();
        assert!((0..tuple.table_size()).any(|i| tuple.weight(i) != 0.0));
        assert!((0..tuple.table_size()).all(|i| tuple.weight(i).abs() < 0.05));
    }

    #[test]
    fn test_tc_factor_damps_oscillating_deltas() {
        let mut tuple =
            NTuple::new(vec![0], 1, 2, WeightInit::Zero, Some(0.001), &mut rng()).unwrap();
        let board = vec![1];
        let idx = tuple.index(&board);

        tuple.update(&board, 1.0, 1.0, 1.0);
        tuple.clear_dedup();
        tuple.update(&board, 1.0, -1.0, 1.0);
        tuple.clear_dedup();

        // Signed sum is near zero, absolute sum near two.
        assert!(tuple.tc_factor(idx) < 0.01);
    }

    #[test]
    fn test_tc_factor_stays_high_for_consistent_deltas() {
        let mut tuple =
            NTuple::new(vec![0], 1, 2, WeightInit::Zero, Some(0.001), &mut rng()).unwrap();
        let board = vec![1];
        let idx = tuple.index(&board);

        for _ in 0..5 {
            tuple.update(&board, 1.0, 0.5, 1.0);
            tuple.clear_dedup();
        }
        assert!(tuple.tc_factor(idx) > 0.99);
    }

    #[test]
    fn test_tc_factor_bounded_for_any_sequence() {
        let mut tuple =
            NTuple::new(vec![0], 1, 2, WeightInit::Zero, Some(0.001), &mut rng()).unwrap();
        let board = vec![1];
        let idx = tuple.index(&board);

        for delta in [0.3, -0.8, 0.1, 0.9, -0.2, -0.4, 0.05] {
            tuple.update(&board, 0.1, delta, 1.0);
            tuple.clear_dedup();
            let factor = tuple.tc_factor(idx);
            assert!((0.0..=1.0).contains(&factor));
        }
    }

    #[test]
    fn test_tc_accumulates_even_on_deduped_updates() {
        let mut tuple =
            NTuple::new(vec![0], 1, 2, WeightInit::Zero, Some(0.001), &mut rng()).unwrap();
        let board = vec![1];
        let idx = tuple.index(&board);

        // Second call within the pass changes no weight but still feeds the
        // accumulators with an opposing delta.
        tuple.update(&board, 1.0, 1.0, 1.0);
        tuple.update(&board, 1.0, -1.0, 1.0);
        assert!(tuple.tc_factor(idx) < 0.01);
        assert_eq!(tuple.score(&board), 1.0);
    }

    #[test]
    fn test_validate_catches_a_truncated_table() {
        let mut tuple = plain_tuple(vec![0, 1], 2, 2);
        assert!(tuple.validate().is_ok());
        tuple.weights.truncate(1);
        assert!(matches!(
            tuple.validate(),
            Err(TupleNetError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_catches_a_lone_accumulator() {
        let mut tuple =
            NTuple::new(vec![0], 1, 2, WeightInit::Zero, Some(0.001), &mut rng()).unwrap();
        assert!(tuple.validate().is_ok());
        tuple.tc_absolute = None;
        assert!(matches!(
            tuple.validate(),
            Err(TupleNetError::Configuration(_))
        ));
    }

    #[test]
    fn test_restore_transient_resizes_bitmap() {
        let mut tuple = plain_tuple(vec![0, 1], 2, 2);
        tuple.touched = Vec::new();
        tuple.restore_transient();
        assert_eq!(tuple.touched.len(), tuple.table_size());
        tuple.update(&vec![1, 1], 1.0, 0.5, 1.0);
        assert_eq!(tuple.score(&vec![1, 1]), 0.5);
    }
}
