//! N-tuple ensemble value function.
//!
//! One `NTupleNetwork` holds an independent grid of weight tables per
//! player, all players sharing the same sampling patterns. TD(lambda) is
//! approximated with a bounded queue of recent moves' equivalent-board
//! sets: exact per-cell eligibility traces would need unbounded memory,
//! the queue trades a small tail of the trace for a fixed cap.

use std::collections::VecDeque;

use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::game::symmetry::{BoardVector, SymmetryProvider};
use crate::ntuple::tuple::NTuple;
use crate::training::params::TdParams;
use crate::{Result, TupleNetError};

/// One move's equivalent board vectors plus the squashing derivative
/// captured when the move entered the horizon queue.
#[derive(Debug, Clone)]
pub struct EquivalentBoards {
    pub boards: Vec<BoardVector>,
    pub weight: f64,
}

/// Per-player n-tuple ensemble with a shared bounded eligibility queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NTupleNetwork {
    /// Weight tables indexed `[player][tuple]`; non-aliased owned storage,
    /// only the sampling patterns repeat across players.
    tuples: Vec<Vec<NTuple>>,
    num_players: usize,
    alpha: f64,
    alpha_decay: f64,
    lambda: f64,
    horizon_cutoff: f64,
    horizon: usize,
    use_symmetry: bool,
    squash: bool,
    /// Recent moves, newest first. Length stays within `horizon + 1`.
    #[serde(skip)]
    history: VecDeque<EquivalentBoards>,
}

impl NTupleNetwork {
    /// Builds per-player tables for every sampling pattern.
    pub fn new(
        patterns: &[Vec<usize>],
        num_players: usize,
        sym: &impl SymmetryProvider,
        params: &TdParams,
        rng: &mut StdRng,
    ) -> Result<Self> {
        params.validate().map_err(TupleNetError::Configuration)?;
        if num_players == 0 {
            return Err(TupleNetError::Configuration(
                "at least one player required".to_string(),
            ));
        }
        if patterns.is_empty() {
            return Err(TupleNetError::Configuration(
                "at least one sampling pattern required".to_string(),
            ));
        }
        let num_cells = sym.num_cells();
        let num_values = sym.num_position_values();
        let tc_init = params.temporal_coherence.then_some(params.tc_init);

        let mut tuples = Vec::with_capacity(num_players);
        for _ in 0..num_players {
            let per_player: Result<Vec<NTuple>> = patterns
                .iter()
                .map(|pattern| {
                    NTuple::new(
                        pattern.clone(),
                        num_cells,
                        num_values,
                        params.weight_init,
                        tc_init,
                        rng,
                    )
                })
                .collect();
            tuples.push(per_player?);
        }

        Ok(Self {
            tuples,
            num_players,
            alpha: params.alpha_init,
            alpha_decay: params.alpha_decay_ratio(),
            lambda: params.lambda,
            horizon_cutoff: params.horizon_cutoff,
            horizon: Self::compute_horizon(params.lambda, params.horizon_cutoff),
            use_symmetry: params.use_symmetry,
            squash: params.squash_output,
            history: VecDeque::new(),
        })
    }

    /// Number of past moves worth keeping: the largest `h` with
    /// `lambda^h >= cutoff`, or 0 when lambda is 0.
    pub fn compute_horizon(lambda: f64, cutoff: f64) -> usize {
        if lambda <= 0.0 {
            0
        } else {
            (cutoff.ln() / lambda.ln()).floor() as usize
        }
    }

    fn equivalent_vectors(
        &self,
        sym: &impl SymmetryProvider,
        board: &BoardVector,
    ) -> Vec<BoardVector> {
        if self.use_symmetry {
            sym.symmetry_vectors(board)
        } else {
            vec![board.clone()]
        }
    }

    /// Value of `board` for `player`: the sum over the player's tuples and
    /// the equivalent-board set, squash applied last.
    ///
    /// A non-finite raw sum means the weights have diverged; it is reported
    /// as an error before any squashing could mask it.
    pub fn evaluate(
        &self,
        sym: &impl SymmetryProvider,
        board: &BoardVector,
        player: usize,
    ) -> Result<f64> {
        let vectors = self.equivalent_vectors(sym, board);
        let mut sum = 0.0;
        for tuple in &self.tuples[player] {
            for vector in &vectors {
                sum += tuple.score(vector);
            }
        }
        if !sum.is_finite() {
            return Err(TupleNetError::NumericDivergence(format!(
                "evaluation for player {} is {}",
                player, sum
            )));
        }
        Ok(if self.squash { sum.tanh() } else { sum })
    }

    /// One TD update of `player`'s tables toward `target`.
    ///
    /// The move's equivalent boards join the front of the horizon queue,
    /// then every queued move receives the new error, scaled by
    /// `lambda^age` and its stored derivative, the step size split evenly
    /// across tuples and equivalents. Within each queue entry a tuple
    /// updates any table index at most once.
    pub fn update_td(
        &mut self,
        sym: &impl SymmetryProvider,
        board: &BoardVector,
        player: usize,
        old_value: f64,
        target: f64,
        reward: f64,
    ) {
        let delta = target - old_value;
        let deriv = if self.squash {
            1.0 - old_value * old_value
        } else {
            1.0
        };
        let entry = EquivalentBoards {
            boards: self.equivalent_vectors(sym, board),
            weight: deriv,
        };
        self.history.push_front(entry);
        while self.history.len() > self.horizon + 1 {
            self.history.pop_back();
        }
        log::trace!(
            "TD update: player={} delta={:.6} reward={:.3} queue_len={}",
            player,
            delta,
            reward,
            self.history.len()
        );

        let alpha = self.alpha;
        let lambda = self.lambda;
        let Self {
            tuples, history, ..
        } = self;
        let player_tuples = &mut tuples[player];
        let num_tuples = player_tuples.len() as f64;

        let mut lambda_k = 1.0;
        for entry in history.iter() {
            let step = alpha / (num_tuples * entry.boards.len() as f64);
            let e = lambda_k * entry.weight;
            for tuple in player_tuples.iter_mut() {
                tuple.clear_dedup();
                for vector in &entry.boards {
                    tuple.update(vector, step, delta, e);
                }
            }
            lambda_k *= lambda;
        }
    }

    /// Changes lambda and resizes the horizon accordingly.
    pub fn set_lambda(&mut self, lambda: f64) {
        self.lambda = lambda;
        self.horizon = Self::compute_horizon(lambda, self.horizon_cutoff);
    }

    /// One exponential decay step of the global learning rate.
    pub fn advance_learning_rate(&mut self) {
        self.alpha *= self.alpha_decay;
    }

    /// Drops all queued eligibility entries. Called at episode starts and
    /// after exploration breaks.
    pub fn clear_horizon_queue(&mut self) {
        self.history.clear();
    }

    /// Rebuilds transient state after deserialization.
    pub fn restore_transient(&mut self) {
        self.history.clear();
        for player_tuples in &mut self.tuples {
            for tuple in player_tuples {
                tuple.restore_transient();
            }
        }
    }

    /// Checks table integrity for every player. A tampered or truncated
    /// agent file must fail here instead of panicking on the first lookup.
    pub fn validate(&self) -> Result<()> {
        if self.num_players == 0 || self.tuples.len() != self.num_players {
            return Err(TupleNetError::Configuration(format!(
                "network claims {} players but holds {} table sets",
                self.num_players,
                self.tuples.len()
            )));
        }
        let reference = &self.tuples[0];
        if reference.is_empty() {
            return Err(TupleNetError::Configuration(
                "network holds no sampling patterns".to_string(),
            ));
        }
        for (player, player_tuples) in self.tuples.iter().enumerate() {
            if player_tuples.len() != reference.len() {
                return Err(TupleNetError::Configuration(format!(
                    "player {} holds {} tuples, player 0 holds {}",
                    player,
                    player_tuples.len(),
                    reference.len()
                )));
            }
            for (i, tuple) in player_tuples.iter().enumerate() {
                if tuple.cells() != reference[i].cells() {
                    return Err(TupleNetError::Configuration(format!(
                        "player {} tuple {} samples different cells than player 0",
                        player, i
                    )));
                }
                tuple.validate()?;
            }
        }
        Ok(())
    }

    /// `validate` plus a fit check against the boards `sym` produces.
    pub fn validate_for(&self, sym: &impl SymmetryProvider) -> Result<()> {
        self.validate()?;
        let num_cells = sym.num_cells();
        let num_values = sym.num_position_values();
        for tuple in self.tuples.iter().flatten() {
            if tuple.num_values() != num_values {
                return Err(TupleNetError::Configuration(format!(
                    "tables expect {} position values, the encoder provides {}",
                    tuple.num_values(),
                    num_values
                )));
            }
            if let Some(&cell) = tuple.cells().iter().find(|&&c| c >= num_cells) {
                return Err(TupleNetError::Configuration(format!(
                    "cell index {} out of range for a board of {} cells",
                    cell, num_cells
                )));
            }
        }
        Ok(())
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn lambda(&self) -> f64 {
        self.lambda
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn num_players(&self) -> usize {
        self.num_players
    }

    /// Sampling patterns per player.
    pub fn num_tuples(&self) -> usize {
        self.tuples[0].len()
    }

    pub fn tuples(&self, player: usize) -> &[NTuple] {
        &self.tuples[player]
    }

    /// Total number of table entries across all players, a rough memory
    /// gauge for diagnostics.
    pub fn total_weights(&self) -> usize {
        self.tuples
            .iter()
            .flatten()
            .map(|tuple| tuple.table_size())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    enum Mode {
        Identity,
        Mirror,
        Duplicate,
    }

    struct TestProvider {
        cells: usize,
        values: usize,
        mode: Mode,
    }

    impl SymmetryProvider for TestProvider {
        fn num_cells(&self) -> usize {
            self.cells
        }

        fn num_position_values(&self) -> usize {
            self.values
        }

        fn symmetry_vectors(&self, board: &BoardVector) -> Vec<BoardVector> {
            match self.mode {
                Mode::Identity => vec![board.clone()],
                Mode::Mirror => {
                    let mut mirrored = board.clone();
                    mirrored.reverse();
                    vec![board.clone(), mirrored]
                }
                Mode::Duplicate => vec![board.clone(), board.clone()],
            }
        }
    }

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    fn unit_params() -> TdParams {
        TdParams {
            alpha_init: 1.0,
            alpha_final: 1.0,
            ..TdParams::default()
        }
    }

    #[test]
    fn test_single_update_reproduces_target_exactly() {
        let provider = TestProvider {
            cells: 1,
            values: 2,
            mode: Mode::Identity,
        };
        let mut net =
            NTupleNetwork::new(&[vec![0]], 1, &provider, &unit_params(), &mut rng()).unwrap();
        let board = vec![1];
        assert_eq!(net.evaluate(&provider, &board, 0).unwrap(), 0.0);
        net.update_td(&provider, &board, 0, 0.0, 0.7, 0.0);
        assert_eq!(net.evaluate(&provider, &board, 0).unwrap(), 0.7);
    }

    #[test]
    fn test_compute_horizon_values() {
        assert_eq!(NTupleNetwork::compute_horizon(0.0, 0.01), 0);
        assert_eq!(NTupleNetwork::compute_horizon(0.5, 0.01), 6);
        assert_eq!(NTupleNetwork::compute_horizon(0.8, 0.01), 20);
        assert_eq!(NTupleNetwork::compute_horizon(0.95, 0.01), 89);
    }

    #[test]
    fn test_horizon_queue_never_exceeds_bound() {
        let provider = TestProvider {
            cells: 1,
            values: 3,
            mode: Mode::Identity,
        };
        let params = TdParams {
            lambda: 0.8,
            ..unit_params()
        };
        let mut net = NTupleNetwork::new(&[vec![0]], 1, &provider, &params, &mut rng()).unwrap();
        assert_eq!(net.horizon(), 20);
        for i in 0..50 {
            net.update_td(&provider, &vec![i % 3], 0, 0.0, 0.1, 0.0);
            assert!(net.history_len() <= net.horizon() + 1);
        }
        assert_eq!(net.history_len(), 21);
    }

    #[test]
    fn test_lambda_decays_older_queue_entries() {
        let provider = TestProvider {
            cells: 1,
            values: 3,
            mode: Mode::Identity,
        };
        let params = TdParams {
            lambda: 0.5,
            ..unit_params()
        };
        let mut net = NTupleNetwork::new(&[vec![0]], 1, &provider, &params, &mut rng()).unwrap();

        net.update_td(&provider, &vec![1], 0, 0.0, 0.4, 0.0);
        net.update_td(&provider, &vec![2], 0, 0.0, 0.2, 0.0);

        // Newest board got the full delta, the one-step-older board half.
        assert!((net.evaluate(&provider, &vec![2], 0).unwrap() - 0.2).abs() < 1e-12);
        assert!((net.evaluate(&provider, &vec![1], 0).unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_zero_lambda_updates_only_the_newest_move() {
        let provider = TestProvider {
            cells: 1,
            values: 3,
            mode: Mode::Identity,
        };
        let mut net =
            NTupleNetwork::new(&[vec![0]], 1, &provider, &unit_params(), &mut rng()).unwrap();
        assert_eq!(net.horizon(), 0);

        net.update_td(&provider, &vec![1], 0, 0.0, 0.4, 0.0);
        net.update_td(&provider, &vec![2], 0, 0.0, 0.2, 0.0);

        assert_eq!(net.history_len(), 1);
        assert!((net.evaluate(&provider, &vec![1], 0).unwrap() - 0.4).abs() < 1e-12);
        assert!((net.evaluate(&provider, &vec![2], 0).unwrap() - 0.2).abs() < 1e-12);
    }

    #[test]
    fn test_set_lambda_resizes_horizon() {
        let provider = TestProvider {
            cells: 1,
            values: 2,
            mode: Mode::Identity,
        };
        let params = TdParams {
            lambda: 0.8,
            ..unit_params()
        };
        let mut net = NTupleNetwork::new(&[vec![0]], 1, &provider, &params, &mut rng()).unwrap();
        assert!(net.horizon() > 0);
        net.set_lambda(0.0);
        assert_eq!(net.horizon(), 0);
        net.set_lambda(0.5);
        assert_eq!(net.horizon(), 6);
    }

    #[test]
    fn test_symmetric_evaluation_is_invariant_under_mirroring() {
        let provider = TestProvider {
            cells: 2,
            values: 2,
            mode: Mode::Mirror,
        };
        let mut net =
            NTupleNetwork::new(&[vec![0]], 1, &provider, &unit_params(), &mut rng()).unwrap();
        net.update_td(&provider, &vec![1, 0], 0, 0.0, 1.0, 0.0);

        let value = net.evaluate(&provider, &vec![1, 0], 0).unwrap();
        let mirrored = net.evaluate(&provider, &vec![0, 1], 0).unwrap();
        assert!((value - 1.0).abs() < 1e-12);
        assert_eq!(value, mirrored);
    }

    #[test]
    fn test_disabled_symmetry_sees_only_the_identity() {
        let provider = TestProvider {
            cells: 2,
            values: 2,
            mode: Mode::Mirror,
        };
        let params = TdParams {
            use_symmetry: false,
            ..unit_params()
        };
        let mut net = NTupleNetwork::new(&[vec![0]], 1, &provider, &params, &mut rng()).unwrap();
        net.update_td(&provider, &vec![1, 0], 0, 0.0, 1.0, 0.0);

        assert!((net.evaluate(&provider, &vec![1, 0], 0).unwrap() - 1.0).abs() < 1e-12);
        assert_eq!(net.evaluate(&provider, &vec![0, 1], 0).unwrap(), 0.0);
    }

    #[test]
    fn test_duplicate_equivalents_update_once_evaluate_twice() {
        let provider = TestProvider {
            cells: 1,
            values: 2,
            mode: Mode::Duplicate,
        };
        let mut net =
            NTupleNetwork::new(&[vec![0]], 1, &provider, &unit_params(), &mut rng()).unwrap();
        net.update_td(&provider, &vec![1], 0, 0.0, 1.0, 0.0);

        // Step size was split across the 2 equivalents, dedup let only one
        // through, and evaluation counts the entry twice.
        assert_eq!(net.tuples(0)[0].weight(1), 0.5);
        assert!((net.evaluate(&provider, &vec![1], 0).unwrap() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_divergent_weights_are_reported_not_clamped() {
        let provider = TestProvider {
            cells: 1,
            values: 2,
            mode: Mode::Identity,
        };
        let mut net =
            NTupleNetwork::new(&[vec![0]], 1, &provider, &unit_params(), &mut rng()).unwrap();
        net.update_td(&provider, &vec![1], 0, 0.0, f64::MAX, 0.0);
        net.update_td(&provider, &vec![1], 0, 0.0, f64::MAX, 0.0);

        let result = net.evaluate(&provider, &vec![1], 0);
        assert!(matches!(result, Err(TupleNetError::NumericDivergence(_))));
    }

    #[test]
    fn test_divergence_detected_even_with_squashing() {
        let provider = TestProvider {
            cells: 1,
            values: 2,
            mode: Mode::Identity,
        };
        let params = TdParams {
            squash_output: true,
            ..unit_params()
        };
        let mut net = NTupleNetwork::new(&[vec![0]], 1, &provider, &params, &mut rng()).unwrap();
        net.update_td(&provider, &vec![1], 0, 0.0, f64::MAX, 0.0);
        net.update_td(&provider, &vec![1], 0, 0.0, f64::MAX, 0.0);

        // tanh would hide the infinity as 1.0; the raw sum must error first.
        let result = net.evaluate(&provider, &vec![1], 0);
        assert!(matches!(result, Err(TupleNetError::NumericDivergence(_))));
    }

    #[test]
    fn test_squash_keeps_values_in_the_open_unit_interval() {
        let provider = TestProvider {
            cells: 1,
            values: 2,
            mode: Mode::Identity,
        };
        let params = TdParams {
            squash_output: true,
            ..unit_params()
        };
        let mut net = NTupleNetwork::new(&[vec![0]], 1, &provider, &params, &mut rng()).unwrap();
        net.update_td(&provider, &vec![1], 0, 0.0, 3.0, 0.0);

        let value = net.evaluate(&provider, &vec![1], 0).unwrap();
        assert!(value > 0.9 && value < 1.0);
    }

    #[test]
    fn test_players_have_independent_tables() {
        let provider = TestProvider {
            cells: 1,
            values: 2,
            mode: Mode::Identity,
        };
        let mut net =
            NTupleNetwork::new(&[vec![0]], 2, &provider, &unit_params(), &mut rng()).unwrap();
        net.update_td(&provider, &vec![1], 0, 0.0, 0.9, 0.0);

        assert!((net.evaluate(&provider, &vec![1], 0).unwrap() - 0.9).abs() < 1e-12);
        assert_eq!(net.evaluate(&provider, &vec![1], 1).unwrap(), 0.0);
    }

    #[test]
    fn test_learning_rate_decays_to_final_value() {
        let provider = TestProvider {
            cells: 1,
            values: 2,
            mode: Mode::Identity,
        };
        let params = TdParams {
            alpha_init: 0.1,
            alpha_final: 0.01,
            planned_episodes: 2,
            ..TdParams::default()
        };
        let mut net = NTupleNetwork::new(&[vec![0]], 1, &provider, &params, &mut rng()).unwrap();
        net.advance_learning_rate();
        net.advance_learning_rate();
        assert!((net.alpha() - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_rejects_zero_players_and_empty_patterns() {
        let provider = TestProvider {
            cells: 1,
            values: 2,
            mode: Mode::Identity,
        };
        let zero_players =
            NTupleNetwork::new(&[vec![0]], 0, &provider, &unit_params(), &mut rng());
        assert!(matches!(
            zero_players,
            Err(TupleNetError::Configuration(_))
        ));
        let no_patterns = NTupleNetwork::new(&[], 1, &provider, &unit_params(), &mut rng());
        assert!(matches!(no_patterns, Err(TupleNetError::Configuration(_))));
    }

    #[test]
    fn test_rejects_params_outside_their_ranges() {
        let provider = TestProvider {
            cells: 1,
            values: 2,
            mode: Mode::Identity,
        };
        let params = TdParams {
            lambda: 1.0,
            ..unit_params()
        };
        let result = NTupleNetwork::new(&[vec![0]], 1, &provider, &params, &mut rng());
        assert!(matches!(result, Err(TupleNetError::Configuration(_))));
    }

    #[test]
    fn test_validate_catches_a_missing_table() {
        let provider = TestProvider {
            cells: 2,
            values: 2,
            mode: Mode::Identity,
        };
        let mut net =
            NTupleNetwork::new(&[vec![0], vec![1]], 2, &provider, &unit_params(), &mut rng())
                .unwrap();
        assert!(net.validate().is_ok());
        net.tuples[1].pop();
        assert!(matches!(
            net.validate(),
            Err(TupleNetError::Configuration(_))
        ));
    }

    #[test]
    fn test_validate_for_rejects_an_encoder_of_the_wrong_shape() {
        let wide = TestProvider {
            cells: 4,
            values: 2,
            mode: Mode::Identity,
        };
        let net = NTupleNetwork::new(&[vec![3]], 1, &wide, &unit_params(), &mut rng()).unwrap();
        assert!(net.validate_for(&wide).is_ok());

        // Board too short for the sampled cell.
        let narrow = TestProvider {
            cells: 2,
            values: 2,
            mode: Mode::Identity,
        };
        assert!(matches!(
            net.validate_for(&narrow),
            Err(TupleNetError::Configuration(_))
        ));

        // Right length, wrong number of position values.
        let more_values = TestProvider {
            cells: 4,
            values: 3,
            mode: Mode::Identity,
        };
        assert!(matches!(
            net.validate_for(&more_values),
            Err(TupleNetError::Configuration(_))
        ));
    }
}
