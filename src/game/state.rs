use rand::rngs::StdRng;

use crate::scoring::ScoreTuple;

/// Rules contract the training loop drives games through.
///
/// Actions are opaque `usize` identifiers; legality, transition effects and
/// rewards live behind this trait so the trainer stays game-agnostic. Moves
/// split into a deterministic part (the player's choice, producing the
/// afterstate) and an optional nondeterministic part (the environment's
/// response).
pub trait GameState: Clone {
    /// Number of players in the game.
    fn num_players(&self) -> usize;

    /// The player whose move it is.
    fn player_to_move(&self) -> usize;

    /// Identifiers of every action legal in this state. Empty only when the
    /// game or the current round is over.
    fn legal_actions(&self) -> Vec<usize>;

    /// Applies the deterministic part of `action`, producing the afterstate.
    fn advance_deterministic(&mut self, action: usize);

    /// Resolves one pending environment response (dice roll, tile draw).
    /// Games without chance events keep the default no-op.
    fn advance_nondeterministic(&mut self, _rng: &mut StdRng) {}

    /// True while the environment still owes a nondeterministic response.
    fn nondeterministic_pending(&self) -> bool {
        false
    }

    /// True once the game has ended.
    fn is_game_over(&self) -> bool;

    /// True at the boundary between rounds of a multi-round game. Single
    /// round games never report it.
    fn is_round_over(&self) -> bool {
        false
    }

    /// Re-initializes the board for the next round. Move counters and
    /// cumulative rewards must survive the transition.
    fn start_next_round(&mut self) {}

    /// Moves played since the initial state.
    fn move_count(&self) -> usize;

    /// Cumulative reward per player accrued between `reference` and `self`.
    fn reward_tuple(&self, reference: &Self) -> ScoreTuple;
}
