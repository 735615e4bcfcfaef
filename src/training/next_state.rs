//! Move application bundle.
//!
//! `NextState` captures everything one move produces: the afterstate (the
//! deterministic part only), the fully resolved successor state, the reward
//! delta and whether a round boundary was crossed. The trainer consumes
//! these instead of touching game rules directly.

use rand::rngs::StdRng;

use crate::game::state::GameState;
use crate::scoring::ScoreTuple;
use crate::{Result, TupleNetError};

/// Result of applying one action to a game state.
#[derive(Debug, Clone)]
pub struct NextState<S> {
    original: S,
    after: S,
    next: S,
    rewards: ScoreTuple,
    random_move: bool,
    round_ended: bool,
}

impl<S: GameState> NextState<S> {
    /// Applies `action` to a copy of `state`.
    ///
    /// The afterstate is snapshotted before any pending environment
    /// responses resolve. When the move closes a round without ending the
    /// game, the next round is started and the crossing is flagged; reward
    /// deltas survive the transition because `start_next_round` preserves
    /// cumulative scores.
    ///
    /// Calling this on a terminal state is an upstream defect and fails
    /// with a precondition error rather than guessing.
    pub fn apply(state: &S, action: usize, random_move: bool, rng: &mut StdRng) -> Result<Self> {
        if state.is_game_over() {
            return Err(TupleNetError::Precondition(
                "move applied to a terminal state".to_string(),
            ));
        }
        let original = state.clone();

        let mut after = state.clone();
        after.advance_deterministic(action);

        let mut next = after.clone();
        while next.nondeterministic_pending() {
            next.advance_nondeterministic(rng);
        }

        let mut round_ended = false;
        if next.is_round_over() && !next.is_game_over() {
            next.start_next_round();
            round_ended = true;
        }
        let rewards = next.reward_tuple(&original);

        Ok(Self {
            original,
            after,
            next,
            rewards,
            random_move,
            round_ended,
        })
    }

    /// The state the move was applied to.
    pub fn original(&self) -> &S {
        &self.original
    }

    /// State after the deterministic part of the move only.
    pub fn after(&self) -> &S {
        &self.after
    }

    /// Fully resolved successor state.
    pub fn next(&self) -> &S {
        &self.next
    }

    /// Per-player reward accrued by this move.
    pub fn rewards(&self) -> &ScoreTuple {
        &self.rewards
    }

    /// True when the action came from exploration.
    pub fn was_random(&self) -> bool {
        self.random_move
    }

    /// True when the move closed a round without ending the game.
    pub fn round_ended(&self) -> bool {
        self.round_ended
    }

    pub fn into_next(self) -> S {
        self.next
    }
}
