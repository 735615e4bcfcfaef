//! Self-play episode driver.
//!
//! `TdTrainer` owns the value function, the exploration schedule and the
//! per-agent random source, and runs one episode at a time: pick an action
//! (epsilon-greedy), apply it, adapt the mover's previously recorded
//! afterstate toward the new TD target, and after the terminal move adapt
//! every player's last afterstate toward its realized reward.

use std::fmt;
use std::marker::PhantomData;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::game::state::GameState;
use crate::game::symmetry::{BoardEncoder, BoardVector};
use crate::ntuple::NTupleNetwork;
use crate::scoring::{CombineOp, ScoreTuple};
use crate::training::next_state::NextState;
use crate::training::params::TdParams;
use crate::{Result, TupleNetError};

/// Why an episode stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The game reached a terminal state.
    GameOver,
    /// A round ended and the trainer is configured to stop there.
    RoundOver,
    /// The configured move cap cut the episode off; terminal values are
    /// estimates, so terminal adaptation is skipped.
    MoveLimit,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            StopReason::GameOver => "game_over",
            StopReason::RoundOver => "round_over",
            StopReason::MoveLimit => "move_limit",
        };
        write!(f, "{}", name)
    }
}

/// Summary of one played episode.
#[derive(Debug, Clone)]
pub struct EpisodeStats {
    /// Episode index at the time it was played.
    pub episode: usize,
    pub moves: usize,
    pub random_moves: usize,
    /// Exploration rate used for this episode.
    pub epsilon: f64,
    /// Learning rate used for this episode.
    pub alpha: f64,
    /// Cumulative per-player reward over the whole episode.
    pub final_rewards: ScoreTuple,
    pub stop: StopReason,
}

/// Epsilon-greedy TD self-play trainer over one game type.
#[derive(Debug)]
pub struct TdTrainer<S, E> {
    encoder: E,
    network: NTupleNetwork,
    params: TdParams,
    rng: StdRng,
    episodes_done: usize,
    _state: PhantomData<S>,
}

impl<S: GameState, E: BoardEncoder<S>> TdTrainer<S, E> {
    /// Builds a fresh trainer with zero accumulated experience.
    pub fn new(
        encoder: E,
        patterns: &[Vec<usize>],
        num_players: usize,
        params: TdParams,
        seed: u64,
    ) -> Result<Self> {
        let mut rng = StdRng::seed_from_u64(seed);
        let network = NTupleNetwork::new(patterns, num_players, &encoder, &params, &mut rng)?;
        Ok(Self {
            encoder,
            network,
            params,
            rng,
            episodes_done: 0,
            _state: PhantomData,
        })
    }

    /// Resumes a trainer around an existing network, e.g. one loaded from
    /// disk. `episodes_done` keeps the epsilon schedule where it left off.
    pub fn with_network(
        encoder: E,
        network: NTupleNetwork,
        params: TdParams,
        episodes_done: usize,
        seed: u64,
    ) -> Result<Self> {
        params.validate().map_err(TupleNetError::Configuration)?;
        network.validate_for(&encoder)?;
        Ok(Self {
            encoder,
            network,
            params,
            rng: StdRng::seed_from_u64(seed),
            episodes_done,
            _state: PhantomData,
        })
    }

    /// Plays one self-play episode from `start` and updates the value
    /// function along the way.
    pub fn train_episode(&mut self, start: &S) -> Result<EpisodeStats> {
        let episode = self.episodes_done;
        let epsilon = self.params.epsilon_at(episode);
        let alpha = self.network.alpha();
        let num_players = self.network.num_players();
        self.network.clear_horizon_queue();

        let mut state = start.clone();
        while state.nondeterministic_pending() {
            state.advance_nondeterministic(&mut self.rng);
        }

        let mut cumulative = ScoreTuple::new(num_players);
        let mut last_after: Vec<Option<BoardVector>> = vec![None; num_players];
        let mut last_reward = vec![0.0; num_players];
        let mut moves = 0usize;
        let mut random_moves = 0usize;
        let mut final_mover = 0usize;

        let stop = loop {
            if state.is_game_over() {
                break StopReason::GameOver;
            }
            let mover = state.player_to_move();
            let legal = state.legal_actions();
            if legal.is_empty() {
                return Err(TupleNetError::Precondition(format!(
                    "no legal action in a non-terminal state after {} moves",
                    moves
                )));
            }

            let random_move = self.rng.random::<f64>() < epsilon;
            let action = if random_move {
                random_moves += 1;
                legal[self.rng.random_range(0..legal.len())]
            } else {
                self.greedy_action(&state, &legal)?
            };

            let bundle = NextState::apply(&state, action, random_move, &mut self.rng)?;
            cumulative.combine(bundle.rewards(), CombineOp::Sum, 0, 0.0);
            let after_vec = self.encoder.board_vector(bundle.after());

            if !random_move || self.params.learn_from_random {
                if let Some(prev) = &last_after[mover] {
                    let reward_delta = cumulative.get(mover) - last_reward[mover];
                    let old = self.network.evaluate(&self.encoder, prev, mover)?;
                    let target = reward_delta
                        + self.params.gamma
                            * self.network.evaluate(&self.encoder, &after_vec, mover)?;
                    self.network
                        .update_td(&self.encoder, prev, mover, old, target, reward_delta);
                }
            } else if self.params.clear_history_on_random {
                self.network.clear_horizon_queue();
            }

            // The mover's slot moves forward even on exploratory moves, so
            // later targets and the terminal adaptation always refer to the
            // most recent afterstate.
            last_after[mover] = Some(after_vec);
            last_reward[mover] = cumulative.get(mover);
            final_mover = mover;
            moves += 1;

            let round_ended = bundle.round_ended();
            state = bundle.into_next();

            if state.is_game_over() {
                break StopReason::GameOver;
            }
            if round_ended && self.params.stop_on_round_over {
                break StopReason::RoundOver;
            }
            if self.params.max_episode_moves > 0 && moves >= self.params.max_episode_moves {
                break StopReason::MoveLimit;
            }
        };

        if stop != StopReason::MoveLimit && moves > 0 {
            self.terminal_adapt(final_mover, &cumulative, &last_after, &last_reward)?;
        }

        self.network.advance_learning_rate();
        self.episodes_done += 1;

        log::debug!(
            "episode {}: moves={} random={} epsilon={:.4} rewards={:?} stop={}",
            episode,
            moves,
            random_moves,
            epsilon,
            cumulative.values(),
            stop
        );

        Ok(EpisodeStats {
            episode,
            moves,
            random_moves,
            epsilon,
            alpha,
            final_rewards: cumulative,
            stop,
        })
    }

    /// Final weight adjustments once an episode has truly ended: players
    /// other than the terminal mover learn their realized reward since
    /// their last recorded afterstate; the mover's own terminal afterstate
    /// is pulled toward 0 (no further reward follows it), or toward the
    /// full realized reward in ternary mode.
    fn terminal_adapt(
        &mut self,
        final_mover: usize,
        cumulative: &ScoreTuple,
        last_after: &[Option<BoardVector>],
        last_reward: &[f64],
    ) -> Result<()> {
        for player in 0..last_after.len() {
            let Some(vector) = &last_after[player] else {
                continue;
            };
            let target = if player == final_mover {
                if self.params.ternary_targets {
                    cumulative.get(player)
                } else {
                    0.0
                }
            } else {
                cumulative.get(player) - last_reward[player]
            };
            let old = self.network.evaluate(&self.encoder, vector, player)?;
            self.network
                .update_td(&self.encoder, vector, player, old, target, target);
        }
        Ok(())
    }

    /// Highest-scoring action among `legal`, exact-score ties broken
    /// uniformly at random.
    fn greedy_action(&mut self, state: &S, legal: &[usize]) -> Result<usize> {
        let mut best_score = f64::NEG_INFINITY;
        let mut best_actions: Vec<usize> = Vec::new();
        for &action in legal {
            let score = self.action_score(state, action)?;
            if score > best_score {
                best_score = score;
                best_actions.clear();
                best_actions.push(action);
            } else if score == best_score {
                best_actions.push(action);
            }
        }
        Ok(best_actions[self.rng.random_range(0..best_actions.len())])
    }

    /// One-step lookahead score for the mover: immediate reward of the
    /// afterstate plus the discounted afterstate value.
    fn action_score(&self, state: &S, action: usize) -> Result<f64> {
        let mover = state.player_to_move();
        let mut after = state.clone();
        after.advance_deterministic(action);
        let reward = after.reward_tuple(state).get(mover);
        let vector = self.encoder.board_vector(&after);
        let value = self.network.evaluate(&self.encoder, &vector, mover)?;
        Ok(reward + self.params.gamma * value)
    }

    /// Value estimate of `state` from `player`'s perspective.
    pub fn evaluate_state(&self, state: &S, player: usize) -> Result<f64> {
        let vector = self.encoder.board_vector(state);
        self.network.evaluate(&self.encoder, &vector, player)
    }

    /// Score of the best action available to the mover, without playing it.
    pub fn greedy_action_value(&self, state: &S) -> Result<f64> {
        let legal = state.legal_actions();
        if legal.is_empty() {
            return Err(TupleNetError::Precondition(
                "no legal action to score".to_string(),
            ));
        }
        let mut best = f64::NEG_INFINITY;
        for &action in &legal {
            best = best.max(self.action_score(state, action)?);
        }
        Ok(best)
    }

    /// Plays one full episode greedily, without exploration or learning.
    pub fn play_episode_greedy(&mut self, start: &S) -> Result<EpisodeStats> {
        let num_players = self.network.num_players();
        let mut state = start.clone();
        while state.nondeterministic_pending() {
            state.advance_nondeterministic(&mut self.rng);
        }
        let mut cumulative = ScoreTuple::new(num_players);
        let mut moves = 0usize;

        let stop = loop {
            if state.is_game_over() {
                break StopReason::GameOver;
            }
            let legal = state.legal_actions();
            if legal.is_empty() {
                return Err(TupleNetError::Precondition(format!(
                    "no legal action in a non-terminal state after {} moves",
                    moves
                )));
            }
            let action = self.greedy_action(&state, &legal)?;
            let bundle = NextState::apply(&state, action, false, &mut self.rng)?;
            cumulative.combine(bundle.rewards(), CombineOp::Sum, 0, 0.0);
            moves += 1;

            let round_ended = bundle.round_ended();
            state = bundle.into_next();

            if state.is_game_over() {
                break StopReason::GameOver;
            }
            if round_ended && self.params.stop_on_round_over {
                break StopReason::RoundOver;
            }
            if self.params.max_episode_moves > 0 && moves >= self.params.max_episode_moves {
                break StopReason::MoveLimit;
            }
        };

        Ok(EpisodeStats {
            episode: self.episodes_done,
            moves,
            random_moves: 0,
            epsilon: 0.0,
            alpha: self.network.alpha(),
            final_rewards: cumulative,
            stop,
        })
    }

    pub fn network(&self) -> &NTupleNetwork {
        &self.network
    }

    pub fn network_mut(&mut self) -> &mut NTupleNetwork {
        &mut self.network
    }

    pub fn params(&self) -> &TdParams {
        &self.params
    }

    pub fn episodes_done(&self) -> usize {
        self.episodes_done
    }
}
