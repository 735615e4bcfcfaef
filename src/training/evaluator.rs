//! Greedy-play evaluation of a trained agent.

use crate::game::state::GameState;
use crate::game::symmetry::BoardEncoder;
use crate::scoring::{CombineOp, ScoreTuple};
use crate::training::episode::TdTrainer;
use crate::Result;

/// Aggregate outcome of a batch of greedy evaluation episodes.
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    pub episodes: usize,
    /// Mean cumulative reward per player.
    pub avg_rewards: Vec<f64>,
    pub avg_moves: f64,
    /// Best and worst episode reward from player 0's perspective.
    pub best_reward: f64,
    pub worst_reward: f64,
}

/// Plays `episodes` greedy episodes from `start` and averages the outcomes.
///
/// Exploration and learning stay off; only tie-breaking and environment
/// responses consume randomness.
pub fn evaluate_greedy<S, E>(
    trainer: &mut TdTrainer<S, E>,
    start: &S,
    episodes: usize,
) -> Result<EvaluationReport>
where
    S: GameState,
    E: BoardEncoder<S>,
{
    let num_players = trainer.network().num_players();
    let mut sum = ScoreTuple::new(num_players);
    let mut best = ScoreTuple::new(num_players);
    let mut worst = ScoreTuple::new(num_players);
    let mut total_moves = 0usize;

    for _ in 0..episodes {
        let stats = trainer.play_episode_greedy(start)?;
        sum.combine(&stats.final_rewards, CombineOp::Sum, 0, 0.0);
        best.combine(&stats.final_rewards, CombineOp::Max, 0, 0.0);
        worst.combine(&stats.final_rewards, CombineOp::Min, 0, 0.0);
        total_moves += stats.moves;
    }

    let n = episodes.max(1) as f64;
    Ok(EvaluationReport {
        episodes,
        avg_rewards: sum.values().iter().map(|v| v / n).collect(),
        avg_moves: total_moves as f64 / n,
        best_reward: best.get(0),
        worst_reward: worst.get(0),
    })
}
