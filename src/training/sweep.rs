//! Parallel hyperparameter grid sweeps.
//!
//! Training runs are independent, so the alpha x lambda grid is spread
//! across a rayon pool, each point with a private trainer and a derived
//! seed. Within one run a single thread owns the weight tables.

use rayon::prelude::*;

use crate::game::state::GameState;
use crate::game::symmetry::BoardEncoder;
use crate::training::episode::TdTrainer;
use crate::training::evaluator::evaluate_greedy;
use crate::training::params::TdParams;
use crate::Result;

/// Grid description for one sweep.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Parameters shared by every grid point.
    pub base: TdParams,
    /// Values tried for `alpha_init`; `alpha_final` keeps the base decay
    /// ratio.
    pub alphas: Vec<f64>,
    /// Values tried for `lambda`.
    pub lambdas: Vec<f64>,
    /// Training episodes per grid point; also becomes `planned_episodes`
    /// so the schedules complete within the sweep.
    pub episodes: usize,
    /// Greedy evaluation episodes per grid point.
    pub eval_episodes: usize,
    /// Base seed; grid point `i` trains with `seed + i`.
    pub seed: u64,
}

/// Outcome of one grid point, in grid order.
#[derive(Debug, Clone, PartialEq)]
pub struct SweepResult {
    pub alpha: f64,
    pub lambda: f64,
    /// Mean greedy-play reward for player 0.
    pub avg_reward: f64,
    pub avg_moves: f64,
}

/// Trains and evaluates every alpha x lambda combination in parallel.
pub fn run_sweep<S, E>(
    encoder: &E,
    patterns: &[Vec<usize>],
    num_players: usize,
    start: &S,
    config: &SweepConfig,
) -> Result<Vec<SweepResult>>
where
    S: GameState + Send + Sync,
    E: BoardEncoder<S> + Clone + Send + Sync,
{
    let decay = config.base.alpha_final / config.base.alpha_init;
    let mut grid = Vec::new();
    for &alpha in &config.alphas {
        for &lambda in &config.lambdas {
            grid.push((grid.len() as u64, alpha, lambda));
        }
    }
    log::info!(
        "sweep: {} grid points, {} episodes each",
        grid.len(),
        config.episodes
    );

    grid.par_iter()
        .map(|&(index, alpha, lambda)| {
            let params = TdParams {
                alpha_init: alpha,
                alpha_final: alpha * decay,
                lambda,
                planned_episodes: config.episodes,
                ..config.base.clone()
            };
            let mut trainer = TdTrainer::new(
                encoder.clone(),
                patterns,
                num_players,
                params,
                config.seed + index,
            )?;
            for _ in 0..config.episodes {
                trainer.train_episode(start)?;
            }
            let report = evaluate_greedy(&mut trainer, start, config.eval_episodes)?;
            log::info!(
                "sweep point alpha={:.4} lambda={:.2}: avg_reward={:.4} avg_moves={:.2}",
                alpha,
                lambda,
                report.avg_rewards.first().copied().unwrap_or(0.0),
                report.avg_moves
            );
            Ok(SweepResult {
                alpha,
                lambda,
                avg_reward: report.avg_rewards.first().copied().unwrap_or(0.0),
                avg_moves: report.avg_moves,
            })
        })
        .collect()
}
