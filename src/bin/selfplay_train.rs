use clap::Parser;
use flexi_logger::Logger;
use std::error::Error;
use std::fmt;

use tuplenet::data::{save_agent, SavedAgent};
use tuplenet::game::tictactoe::{default_patterns, TicTacToe, TicTacToeEncoder};
use tuplenet::recording::EpisodeCsvWriter;
use tuplenet::training::{evaluate_greedy, EpsilonSchedule, TdParams, TdTrainer};
use tuplenet::WeightInit;

#[derive(clap::ValueEnum, Clone, Debug, PartialEq, Eq)]
pub enum EpsilonScheduleCli {
    Linear,
    Tanh,
}

impl From<EpsilonScheduleCli> for EpsilonSchedule {
    fn from(cli: EpsilonScheduleCli) -> Self {
        match cli {
            EpsilonScheduleCli::Linear => EpsilonSchedule::Linear,
            EpsilonScheduleCli::Tanh => EpsilonSchedule::Tanh,
        }
    }
}

impl fmt::Display for EpsilonScheduleCli {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EpsilonScheduleCli::Linear => write!(f, "linear"),
            EpsilonScheduleCli::Tanh => write!(f, "tanh"),
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "selfplay-train",
    about = "Train an n-tuple TD value function through self-play on tic-tac-toe."
)]
struct Args {
    /// Number of self-play training episodes
    #[arg(short, long, default_value_t = 10_000)]
    episodes: usize,

    /// RNG seed
    #[arg(short, long, default_value_t = 2025)]
    seed: u64,

    /// Initial global learning rate
    #[arg(long, default_value_t = 0.1)]
    alpha_init: f64,

    /// Final global learning rate after all planned episodes
    #[arg(long, default_value_t = 0.01)]
    alpha_final: f64,

    /// Discount factor for TD targets
    #[arg(long, default_value_t = 1.0)]
    gamma: f64,

    /// Eligibility decay (0 disables the horizon queue)
    #[arg(long, default_value_t = 0.0)]
    lambda: f64,

    /// Initial exploration rate
    #[arg(long, default_value_t = 0.3)]
    epsilon_init: f64,

    /// Final exploration rate
    #[arg(long, default_value_t = 0.0)]
    epsilon_final: f64,

    /// Exploration decay shape (linear or tanh)
    #[arg(long, value_enum, default_value = "linear")]
    epsilon_schedule: EpsilonScheduleCli,

    /// Disable symmetry expansion of training boards
    #[arg(long)]
    no_symmetry: bool,

    /// Squash evaluations into (-1, 1) with tanh
    #[arg(long)]
    tanh_output: bool,

    /// Enable per-weight adaptive step sizes (temporal coherence)
    #[arg(long)]
    temporal_coherence: bool,

    /// Spread for uniform random weight initialization (0 keeps zeros)
    #[arg(long, default_value_t = 0.0)]
    init_spread: f64,

    /// Update weights on exploratory moves too
    #[arg(long)]
    learn_from_random: bool,

    /// CSV path for per-episode training stats (empty disables)
    #[arg(long, default_value = "training_log.csv")]
    csv_path: String,

    /// Output path for the trained agent JSON
    #[arg(long, default_value = "agents/tictactoe_td.json")]
    agent_path: String,

    /// Write rotating log files to this directory instead of the console
    #[arg(long, default_value = "")]
    log_dir: String,

    /// Run a greedy evaluation every N episodes (0 disables)
    #[arg(long, default_value_t = 1000)]
    eval_every: usize,

    /// Games per intermediate greedy evaluation
    #[arg(long, default_value_t = 50)]
    eval_episodes: usize,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let _logger = if args.log_dir.is_empty() {
        Logger::try_with_env_or_str("info")?
            .format(flexi_logger::colored_default_format)
            .start()?
    } else {
        tuplenet::logging::setup_file_logging(&args.log_dir)?
    };

    if args.episodes == 0 {
        return Err("Episodes must be at least 1.".into());
    }

    let params = TdParams {
        alpha_init: args.alpha_init,
        alpha_final: args.alpha_final,
        gamma: args.gamma,
        lambda: args.lambda,
        epsilon_init: args.epsilon_init,
        epsilon_final: args.epsilon_final,
        epsilon_schedule: args.epsilon_schedule.clone().into(),
        planned_episodes: args.episodes,
        use_symmetry: !args.no_symmetry,
        squash_output: args.tanh_output,
        temporal_coherence: args.temporal_coherence,
        weight_init: if args.init_spread > 0.0 {
            WeightInit::Uniform {
                spread: args.init_spread,
            }
        } else {
            WeightInit::Zero
        },
        learn_from_random: args.learn_from_random,
        ..TdParams::default()
    };

    log::info!(
        "🎲 Self-play TD training: {} episodes, seed {}, {} epsilon schedule",
        args.episodes,
        args.seed,
        args.epsilon_schedule
    );
    log::info!("📋 Config: {}", params.to_config_string());

    let start = TicTacToe::new();
    let mut trainer = TdTrainer::new(
        TicTacToeEncoder,
        &default_patterns(),
        2,
        params,
        args.seed,
    )?;
    log::info!(
        "✅ Network ready: {} tuples per player, {} table entries total",
        trainer.network().num_tuples(),
        trainer.network().total_weights()
    );

    let mut csv = if args.csv_path.is_empty() {
        None
    } else {
        Some(EpisodeCsvWriter::create(&args.csv_path, 2)?)
    };

    let mut wins = [0usize; 2];
    let mut draws = 0usize;

    for episode in 0..args.episodes {
        let stats = trainer.train_episode(&start)?;

        let reward_x = stats.final_rewards.get(0);
        if reward_x > 0.0 {
            wins[0] += 1;
        } else if reward_x < 0.0 {
            wins[1] += 1;
        } else {
            draws += 1;
        }

        if let Some(writer) = csv.as_mut() {
            writer.append(&stats)?;
        }

        if args.eval_every > 0 && (episode + 1) % args.eval_every == 0 {
            let report = evaluate_greedy(&mut trainer, &start, args.eval_episodes)?;
            log::info!(
                "Episode {:6}/{} | eps={:.3} alpha={:.4} | greedy avg reward {:+.3}, avg moves {:.1}",
                episode + 1,
                args.episodes,
                stats.epsilon,
                stats.alpha,
                report.avg_rewards[0],
                report.avg_moves
            );
        }
    }

    if let Some(writer) = csv.take() {
        writer.close()?;
    }

    log::info!("{}", "=".repeat(60));
    log::info!("📊 Training complete");
    log::info!("   Episodes: {}", args.episodes);
    log::info!(
        "   X wins: {} | O wins: {} | draws: {}",
        wins[0],
        wins[1],
        draws
    );

    let report = evaluate_greedy(&mut trainer, &start, args.eval_episodes.max(100))?;
    log::info!(
        "   Final greedy play: avg reward {:+.3}, avg moves {:.2} over {} games",
        report.avg_rewards[0],
        report.avg_moves,
        report.episodes
    );
    log::info!("{}", "=".repeat(60));

    save_agent(&args.agent_path, &SavedAgent::from_trainer(&trainer))?;
    log::info!("💾 Agent saved to {}", args.agent_path);

    if !args.csv_path.is_empty() {
        log::info!("📈 Per-episode stats in {}", args.csv_path);
    }

    Ok(())
}
