use clap::Parser;
use flexi_logger::Logger;
use std::error::Error;

use tuplenet::data::load_agent;
use tuplenet::game::tictactoe::{TicTacToe, TicTacToeEncoder};
use tuplenet::training::{evaluate_greedy, TdTrainer};

#[derive(Parser, Debug)]
#[command(
    name = "eval-agent",
    about = "Evaluate a trained n-tuple agent with greedy play."
)]
struct Args {
    /// Path to the trained agent JSON
    #[arg(short, long, default_value = "agents/tictactoe_td.json")]
    agent_path: String,

    /// Number of evaluation games
    #[arg(short, long, default_value_t = 1000)]
    games: usize,

    /// RNG seed (greedy tie-breaking only)
    #[arg(short, long, default_value_t = 2025)]
    seed: u64,
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    Logger::try_with_env_or_str("info")?
        .format(flexi_logger::colored_default_format)
        .start()?;

    if args.games == 0 {
        return Err("Games must be at least 1.".into());
    }

    let agent = load_agent(&args.agent_path)?;
    log::info!(
        "✅ Agent loaded: {} training episodes, {} tuples per player, {} table entries",
        agent.episodes,
        agent.network.num_tuples(),
        agent.network.total_weights()
    );
    log::info!("📋 Config: {}", agent.params.to_config_string());

    let mut trainer = TdTrainer::<TicTacToe, _>::with_network(
        TicTacToeEncoder,
        agent.network,
        agent.params,
        agent.episodes,
        args.seed,
    )?;

    let start = TicTacToe::new();
    let initial_value = trainer.evaluate_state(&start, 0)?;
    log::info!("Initial board value for player X: {:+.4}", initial_value);

    let report = evaluate_greedy(&mut trainer, &start, args.games)?;

    log::info!("{}", "=".repeat(60));
    log::info!("📊 Greedy evaluation over {} games", report.episodes);
    for (player, avg) in report.avg_rewards.iter().enumerate() {
        log::info!("   Player {}: avg reward {:+.4}", player, avg);
    }
    log::info!("   Avg moves per game: {:.2}", report.avg_moves);
    log::info!(
        "   Player 0 best/worst reward: {:+.1} / {:+.1}",
        report.best_reward,
        report.worst_reward
    );
    log::info!("{}", "=".repeat(60));

    Ok(())
}
