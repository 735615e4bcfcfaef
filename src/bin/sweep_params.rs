use chrono::Utc;
use clap::Parser;
use flexi_logger::Logger;
use std::error::Error;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use tuplenet::game::tictactoe::{default_patterns, TicTacToe, TicTacToeEncoder};
use tuplenet::training::{run_sweep, SweepConfig, SweepResult, TdParams};

#[derive(Parser, Debug)]
#[command(
    name = "sweep-params",
    about = "Grid search over learning rate and eligibility decay."
)]
struct Args {
    /// Training episodes per grid point
    #[arg(short, long, default_value_t = 2000)]
    episodes: usize,

    /// Greedy evaluation games per grid point
    #[arg(long, default_value_t = 200)]
    eval_episodes: usize,

    /// Base RNG seed (grid point i trains with seed + i)
    #[arg(short, long, default_value_t = 2025)]
    seed: u64,

    /// Comma-separated alpha_init values to try
    #[arg(long, default_value = "0.02,0.05,0.1,0.2")]
    alphas: String,

    /// Comma-separated lambda values to try
    #[arg(long, default_value = "0.0,0.3,0.6,0.9")]
    lambdas: String,

    /// Discount factor shared by every grid point
    #[arg(long, default_value_t = 1.0)]
    gamma: f64,

    /// Squash evaluations into (-1, 1) with tanh
    #[arg(long)]
    tanh_output: bool,

    /// Enable per-weight adaptive step sizes (temporal coherence)
    #[arg(long)]
    temporal_coherence: bool,

    /// Worker threads for the sweep (0 uses all cores)
    #[arg(short, long, default_value_t = 0)]
    workers: usize,

    /// CSV path to append sweep results
    #[arg(long, default_value = "sweep_log.csv")]
    log_path: String,
}

/// Parses a comma-separated list of floats like "0.05,0.1,0.2".
fn parse_list(raw: &str) -> Result<Vec<f64>, Box<dyn Error>> {
    raw.split(',')
        .map(|part| {
            part.trim()
                .parse::<f64>()
                .map_err(|e| format!("Invalid number '{}': {}", part.trim(), e).into())
        })
        .collect()
}

/// Log one grid point to CSV
fn log_to_csv(path: &str, args: &Args, result: &SweepResult) -> Result<(), Box<dyn Error>> {
    let path = Path::new(path);
    let needs_header = !path.exists();

    let mut file = OpenOptions::new().create(true).append(true).open(path)?;

    if needs_header {
        writeln!(
            file,
            "timestamp,episodes,eval_episodes,seed,gamma,alpha,lambda,avg_reward,avg_moves"
        )?;
    }

    writeln!(
        file,
        "{},{},{},{},{:.3},{:.4},{:.3},{:.4},{:.2}",
        Utc::now().format("%Y-%m-%d %H:%M:%S"),
        args.episodes,
        args.eval_episodes,
        args.seed,
        args.gamma,
        result.alpha,
        result.lambda,
        result.avg_reward,
        result.avg_moves
    )?;

    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    Logger::try_with_env_or_str("info")?
        .format(flexi_logger::colored_default_format)
        .start()?;

    log::info!("🔍 Alpha x Lambda Grid Sweep");
    log::info!("============================================");
    log::info!("Episodes per point: {}", args.episodes);
    log::info!("Eval games per point: {}", args.eval_episodes);
    log::info!("Seed: {}", args.seed);
    log::info!("Log file: {}", args.log_path);
    log::info!("");

    if args.episodes == 0 {
        return Err("Episodes must be at least 1.".into());
    }

    let alphas = parse_list(&args.alphas)?;
    let lambdas = parse_list(&args.lambdas)?;
    if alphas.is_empty() || lambdas.is_empty() {
        return Err("Alpha and lambda lists must not be empty.".into());
    }

    if args.workers > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.workers)
            .build_global()?;
        log::info!("Workers: {}", args.workers);
    }

    let base = TdParams {
        gamma: args.gamma,
        squash_output: args.tanh_output,
        temporal_coherence: args.temporal_coherence,
        ..TdParams::default()
    };

    let config = SweepConfig {
        base,
        alphas,
        lambdas,
        episodes: args.episodes,
        eval_episodes: args.eval_episodes,
        seed: args.seed,
    };

    log::info!(
        "Total configurations to test: {}",
        config.alphas.len() * config.lambdas.len()
    );
    log::info!("");

    let start = TicTacToe::new();
    let results = run_sweep(&TicTacToeEncoder, &default_patterns(), 2, &start, &config)?;

    let mut best_reward = f64::NEG_INFINITY;
    let mut best: Option<&SweepResult> = None;

    for (idx, result) in results.iter().enumerate() {
        log::info!(
            "[{}/{}] alpha={:.4}, lambda={:.2}: avg reward {:+.4}, avg moves {:.2}",
            idx + 1,
            results.len(),
            result.alpha,
            result.lambda,
            result.avg_reward,
            result.avg_moves
        );

        if !args.log_path.is_empty() {
            log_to_csv(&args.log_path, &args, result)?;
        }

        if result.avg_reward > best_reward {
            best_reward = result.avg_reward;
            best = Some(result);
        }
    }

    log::info!("");
    log::info!("============================================");
    log::info!("✅ Sweep complete!");
    log::info!("");

    if let Some(result) = best {
        log::info!("🏆 Best Configuration:");
        log::info!("   Alpha: {:.4}", result.alpha);
        log::info!("   Lambda: {:.2}", result.lambda);
        log::info!("   Avg greedy reward: {:+.4}", result.avg_reward);
        log::info!("   Avg moves: {:.2}", result.avg_moves);
    }

    log::info!("");
    log::info!("Results saved to: {}", args.log_path);

    Ok(())
}
