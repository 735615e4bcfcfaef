pub mod episode;
pub mod evaluator;
pub mod next_state;
pub mod params;
pub mod sweep;

pub use episode::{EpisodeStats, StopReason, TdTrainer};
pub use evaluator::{evaluate_greedy, EvaluationReport};
pub use next_state::NextState;
pub use params::{EpsilonSchedule, TdParams};
pub use sweep::{run_sweep, SweepConfig, SweepResult};
