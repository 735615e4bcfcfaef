//! # TupleNet
//!
//! An n-tuple network value function with temporal-difference self-play
//! training for board games.
//!
//! ## Features
//!
//! - **N-Tuple Lookup Tables**: Mixed-radix indexed weight tables over fixed
//!   cell sampling patterns, with optional temporal-coherence step sizes
//! - **Value Function**: Per-player n-tuple ensembles with symmetry-aware
//!   evaluation and a bounded eligibility-horizon TD(lambda) update
//! - **Training System**: Epsilon-greedy self-play episode driver with
//!   afterstate bookkeeping and terminal adaptation
//! - **Recording**: Per-episode CSV logs and JSON agent persistence
//!
//! ## Usage
//!
//! ```rust
//! use tuplenet::{
//!     game::tictactoe::{TicTacToe, TicTacToeEncoder},
//!     training::{TdParams, TdTrainer},
//! };
//! ```

// ============================================================================
// PUBLIC API MODULES
// ============================================================================

/// Game-state and symmetry abstractions plus the reference game
pub mod game;

/// N-tuple lookup tables and the ensemble value function
pub mod ntuple;

/// Per-player reward/value tuples
pub mod scoring;

/// Self-play TD training: parameters, episode driver, evaluation, sweeps
pub mod training;

/// Agent persistence
pub mod data;

/// Per-episode CSV recording
pub mod recording;

/// File logging setup
pub mod logging;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

/// Core value-function types
pub use ntuple::{NTuple, NTupleNetwork, WeightInit};

/// Training capabilities
pub use training::{EpisodeStats, StopReason, TdParams, TdTrainer};

/// Reward tuples
pub use scoring::{CombineOp, ScoreTuple};

// ============================================================================
// ERROR TYPES
// ============================================================================

/// Main error type for the TupleNet library
#[derive(Debug, thiserror::Error)]
pub enum TupleNetError {
    /// Invalid cell index, position-value count, table size or parameter set.
    /// Fatal at construction; the agent must not be created.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A non-finite evaluation result. Training must stop rather than
    /// continue with corrupted weights.
    #[error("Numeric divergence: {0}")]
    NumericDivergence(String),

    /// An upstream defect in the game-rule collaborator, e.g. a transition
    /// requested from a terminal state or zero legal actions off-terminal.
    #[error("Precondition violation: {0}")]
    Precondition(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, TupleNetError>;

// ============================================================================
// LIBRARY VERSION INFO
// ============================================================================

/// Library version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");

/// Library description
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
