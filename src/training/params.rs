//! TD Training Hyperparameters
//!
//! This module defines all tunable hyperparameters for n-tuple TD self-play
//! training: learning-rate and exploration schedules, the eligibility
//! horizon, temporal coherence and the episode-control switches.

use serde::{Deserialize, Serialize};

use crate::ntuple::WeightInit;

/// Exploration-rate decay shape over the planned training run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpsilonSchedule {
    /// Straight line from `epsilon_init` to `epsilon_final`.
    Linear,
    /// Smooth S-curve: slow decay at both ends, fast in the middle.
    Tanh,
}

/// TD training hyperparameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TdParams {
    // ========== Learning Rate ==========
    /// Global step size at episode 0
    /// Default: 0.1
    pub alpha_init: f64,

    /// Global step size after `planned_episodes` episodes; reached via
    /// exponential decay, one decay step per episode
    /// Default: 0.01
    pub alpha_final: f64,

    // ========== TD Targets ==========
    /// Discount applied to the next afterstate value in the TD target
    /// Default: 1.0
    pub gamma: f64,

    /// Eligibility decay. 0.0 disables the horizon queue beyond the
    /// current move
    /// Default: 0.0
    pub lambda: f64,

    /// Contribution cutoff deciding how many past moves the horizon
    /// queue keeps: lambda^horizon stays above this
    /// Default: 0.01
    pub horizon_cutoff: f64,

    // ========== Exploration ==========
    /// Random-move probability at episode 0
    /// Default: 0.3
    pub epsilon_init: f64,

    /// Random-move probability after `planned_episodes` episodes
    /// Default: 0.0
    pub epsilon_final: f64,

    /// Decay shape between the two epsilons
    /// Default: Linear
    pub epsilon_schedule: EpsilonSchedule,

    /// Length of the planned training run, in episodes; drives both the
    /// alpha and the epsilon schedules
    /// Default: 10000
    pub planned_episodes: usize,

    // ========== Value Function ==========
    /// Evaluate and update over the full equivalent-board set instead of
    /// the identity vector only
    /// Default: true
    pub use_symmetry: bool,

    /// Squash evaluations into (-1, 1) with tanh
    /// Default: false
    pub squash_output: bool,

    /// Per-index adaptive step sizes (temporal coherence)
    /// Default: false
    pub temporal_coherence: bool,

    /// Initial value of both temporal-coherence accumulators
    /// Default: 0.001
    pub tc_init: f64,

    /// Weight-table initialization
    /// Default: Zero
    pub weight_init: WeightInit,

    // ========== Episode Control ==========
    /// Run the TD update for moves picked by exploration too
    /// Default: false
    pub learn_from_random: bool,

    /// Clear the horizon queue after every exploratory move, so stale
    /// eligibility does not leak across the exploration break
    /// Default: true
    pub clear_history_on_random: bool,

    /// Stop episodes at round boundaries instead of playing all rounds
    /// Default: false
    pub stop_on_round_over: bool,

    /// Hard per-episode move cap; 0 means unbounded. Episodes cut off by
    /// the cap skip terminal adaptation
    /// Default: 0
    pub max_episode_moves: usize,

    /// Terminal adaptation targets the mover's realized cumulative reward
    /// instead of 0
    /// Default: false
    pub ternary_targets: bool,
}

impl Default for TdParams {
    fn default() -> Self {
        Self {
            // Learning rate
            alpha_init: 0.1,
            alpha_final: 0.01,

            // TD targets
            gamma: 1.0,
            lambda: 0.0,
            horizon_cutoff: 0.01,

            // Exploration
            epsilon_init: 0.3,
            epsilon_final: 0.0,
            epsilon_schedule: EpsilonSchedule::Linear,
            planned_episodes: 10_000,

            // Value function
            use_symmetry: true,
            squash_output: false,
            temporal_coherence: false,
            tc_init: 0.001,
            weight_init: WeightInit::Zero,

            // Episode control
            learn_from_random: false,
            clear_history_on_random: true,
            stop_on_round_over: false,
            max_episode_moves: 0,
            ternary_targets: false,
        }
    }
}

impl TdParams {
    /// Exploration rate for the given episode number.
    pub fn epsilon_at(&self, episode: usize) -> f64 {
        let progress = if self.planned_episodes == 0 {
            1.0
        } else {
            (episode as f64 / self.planned_episodes as f64).min(1.0)
        };
        let blend = match self.epsilon_schedule {
            EpsilonSchedule::Linear => progress,
            EpsilonSchedule::Tanh => 0.5 * (1.0 + (4.0 * (progress - 0.5)).tanh()),
        };
        self.epsilon_init + blend * (self.epsilon_final - self.epsilon_init)
    }

    /// Per-episode multiplicative factor taking alpha from `alpha_init` to
    /// `alpha_final` over `planned_episodes` episodes.
    pub fn alpha_decay_ratio(&self) -> f64 {
        if self.planned_episodes == 0 || self.alpha_init == self.alpha_final {
            1.0
        } else {
            (self.alpha_final / self.alpha_init).powf(1.0 / self.planned_episodes as f64)
        }
    }

    /// Validate parameter ranges before building an agent
    pub fn validate(&self) -> Result<(), String> {
        if self.alpha_init <= 0.0 || self.alpha_final <= 0.0 {
            return Err(format!(
                "alpha must be positive, got init={} final={}",
                self.alpha_init, self.alpha_final
            ));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(format!("gamma must be in [0, 1], got {}", self.gamma));
        }
        if !(0.0..1.0).contains(&self.lambda) {
            return Err(format!("lambda must be in [0, 1), got {}", self.lambda));
        }
        if self.horizon_cutoff <= 0.0 || self.horizon_cutoff >= 1.0 {
            return Err(format!(
                "horizon_cutoff must be in (0, 1), got {}",
                self.horizon_cutoff
            ));
        }
        if !(0.0..=1.0).contains(&self.epsilon_init) || !(0.0..=1.0).contains(&self.epsilon_final) {
            return Err(format!(
                "epsilon must be in [0, 1], got init={} final={}",
                self.epsilon_init, self.epsilon_final
            ));
        }
        if self.tc_init <= 0.0 {
            return Err(format!("tc_init must be positive, got {}", self.tc_init));
        }
        Ok(())
    }

    /// Create a configuration string for logging
    pub fn to_config_string(&self) -> String {
        format!(
            "alpha[{:.3}->{:.3}]_gamma[{:.2}]_lambda[{:.2}]_eps[{:.2}->{:.2},{}]_sym[{}]_tc[{}]_squash[{}]",
            self.alpha_init,
            self.alpha_final,
            self.gamma,
            self.lambda,
            self.epsilon_init,
            self.epsilon_final,
            match self.epsilon_schedule {
                EpsilonSchedule::Linear => "linear",
                EpsilonSchedule::Tanh => "tanh",
            },
            self.use_symmetry as u8,
            self.temporal_coherence as u8,
            self.squash_output as u8
        )
    }
}
