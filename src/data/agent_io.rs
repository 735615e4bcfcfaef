//! Agent persistence.
//!
//! A saved agent is one JSON document holding the training parameters, the
//! sampling patterns and the full network. Weight tables round-trip
//! bit-exactly; the dedup bitmaps and the horizon queue are transient and
//! rebuilt on load.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::game::state::GameState;
use crate::game::symmetry::BoardEncoder;
use crate::ntuple::NTupleNetwork;
use crate::training::{TdParams, TdTrainer};
use crate::Result;

/// Everything needed to resume training or evaluate a trained agent.
#[derive(Debug, Serialize, Deserialize)]
pub struct SavedAgent {
    pub params: TdParams,
    /// Sampling patterns, verbatim; weights are meaningless without them.
    pub patterns: Vec<Vec<usize>>,
    /// Episodes trained so far, so schedules resume where they stopped.
    pub episodes: usize,
    pub network: NTupleNetwork,
}

impl SavedAgent {
    /// Snapshot of a trainer's current state.
    pub fn from_trainer<S, E>(trainer: &TdTrainer<S, E>) -> Self
    where
        S: GameState,
        E: BoardEncoder<S>,
    {
        Self {
            params: trainer.params().clone(),
            patterns: trainer
                .network()
                .tuples(0)
                .iter()
                .map(|tuple| tuple.cells().to_vec())
                .collect(),
            episodes: trainer.episodes_done(),
            network: trainer.network().clone(),
        }
    }
}

/// Writes the agent as JSON, creating parent directories as needed.
pub fn save_agent(path: impl AsRef<Path>, agent: &SavedAgent) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, agent)?;
    // BufWriter's Drop swallows write errors.
    writer.flush()?;
    log::info!(
        "agent saved to {} ({} episodes trained)",
        path.display(),
        agent.episodes
    );
    Ok(())
}

/// Reads an agent back, checks its tables and rebuilds transient state.
pub fn load_agent(path: impl AsRef<Path>) -> Result<SavedAgent> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let mut agent: SavedAgent = serde_json::from_reader(BufReader::new(file))?;
    agent.network.validate()?;
    agent.network.restore_transient();
    log::info!(
        "agent loaded from {} ({} table entries)",
        path.display(),
        agent.network.total_weights()
    );
    Ok(agent)
}
