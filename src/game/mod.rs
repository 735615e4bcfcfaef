pub mod state;
pub mod symmetry;
pub mod tictactoe;

pub use state::GameState;
pub use symmetry::{BoardEncoder, BoardVector, SymmetryProvider};
