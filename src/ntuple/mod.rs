pub mod network;
pub mod tuple;

pub use network::{EquivalentBoards, NTupleNetwork};
pub use tuple::{NTuple, WeightInit};
