pub mod score_tuple;

pub use score_tuple::{CombineOp, ScoreTuple};
