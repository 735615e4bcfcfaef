/// Raw board representation: one position value per cell, each in
/// `0..num_position_values`.
pub type BoardVector = Vec<usize>;

/// Enumerates the board vectors equivalent to a given one under the game's
/// symmetry group.
pub trait SymmetryProvider {
    /// Number of cells in a board vector.
    fn num_cells(&self) -> usize;

    /// Number of distinct values a single cell can hold.
    fn num_position_values(&self) -> usize;

    /// All vectors equivalent to `board`, the untransformed one first.
    /// A game without exploitable symmetries returns just the identity.
    fn symmetry_vectors(&self, board: &BoardVector) -> Vec<BoardVector>;
}

/// Maps game states onto board vectors, plus the action counterpart of
/// `symmetry_vectors`.
pub trait BoardEncoder<S>: SymmetryProvider {
    /// Flattens a state into the vector form the lookup tables index.
    fn board_vector(&self, state: &S) -> BoardVector;

    /// The image of `action` under each symmetry, in the same order as
    /// `symmetry_vectors`. Default: identity only.
    fn symmetry_actions(&self, action: usize) -> Vec<usize> {
        vec![action]
    }
}
