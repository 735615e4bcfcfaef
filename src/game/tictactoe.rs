//! 3x3 tic-tac-toe, the built-in reference game.
//!
//! Small enough that line-based n-tuples plus the full-board tuple make the
//! value function effectively tabular, which keeps training runs short and
//! outcomes easy to verify by hand.

use crate::game::state::GameState;
use crate::game::symmetry::{BoardEncoder, BoardVector, SymmetryProvider};
use crate::scoring::ScoreTuple;

const EMPTY: u8 = 0;

/// The eight winning lines, row-major cell indices.
const LINES: [[usize; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

/// Cell permutations for the 8 symmetries of the square, identity first.
/// `transformed[i] = board[SYMMETRY_MAPS[s][i]]`.
const SYMMETRY_MAPS: [[usize; 9]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8], // identity
    [6, 3, 0, 7, 4, 1, 8, 5, 2], // rotate 90 clockwise
    [8, 7, 6, 5, 4, 3, 2, 1, 0], // rotate 180
    [2, 5, 8, 1, 4, 7, 0, 3, 6], // rotate 270 clockwise
    [6, 7, 8, 3, 4, 5, 0, 1, 2], // mirror across the horizontal axis
    [2, 1, 0, 5, 4, 3, 8, 7, 6], // mirror across the vertical axis
    [0, 3, 6, 1, 4, 7, 2, 5, 8], // transpose (main diagonal)
    [8, 5, 2, 7, 4, 1, 6, 3, 0], // anti-diagonal
];

/// Where each original cell lands under the matching symmetry. These are the
/// inverse permutations of `SYMMETRY_MAPS` (rotations 90/270 swap, the rest
/// are self-inverse).
const ACTION_MAPS: [[usize; 9]; 8] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8],
    [2, 5, 8, 1, 4, 7, 0, 3, 6],
    [8, 7, 6, 5, 4, 3, 2, 1, 0],
    [6, 3, 0, 7, 4, 1, 8, 5, 2],
    [6, 7, 8, 3, 4, 5, 0, 1, 2],
    [2, 1, 0, 5, 4, 3, 8, 7, 6],
    [0, 3, 6, 1, 4, 7, 2, 5, 8],
    [8, 5, 2, 7, 4, 1, 6, 3, 0],
];

/// Tic-tac-toe position. Cells hold 0 (empty), 1 (X, player 0, moves first)
/// or 2 (O, player 1); actions are the 9 cell indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicTacToe {
    cells: [u8; 9],
    to_move: usize,
    moves: usize,
}

impl TicTacToe {
    pub fn new() -> Self {
        Self {
            cells: [EMPTY; 9],
            to_move: 0,
            moves: 0,
        }
    }

    /// The winning player, if any line is complete.
    pub fn winner(&self) -> Option<usize> {
        for line in &LINES {
            let mark = self.cells[line[0]];
            if mark != EMPTY && self.cells[line[1]] == mark && self.cells[line[2]] == mark {
                return Some(mark as usize - 1);
            }
        }
        None
    }

    fn outcome(&self) -> [f64; 2] {
        match self.winner() {
            Some(0) => [1.0, -1.0],
            Some(_) => [-1.0, 1.0],
            None => [0.0, 0.0],
        }
    }
}

impl Default for TicTacToe {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState for TicTacToe {
    fn num_players(&self) -> usize {
        2
    }

    fn player_to_move(&self) -> usize {
        self.to_move
    }

    fn legal_actions(&self) -> Vec<usize> {
        if self.is_game_over() {
            return Vec::new();
        }
        (0..9).filter(|&i| self.cells[i] == EMPTY).collect()
    }

    fn advance_deterministic(&mut self, action: usize) {
        debug_assert_eq!(self.cells[action], EMPTY, "cell {} already taken", action);
        self.cells[action] = self.to_move as u8 + 1;
        self.to_move = 1 - self.to_move;
        self.moves += 1;
    }

    fn is_game_over(&self) -> bool {
        self.winner().is_some() || self.cells.iter().all(|&c| c != EMPTY)
    }

    fn move_count(&self) -> usize {
        self.moves
    }

    fn reward_tuple(&self, reference: &Self) -> ScoreTuple {
        let now = self.outcome();
        let before = reference.outcome();
        ScoreTuple::from_values(vec![now[0] - before[0], now[1] - before[1]])
    }
}

/// Encoder exposing the full symmetry group of the square.
#[derive(Debug, Clone, Copy, Default)]
pub struct TicTacToeEncoder;

impl SymmetryProvider for TicTacToeEncoder {
    fn num_cells(&self) -> usize {
        9
    }

    fn num_position_values(&self) -> usize {
        3
    }

    fn symmetry_vectors(&self, board: &BoardVector) -> Vec<BoardVector> {
        SYMMETRY_MAPS
            .iter()
            .map(|map| map.iter().map(|&src| board[src]).collect())
            .collect()
    }
}

impl BoardEncoder<TicTacToe> for TicTacToeEncoder {
    fn board_vector(&self, state: &TicTacToe) -> BoardVector {
        state.cells.iter().map(|&c| c as usize).collect()
    }

    fn symmetry_actions(&self, action: usize) -> Vec<usize> {
        ACTION_MAPS.iter().map(|map| map[action]).collect()
    }
}

/// Default sampling patterns: the eight winning lines plus one tuple over
/// the whole board (3^9 entries, so the ensemble is exact on tic-tac-toe).
pub fn default_patterns() -> Vec<Vec<usize>> {
    let mut patterns: Vec<Vec<usize>> = LINES.iter().map(|l| l.to_vec()).collect();
    patterns.push((0..9).collect());
    patterns
}
