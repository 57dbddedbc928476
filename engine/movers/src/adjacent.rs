//! Move source biased toward contact with existing pieces.

use game_core::{Board, Cell, GameState};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;

use crate::MoveSource;

/// Picks uniformly among legal cells that touch an occupied cell in the
/// 8-neighborhood; on an empty board, any legal cell.
///
/// Cheap contact bias for playouts: on large boards a uniform-random
/// playout scatters pieces too thinly to ever produce runs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjacentMover;

/// Whether any 8-neighbor of `cell` is occupied.
pub(crate) fn touches_occupied(board: &Board, cell: Cell) -> bool {
    for dr in -1..=1isize {
        for dc in -1..=1isize {
            if dr == 0 && dc == 0 {
                continue;
            }
            if let Some(neighbor) = cell.offset(dr, dc, board.rows(), board.cols()) {
                if board.get(neighbor).is_some() {
                    return true;
                }
            }
        }
    }
    false
}

impl MoveSource for AdjacentMover {
    fn propose(
        &self,
        state: &GameState,
        _last_move: Option<Cell>,
        rng: &mut ChaCha20Rng,
    ) -> Option<Cell> {
        let contact: Vec<Cell> = state
            .allowed_moves()
            .iter()
            .copied()
            .filter(|&cell| touches_occupied(state.board(), cell))
            .collect();
        if let Some(&cell) = contact.choose(rng) {
            return Some(cell);
        }
        state.allowed_moves().choose(rng).copied()
    }
}
