//! One-move tactics: win now, block now, else extend.

use game_core::{Cell, Direction, GameState, Piece};
use rand_chacha::ChaCha20Rng;
use tracing::trace;

use crate::{AdjacentMover, MoveSource};

/// The tactical advisor: guaranteed to return an immediate winning move
/// when one exists, else a move blocking the opponent's immediate win when
/// one exists, else a heuristic move (extend the longest extendable own
/// run, then contact play, then uniform random).
#[derive(Debug, Clone, Copy, Default)]
pub struct TacticalMover;

impl TacticalMover {
    /// A cell that wins the game for the side to move, when one exists.
    ///
    /// Candidates are limited to cells touching one of the mover's pieces:
    /// with a threshold of at least two, a winning cell always extends or
    /// joins an existing run.
    pub fn immediate_win(state: &GameState) -> Option<Cell> {
        let mover = state.turn();
        if state.connect() == 1 {
            return state.allowed_moves().first().copied();
        }
        for &cell in state.allowed_moves() {
            if !touches_piece(state, cell, mover) {
                continue;
            }
            match state.next(cell) {
                Ok(next) if next.winner() == Some(mover) => return Some(cell),
                _ => {}
            }
        }
        None
    }

    /// The cell the opponent would win with if it were their turn; playing
    /// it blocks them.
    pub fn immediate_block(state: &GameState) -> Option<Cell> {
        let forced = state.with_turn(state.turn().other());
        Self::immediate_win(&forced)
    }

    /// Extend the longest own run that still has an empty cell past either
    /// endpoint. Length-1 runs are aligned with every direction, so a lone
    /// piece is extended whichever way is free.
    fn extend_longest_run(&self, state: &GameState) -> Option<Cell> {
        let mover = state.turn();
        let board = state.board();
        let mut all = state.all_sequences();
        let mut runs = std::mem::take(&mut all[mover.index()]);
        runs.sort_by(|a, b| b.len().cmp(&a.len()));

        for run in runs {
            for direction in Direction::ALL {
                if !run.has_direction(direction) {
                    continue;
                }
                let (dr, dc) = direction.delta();
                let candidates = [
                    run.start().offset(-dr, -dc, board.rows(), board.cols()),
                    run.end().offset(dr, dc, board.rows(), board.cols()),
                ];
                for cell in candidates.into_iter().flatten() {
                    if board.get(cell).is_none() {
                        return Some(cell);
                    }
                }
            }
        }
        None
    }
}

fn touches_piece(state: &GameState, cell: Cell, piece: Piece) -> bool {
    let board = state.board();
    for dr in -1..=1isize {
        for dc in -1..=1isize {
            if dr == 0 && dc == 0 {
                continue;
            }
            if let Some(neighbor) = cell.offset(dr, dc, board.rows(), board.cols()) {
                if board.get(neighbor) == Some(piece) {
                    return true;
                }
            }
        }
    }
    false
}

impl MoveSource for TacticalMover {
    fn propose(
        &self,
        state: &GameState,
        last_move: Option<Cell>,
        rng: &mut ChaCha20Rng,
    ) -> Option<Cell> {
        if state.allowed_moves().is_empty() {
            return None;
        }
        if let Some(cell) = Self::immediate_win(state) {
            trace!(%cell, "tactical: winning move");
            return Some(cell);
        }
        if let Some(cell) = Self::immediate_block(state) {
            trace!(%cell, "tactical: blocking move");
            return Some(cell);
        }
        if let Some(cell) = self.extend_longest_run(state) {
            return Some(cell);
        }
        AdjacentMover.propose(state, last_move, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use game_core::Board;
    use rand::SeedableRng;

    fn state_after(moves: &[(usize, usize)]) -> GameState {
        let mut state = GameState::new(3, Board::new(3, 3).unwrap(), Piece::One).unwrap();
        for &(row, col) in moves {
            state.update(Cell::new(row, col)).unwrap();
        }
        state
    }

    #[test]
    fn test_takes_the_win() {
        // X X _ / O O _ / _ _ _, X to move: (0,2) wins
        let state = state_after(&[(0, 0), (1, 0), (0, 1), (1, 1)]);
        assert_eq!(state.turn(), Piece::One);
        assert_eq!(TacticalMover::immediate_win(&state), Some(Cell::new(0, 2)));

        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(
            TacticalMover.propose(&state, None, &mut rng),
            Some(Cell::new(0, 2))
        );
    }

    #[test]
    fn test_win_beats_block() {
        // Both sides threaten; the win is taken, not the block
        // X X _ / O O _ / _ _ _, X to move
        let state = state_after(&[(0, 0), (1, 0), (0, 1), (1, 1)]);
        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(
            TacticalMover.propose(&state, None, &mut rng),
            Some(Cell::new(0, 2))
        );
    }

    #[test]
    fn test_blocks_opponent_threat() {
        // X _ _ / O O _ / X _ _, X has no win, O threatens (1,2)
        let state = state_after(&[(0, 0), (1, 0), (2, 0), (1, 1)]);
        assert_eq!(state.turn(), Piece::One);
        assert_eq!(TacticalMover::immediate_win(&state), None);

        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(
            TacticalMover.propose(&state, None, &mut rng),
            Some(Cell::new(1, 2))
        );
    }

    #[test]
    fn test_diagonal_win_detected() {
        // X at (0,0) and (1,1); O elsewhere; X to move wins at (2,2)
        let state = state_after(&[(0, 0), (0, 1), (1, 1), (0, 2)]);
        assert_eq!(TacticalMover::immediate_win(&state), Some(Cell::new(2, 2)));
    }

    #[test]
    fn test_heuristic_extends_own_run() {
        // No threats anywhere; the mover extends its lone piece
        let mut state = GameState::new(4, Board::new(7, 7).unwrap(), Piece::One).unwrap();
        state.update(Cell::new(3, 3)).unwrap(); // X
        state.update(Cell::new(0, 6)).unwrap(); // O far away

        let mut rng = ChaCha20Rng::seed_from_u64(1);
        let cell = TacticalMover.propose(&state, None, &mut rng).unwrap();
        // Must touch the existing X at (3,3)
        assert!(cell.row.abs_diff(3) <= 1 && cell.col.abs_diff(3) <= 1);
    }

    #[test]
    fn test_exhausted_position_returns_none() {
        let mut board = Board::new(1, 1).unwrap();
        board.place(Cell::new(0, 0), Piece::One).unwrap();
        let state = GameState::new(2, board, Piece::Two).unwrap();

        let mut rng = ChaCha20Rng::seed_from_u64(1);
        assert_eq!(TacticalMover.propose(&state, None, &mut rng), None);
    }
}
