//! Game position with incremental win bookkeeping.
//!
//! `GameState` owns a board plus everything a search needs to query cheaply:
//! whose turn it is, the sorted list of legal cells, and each player's
//! longest run. Applying a move refreshes the run records by scanning
//! outward from the placed cell only, so win detection costs
//! O(max(rows, cols)) per move instead of a full board rescan.

use crate::board::Board;
use crate::cell::Cell;
use crate::error::GameError;
use crate::piece::Piece;
use crate::sequence::{Direction, Sequence};

/// A connect-N position: board, turn, legal moves, and per-piece longest
/// runs.
///
/// Invariants:
/// - the legal-move list is empty as soon as either player's longest run
///   reaches the connect threshold, even if empty cells remain;
/// - a player's longest-run length never decreases as moves are applied;
/// - `turn` names the piece that has not yet moved in this position.
#[derive(Debug, Clone)]
pub struct GameState {
    connect: usize,
    board: Board,
    turn: Piece,
    /// Legal cells in row-major order; kept sorted for binary search.
    allowed: Vec<Cell>,
    longest: [Option<Sequence>; 2],
}

impl GameState {
    /// Build a position from a raw board with a full O(size) scan.
    pub fn new(connect: usize, board: Board, turn: Piece) -> Result<Self, GameError> {
        if connect == 0 {
            return Err(GameError::InvalidConnect);
        }
        let mut state = Self {
            connect,
            board,
            turn,
            allowed: Vec::new(),
            longest: [None, None],
        };
        let sequences = state.all_sequences();
        for piece in Piece::BOTH {
            state.longest[piece.index()] = sequences[piece.index()]
                .iter()
                .copied()
                .max_by_key(|seq| seq.len());
        }
        state.allowed = state.board.empty_cells().collect();
        if state.winner().is_some() {
            state.allowed.clear();
        }
        Ok(state)
    }

    #[inline]
    pub fn connect(&self) -> usize {
        self.connect
    }

    #[inline]
    pub fn board(&self) -> &Board {
        &self.board
    }

    #[inline]
    pub fn turn(&self) -> Piece {
        self.turn
    }

    /// Legal cells in row-major order.
    #[inline]
    pub fn allowed_moves(&self) -> &[Cell] {
        &self.allowed
    }

    #[inline]
    pub fn piece_count(&self) -> usize {
        self.board.piece_count()
    }

    pub fn longest_sequence(&self, piece: Piece) -> Option<&Sequence> {
        self.longest[piece.index()].as_ref()
    }

    /// Length of the piece's longest run; 0 when it has no pieces.
    pub fn longest_len(&self, piece: Piece) -> usize {
        self.longest[piece.index()].map_or(0, |seq| seq.len())
    }

    /// The piece whose longest run is exactly the connect threshold.
    ///
    /// Strict equality: a run that overshoots the threshold in a single
    /// update (a gap join, or a threshold reconfigured against an existing
    /// board) does not count as a win.
    pub fn winner(&self) -> Option<Piece> {
        Piece::BOTH
            .into_iter()
            .find(|piece| self.longest_len(*piece) == self.connect)
    }

    /// No winner and no legal moves remain.
    pub fn is_tie(&self) -> bool {
        self.winner().is_none() && self.allowed.is_empty()
    }

    /// Won or tied. A won position has its move list cleared, so an empty
    /// list is terminal either way.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        self.allowed.is_empty()
    }

    /// Apply a move in place: place the turn's piece, flip the turn, and
    /// refresh the run records around the placed cell.
    pub fn update(&mut self, cell: Cell) -> Result<(), GameError> {
        let mover = self.turn;
        self.board.place(cell, mover)?;
        if let Ok(i) = self.allowed.binary_search(&cell) {
            self.allowed.remove(i);
        }
        self.refresh_longest(cell, mover);
        self.turn = mover.other();
        if self.winner().is_some() {
            self.allowed.clear();
        }
        Ok(())
    }

    /// The position after a move, leaving this one untouched.
    pub fn next(&self, cell: Cell) -> Result<GameState, GameError> {
        let mut state = self.clone();
        state.update(cell)?;
        Ok(state)
    }

    /// A copy with the turn forced. Turn does not affect the move list or
    /// the run records, so no rescan is needed.
    pub fn with_turn(&self, turn: Piece) -> GameState {
        let mut state = self.clone();
        state.turn = turn;
        state
    }

    /// Refresh the per-piece longest-run record after placing `piece` at
    /// `cell`: along each of the four axis families, walk both ways from
    /// the cell until a differing piece or the board edge.
    fn refresh_longest(&mut self, cell: Cell, piece: Piece) {
        for direction in Direction::ALL {
            let (dr, dc) = direction.delta();
            let start = self.run_end(cell, piece, -dr, -dc);
            let end = self.run_end(cell, piece, dr, dc);
            let len = start.row.abs_diff(end.row).max(start.col.abs_diff(end.col)) + 1;
            if len > self.longest_len(piece) {
                self.longest[piece.index()] = Some(Sequence::new(start, end, len));
            }
        }
    }

    /// Last same-piece cell reachable from `from` stepping by (dr, dc).
    fn run_end(&self, from: Cell, piece: Piece, dr: isize, dc: isize) -> Cell {
        let mut cur = from;
        while let Some(next) = cur.offset(dr, dc, self.board.rows(), self.board.cols()) {
            if self.board.get(next) != Some(piece) {
                break;
            }
            cur = next;
        }
        cur
    }

    /// Every maximal run per piece, from a full O(size) rescan.
    ///
    /// Isolated pieces are reported once (by the row scan); the other three
    /// families only report runs of two or more. Not used on the rollout
    /// path.
    pub fn all_sequences(&self) -> [Vec<Sequence>; 2] {
        let rows = self.board.rows();
        let cols = self.board.cols();
        let mut out = [Vec::new(), Vec::new()];

        for row in 0..rows {
            self.scan_line(Cell::new(row, 0), (0, 1), 1, &mut out);
        }
        for col in 0..cols {
            self.scan_line(Cell::new(0, col), (1, 0), 2, &mut out);
        }
        for col in 0..cols {
            self.scan_line(Cell::new(0, col), (1, 1), 2, &mut out);
        }
        for row in 1..rows {
            self.scan_line(Cell::new(row, 0), (1, 1), 2, &mut out);
        }
        for col in 0..cols {
            self.scan_line(Cell::new(0, col), (1, -1), 2, &mut out);
        }
        for row in 1..rows {
            self.scan_line(Cell::new(row, cols - 1), (1, -1), 2, &mut out);
        }

        out
    }

    /// Collect maximal runs of at least `min_len` along one line.
    fn scan_line(
        &self,
        start: Cell,
        (dr, dc): (isize, isize),
        min_len: usize,
        out: &mut [Vec<Sequence>; 2],
    ) {
        let rows = self.board.rows();
        let cols = self.board.cols();
        let mut run: Option<(Piece, Cell, Cell, usize)> = None;
        let mut cur = Some(start);

        while let Some(cell) = cur {
            let slot = self.board.get(cell);
            match (&mut run, slot) {
                (Some((piece, _, end, len)), Some(found)) if *piece == found => {
                    *end = cell;
                    *len += 1;
                }
                (current, slot) => {
                    if let Some((piece, run_start, run_end, len)) = current.take() {
                        if len >= min_len {
                            out[piece.index()].push(Sequence::new(run_start, run_end, len));
                        }
                    }
                    if let Some(found) = slot {
                        *current = Some((found, cell, cell, 1));
                    }
                }
            }
            cur = cell.offset(dr, dc, rows, cols);
        }

        if let Some((piece, run_start, run_end, len)) = run {
            if len >= min_len {
                out[piece.index()].push(Sequence::new(run_start, run_end, len));
            }
        }
    }
}
