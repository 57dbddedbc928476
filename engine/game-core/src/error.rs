//! Error types for board and position operations.

use crate::cell::Cell;
use thiserror::Error;

/// Errors from board construction and move application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum GameError {
    /// Construction with an empty board axis. Fails fast; nothing else
    /// validates dimensions afterward.
    #[error("board dimensions must be positive, got {rows}x{cols}")]
    InvalidDimensions { rows: usize, cols: usize },

    /// Construction with a connect threshold of zero.
    #[error("connect threshold must be positive")]
    InvalidConnect,

    #[error("cell {0} is outside the board")]
    OutOfBounds(Cell),

    /// Placing on an occupied cell. Fatal to the caller; moves are never
    /// retried internally.
    #[error("cell {0} is already occupied")]
    CellOccupied(Cell),
}
