//! Core board and position types for a two-player connect-N game.
//!
//! This crate provides the fundamental game representation:
//! - `Piece`: one of the two players' markers
//! - `Cell` / `Rect`: board coordinates and axis-aligned regions
//! - `Sequence`: a run of same-piece cells with a derived direction
//! - `Board`: a rows x columns grid of optional pieces
//! - `GameState`: board + turn + win bookkeeping, updated incrementally
//!
//! `GameState` is the hot type: a search engine applies millions of moves
//! per decision, so `update` refreshes win detection by scanning outward
//! from the placed cell only, never the whole board.

pub mod board;
pub mod cell;
pub mod error;
pub mod piece;
pub mod sequence;
pub mod state;

// Re-export main types for convenience
pub use board::Board;
pub use cell::{Cell, Rect};
pub use error::GameError;
pub use piece::Piece;
pub use sequence::{Direction, Sequence};
pub use state::GameState;
