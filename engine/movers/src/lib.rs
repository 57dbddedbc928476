//! Move sources for connect-N play.
//!
//! A move source proposes one legal cell for the side to move. The search
//! engine stays agnostic of which concrete strategy it is calling; the
//! variants here form a closed set behind one trait:
//!
//! - [`RandomMover`]: uniform-random legal cell
//! - [`AdjacentMover`]: random legal cell next to an occupied one
//! - [`TacticalMover`]: immediate win, else immediate block, else heuristic
//!
//! Randomness is threaded explicitly as a `ChaCha20Rng` so that seeded
//! simulations and tests stay deterministic.

pub mod adjacent;
pub mod random;
pub mod tactical;

pub use adjacent::AdjacentMover;
pub use random::RandomMover;
pub use tactical::TacticalMover;

use game_core::{Cell, GameState};
use rand_chacha::ChaCha20Rng;

/// A strategy that proposes a legal cell for the side to move.
pub trait MoveSource: Send + Sync {
    /// Propose a cell, or `None` when the position has no legal moves.
    ///
    /// `last_move` is the opponent's preceding move, when known; sources
    /// may use it to bias their choice and must tolerate its absence.
    fn propose(
        &self,
        state: &GameState,
        last_move: Option<Cell>,
        rng: &mut ChaCha20Rng,
    ) -> Option<Cell>;
}
