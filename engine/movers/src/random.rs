//! Uniform-random move source.

use game_core::{Cell, GameState};
use rand::seq::SliceRandom;
use rand_chacha::ChaCha20Rng;

use crate::MoveSource;

/// Picks uniformly among all legal cells.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomMover;

impl MoveSource for RandomMover {
    fn propose(
        &self,
        state: &GameState,
        _last_move: Option<Cell>,
        rng: &mut ChaCha20Rng,
    ) -> Option<Cell> {
        state.allowed_moves().choose(rng).copied()
    }
}
